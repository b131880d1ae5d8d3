pub mod models;
pub mod nhl;

pub use models::PlayerProfile;

use async_trait::async_trait;

use crate::error::SourceError;

/// Trait that every player-statistics source must implement.
#[async_trait]
pub trait PlayerSource: Send + Sync {
    /// Headline details, season and career lines, and recent games for one player.
    async fn fetch_player(&self, player_id: i64) -> Result<PlayerProfile, SourceError>;
}
