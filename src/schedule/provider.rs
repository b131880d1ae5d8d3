use async_trait::async_trait;

use super::models::Game;
use crate::error::SourceError;

/// Trait that every schedule source must implement.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Return every game on `team`'s schedule for `season` (e.g. "20242025").
    async fn fetch_team_season(&self, team: &str, season: &str) -> Result<Vec<Game>, SourceError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
