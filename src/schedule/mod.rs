pub mod models;
pub mod nhl;
pub mod provider;
pub mod season;

pub use nhl::NhlWebApi;
pub use provider::ScheduleSource;

use models::Game;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Shared, in-memory collection of every known game for one season.
///
/// Games are deduplicated by id and kept sorted by `(start_time, id)`, so a
/// snapshot is always valid chronological history for the probability engine.
/// Installing a different season drops everything held for the previous one.
#[derive(Clone)]
pub struct GameStore {
    inner: Arc<RwLock<StoreInner>>,
}

struct StoreInner {
    season: Option<String>,
    games: Vec<Game>,
    loading: bool,
    last_error: Option<String>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Load state surfaced to the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub season: Option<String>,
    pub loading: bool,
    pub game_count: usize,
    pub last_error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl GameStore {
    pub fn new() -> Self {
        GameStore {
            inner: Arc::new(RwLock::new(StoreInner {
                season: None,
                games: Vec::new(),
                loading: true,
                last_error: None,
                refreshed_at: None,
            })),
        }
    }

    /// Merge fetched games in. A game already present is replaced by the
    /// newer record with the same id.
    pub async fn merge(&self, games: Vec<Game>) {
        if games.is_empty() {
            return;
        }
        let mut inner = self.inner.write().await;
        merge_into(&mut inner.games, games);
    }

    /// Install the followed team's schedule for `season`. The same season is
    /// merged like any other batch; a new season id replaces the collection.
    pub async fn install_season(&self, season: &str, games: Vec<Game>) {
        let mut inner = self.inner.write().await;
        if inner.season.as_deref() != Some(season) {
            if let Some(previous) = inner.season.as_deref() {
                info!(
                    "Season changed {} -> {}, dropping {} stored games",
                    previous,
                    season,
                    inner.games.len()
                );
            }
            inner.games.clear();
            inner.season = Some(season.to_string());
        }
        merge_into(&mut inner.games, games);
    }

    /// All games, oldest first.
    pub async fn snapshot(&self) -> Vec<Game> {
        self.inner.read().await.games.clone()
    }

    pub async fn get(&self, id: i64) -> Option<Game> {
        let inner = self.inner.read().await;
        inner.games.iter().find(|g| g.id == id).cloned()
    }

    pub async fn status(&self) -> StoreStatus {
        let inner = self.inner.read().await;
        StoreStatus {
            season: inner.season.clone(),
            loading: inner.loading,
            game_count: inner.games.len(),
            last_error: inner.last_error.clone(),
            refreshed_at: inner.refreshed_at,
        }
    }

    async fn begin_load(&self) {
        self.inner.write().await.loading = true;
    }

    async fn finish_load(&self, outcome: std::result::Result<(), String>) {
        let mut inner = self.inner.write().await;
        inner.loading = false;
        match outcome {
            Ok(()) => {
                inner.last_error = None;
                inner.refreshed_at = Some(Utc::now());
            }
            Err(e) => inner.last_error = Some(e),
        }
    }
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_into(stored: &mut Vec<Game>, incoming: Vec<Game>) {
    let mut by_id: HashMap<i64, Game> = stored.drain(..).map(|g| (g.id, g)).collect();
    for game in incoming {
        by_id.insert(game.id, game);
    }
    stored.extend(by_id.into_values());
    stored.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
}

/// Load `team`'s season plus the season of every opponent it faces.
///
/// The followed team's schedule must load; it is installed before any
/// opponent is fetched so the dashboard can render immediately. A failed load
/// leaves whatever the store already held untouched. Opponents are fetched
/// `batch_size` at a time, concurrently within a batch; a failed opponent is
/// logged and skipped.
pub async fn load_season(
    source: &dyn ScheduleSource,
    store: &GameStore,
    team: &str,
    season: &str,
    batch_size: usize,
) -> Result<()> {
    store.begin_load().await;

    let team_games = match source.fetch_team_season(team, season).await {
        Ok(games) => games,
        Err(e) => {
            let msg = format!("{} schedule for {} {}: {}", source.name(), team, season, e);
            store.finish_load(Err(msg.clone())).await;
            anyhow::bail!(msg);
        }
    };
    info!("Loaded {} games for {} ({})", team_games.len(), team, season);

    let opponents: BTreeSet<String> = team_games
        .iter()
        .filter_map(|g| g.opponent_of(team))
        .map(|side| side.code.clone())
        .filter(|code| code != team)
        .collect();
    store.install_season(season, team_games).await;

    let opponents: Vec<String> = opponents.into_iter().collect();
    let mut failed = 0usize;
    for batch in opponents.chunks(batch_size.max(1)) {
        let fetches = batch.iter().map(|code| async move {
            (code, source.fetch_team_season(code, season).await)
        });
        let results = futures_util::future::join_all(fetches).await;

        let mut batch_games = Vec::new();
        for (code, result) in results {
            match result {
                Ok(games) => batch_games.extend(games),
                Err(e) => {
                    failed += 1;
                    warn!("Failed to fetch schedule for {}: {}", code, e);
                }
            }
        }
        store.merge(batch_games).await;
    }

    info!(
        "Loaded {} opponent schedules for {} ({} failed)",
        opponents.len() - failed,
        team,
        failed
    );
    store.finish_load(Ok(())).await;
    Ok(())
}

/// Spawns a background task that loads the season now and again on every
/// refresh tick. A zero `refresh_interval` loads once. The season is
/// re-derived from the clock on each run unless `season_override` is set.
pub fn start_schedule_refresher(
    source: Arc<dyn ScheduleSource>,
    store: GameStore,
    team: String,
    season_override: Option<String>,
    batch_size: usize,
    refresh_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Schedule refresher started (source={}, team={}, interval={:?})",
            source.name(),
            team,
            refresh_interval
        );

        let mut interval = (!refresh_interval.is_zero()).then(|| {
            let mut i = tokio::time::interval(refresh_interval);
            i.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            i
        });

        loop {
            if let Some(interval) = interval.as_mut() {
                interval.tick().await;
            }

            let season = season_override
                .clone()
                .unwrap_or_else(|| season::season_for(Utc::now()));
            if let Err(e) = load_season(source.as_ref(), &store, &team, &season, batch_size).await {
                error!("Schedule load failed: {}", e);
            }

            if interval.is_none() {
                break;
            }
        }
    })
}
