use chrono::NaiveDate;
use serde::Serialize;

/// Counting stats for one span of games (a season or a career)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatLine {
    pub games_played: u32,
    pub goals: u32,
    pub assists: u32,
    pub points: u32,
    pub plus_minus: i32,
    pub penalty_minutes: Option<u32>,
    pub power_play_goals: Option<u32>,
    pub power_play_points: Option<u32>,
    pub shorthanded_goals: Option<u32>,
    pub game_winning_goals: Option<u32>,
    pub shots: Option<u32>,
    /// Average time on ice as reported, e.g. "20:41"
    pub avg_toi: Option<String>,
    pub points_per_game: Option<f64>,
}

/// Per-game rate; `None` before the first game.
pub fn per_game(total: u32, games_played: u32) -> Option<f64> {
    (games_played > 0).then(|| total as f64 / games_played as f64)
}

/// One NHL regular season in a player's history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonLine {
    /// Season id such as "20232024"
    pub season: String,
    pub team: Option<String>,
    pub stats: StatLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentGame {
    pub game_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub opponent: Option<String>,
    pub goals: u32,
    pub assists: u32,
    pub points: u32,
    pub plus_minus: i32,
    pub toi: Option<String>,
    pub toi_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftDetails {
    pub year: u32,
    pub team: Option<String>,
    pub round: Option<u32>,
    pub pick_in_round: Option<u32>,
    pub overall_pick: Option<u32>,
}

/// Everything the dashboard shows for one player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub sweater_number: Option<u32>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub headshot: Option<String>,
    pub draft: Option<DraftDetails>,
    /// Season the featured line belongs to
    pub featured_season: Option<String>,
    pub current_season: Option<StatLine>,
    pub career: Option<StatLine>,
    /// NHL regular seasons, newest first
    pub nhl_seasons: Vec<SeasonLine>,
    /// Most recent games, newest first
    pub last_five: Vec<RecentGame>,
}

impl PlayerProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Minutes from an "mm:ss" time-on-ice string.
pub fn toi_minutes(toi: &str) -> Option<f64> {
    let (minutes, seconds) = toi.split_once(':')?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    let seconds: u32 = seconds.trim().parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    Some(minutes as f64 + seconds as f64 / 60.0)
}
