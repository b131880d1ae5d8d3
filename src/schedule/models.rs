use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Season point percentage assumed when the source does not report one.
pub const NEUTRAL_POINT_PCT: f64 = 0.5;

/// One side of a scheduled or completed game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSide {
    /// Short team code, e.g. "SJS"
    pub code: String,
    /// Final score; `None` until the game has been played
    pub score: Option<i32>,
    /// Standings points percentage (0.0–1.0) at fetch time
    pub season_point_pct: Option<f64>,
}

impl TeamSide {
    /// Points percentage with the neutral default substituted.
    pub fn point_pct_or_neutral(&self) -> f64 {
        self.season_point_pct.unwrap_or(NEUTRAL_POINT_PCT)
    }
}

/// A game as returned by the schedule source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub home: TeamSide,
    pub away: TeamSide,
}

impl Game {
    /// A game is decided once both sides carry a final score.
    pub fn is_decided(&self) -> bool {
        self.home.score.is_some() && self.away.score.is_some()
    }

    pub fn involves(&self, code: &str) -> bool {
        self.home.code == code || self.away.code == code
    }

    /// True if the two codes met in this game, in either home/away order.
    pub fn is_matchup(&self, team: &str, opponent: &str) -> bool {
        (self.home.code == team && self.away.code == opponent)
            || (self.away.code == team && self.home.code == opponent)
    }

    /// `(team score, opponent score)` from `code`'s point of view.
    /// `None` if the game is undecided or `code` did not play.
    pub fn score_for(&self, code: &str) -> Option<(i32, i32)> {
        let (home, away) = (self.home.score?, self.away.score?);
        if self.home.code == code {
            Some((home, away))
        } else if self.away.code == code {
            Some((away, home))
        } else {
            None
        }
    }

    pub fn opponent_of(&self, code: &str) -> Option<&TeamSide> {
        if self.home.code == code {
            Some(&self.away)
        } else if self.away.code == code {
            Some(&self.home)
        } else {
            None
        }
    }

    /// `(perspective side, opposing side)`
    pub fn sides(&self, for_home: bool) -> (&TeamSide, &TeamSide) {
        if for_home {
            (&self.home, &self.away)
        } else {
            (&self.away, &self.home)
        }
    }

    pub fn is_future(&self, now: DateTime<Utc>) -> bool {
        self.start_time > now
    }
}
