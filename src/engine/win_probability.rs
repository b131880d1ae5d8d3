//! Pre-game win probability from historical game records.
//!
//! Four signals are blended with fixed weights:
//! - **Season record**: the team's standings points percentage
//! - **Head-to-head**: win rate in decided meetings between the two teams
//! - **Recent form**: win rate over the team's last 10 decided games
//! - **Goal differential**: logistic on the average margin over that window
//!
//! The home side then gets a flat home-ice bump. Every factor degrades to a
//! neutral 0.5 (trend 0) when it has no data, so both entry points are total.
//!
//! History is consumed in slice order. "Last 10" and "most recent meeting"
//! mean the tail of the slice; callers hand in chronologically sorted games
//! (`GameStore` keeps its snapshot sorted by start time).

use serde::Serialize;

use crate::schedule::models::Game;

/// Win probability added to the home side (subtracted from the away side).
pub const HOME_ICE_ADVANTAGE: f64 = 0.05;

/// Number of decided games considered for recent form and goal differential.
const FORM_WINDOW: usize = 10;
/// Games at or after this index of the window form the "recent" half.
const FORM_SPLIT: usize = 5;
/// Head-to-head trend magnitude, in percentage points.
const H2H_TREND_POINTS: f64 = 10.0;

// ── Public API ───────────────────────────────────────────────────────────────

/// A contributing signal of the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    SeasonRecord,
    HeadToHead,
    RecentForm,
    GoalDifferential,
}

impl Factor {
    pub const ALL: [Factor; 4] = [
        Factor::SeasonRecord,
        Factor::HeadToHead,
        Factor::RecentForm,
        Factor::GoalDifferential,
    ];

    /// Fixed blend weight; the four weights sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            Factor::SeasonRecord => 0.30,
            Factor::HeadToHead => 0.25,
            Factor::RecentForm => 0.25,
            Factor::GoalDifferential => 0.20,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Factor::SeasonRecord => "Season Record",
            Factor::HeadToHead => "Head-to-Head",
            Factor::RecentForm => "Recent Form",
            Factor::GoalDifferential => "Goal Differential",
        }
    }
}

/// One factor's contribution, as shown in the expandable breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityDetail {
    pub probability: f64,
    pub weight: f64,
    pub label: &'static str,
    /// Percentage points, except goal differential which is in raw goals.
    pub trend: f64,
}

/// Per-factor breakdown of an estimate, keyed by factor name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityBreakdown {
    pub season_record: ProbabilityDetail,
    pub head_to_head: ProbabilityDetail,
    pub recent_form: ProbabilityDetail,
    pub goal_differential: ProbabilityDetail,
}

/// Final estimate for the perspective team.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinProbability {
    /// Chance the perspective team wins, in [0, 1]
    pub probability: f64,
    /// Signed weighted trend; positive means the team is trending better
    pub trend: f64,
}

/// Estimate the chance that the perspective side of `target` wins.
///
/// `for_home` selects the home side as the perspective team. `history` may
/// include `target` itself and unplayed games; only decided games feed the
/// outcome-based factors.
pub fn estimate_win_probability(target: &Game, history: &[Game], for_home: bool) -> WinProbability {
    explain_win_probability(target, history, for_home).combine(for_home)
}

/// Per-factor view of [`estimate_win_probability`] for the same inputs.
pub fn explain_win_probability(target: &Game, history: &[Game], for_home: bool) -> ProbabilityBreakdown {
    let (team, opponent) = target.sides(for_home);

    let season = FactorScore {
        probability: team.point_pct_or_neutral(),
        trend: 0.0,
    };
    let h2h = head_to_head(history, &team.code, &opponent.code);
    let window = recent_decided(history, &team.code);
    let form = recent_form(&window);
    let goal_diff = goal_differential(&window);

    ProbabilityBreakdown {
        season_record: season.detail(Factor::SeasonRecord),
        head_to_head: h2h.detail(Factor::HeadToHead),
        recent_form: form.detail(Factor::RecentForm),
        goal_differential: goal_diff.detail(Factor::GoalDifferential),
    }
}

impl ProbabilityBreakdown {
    pub fn get(&self, factor: Factor) -> &ProbabilityDetail {
        match factor {
            Factor::SeasonRecord => &self.season_record,
            Factor::HeadToHead => &self.head_to_head,
            Factor::RecentForm => &self.recent_form,
            Factor::GoalDifferential => &self.goal_differential,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, &ProbabilityDetail)> + '_ {
        Factor::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Σ probability × weight, before the home-ice adjustment.
    pub fn weighted_probability(&self) -> f64 {
        self.iter().map(|(_, d)| d.probability * d.weight).sum()
    }

    /// Weighted mean of the factor trends. Season record never trends, so it
    /// is left out of both numerator and denominator.
    pub fn weighted_trend(&self) -> f64 {
        let (sum, weights) = self
            .iter()
            .filter(|(f, _)| *f != Factor::SeasonRecord)
            .fold((0.0, 0.0), |(sum, weights), (_, d)| {
                (sum + d.trend * d.weight, weights + d.weight)
            });
        sum / weights
    }

    /// Apply home ice and clamp to produce the final estimate.
    pub fn combine(&self, for_home: bool) -> WinProbability {
        let adjustment = if for_home {
            HOME_ICE_ADVANTAGE
        } else {
            -HOME_ICE_ADVANTAGE
        };
        WinProbability {
            probability: (self.weighted_probability() + adjustment).clamp(0.0, 1.0),
            trend: self.weighted_trend(),
        }
    }
}

// ── Factors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct FactorScore {
    probability: f64,
    trend: f64,
}

impl FactorScore {
    const NEUTRAL: FactorScore = FactorScore {
        probability: 0.5,
        trend: 0.0,
    };

    fn detail(self, factor: Factor) -> ProbabilityDetail {
        ProbabilityDetail {
            probability: self.probability,
            weight: factor.weight(),
            label: factor.label(),
            trend: self.trend,
        }
    }
}

fn is_win((team, opponent): (i32, i32)) -> bool {
    team > opponent
}

fn head_to_head(history: &[Game], team: &str, opponent: &str) -> FactorScore {
    let meetings: Vec<(i32, i32)> = history
        .iter()
        .filter(|g| g.is_decided() && g.is_matchup(team, opponent))
        .filter_map(|g| g.score_for(team))
        .collect();

    let Some(&last) = meetings.last() else {
        return FactorScore::NEUTRAL;
    };

    let wins = meetings.iter().filter(|&&s| is_win(s)).count();
    FactorScore {
        probability: wins as f64 / meetings.len() as f64,
        trend: if is_win(last) {
            H2H_TREND_POINTS
        } else {
            -H2H_TREND_POINTS
        },
    }
}

/// The team's last `FORM_WINDOW` decided games as `(team, opponent)` scores,
/// oldest first.
fn recent_decided(history: &[Game], team: &str) -> Vec<(i32, i32)> {
    let mut scores: Vec<(i32, i32)> = history
        .iter()
        .filter(|g| g.is_decided())
        .filter_map(|g| g.score_for(team))
        .collect();
    let start = scores.len().saturating_sub(FORM_WINDOW);
    scores.split_off(start)
}

fn recent_form(window: &[(i32, i32)]) -> FactorScore {
    if window.is_empty() {
        return FactorScore::NEUTRAL;
    }

    let (mut recent_wins, mut prior_wins) = (0usize, 0usize);
    for (idx, &score) in window.iter().enumerate() {
        if !is_win(score) {
            continue;
        }
        if idx >= FORM_SPLIT {
            recent_wins += 1;
        } else {
            prior_wins += 1;
        }
    }

    // Halves are always divided by the full half size, even when short.
    let half = FORM_SPLIT as f64;
    FactorScore {
        probability: (recent_wins + prior_wins) as f64 / window.len() as f64,
        trend: (recent_wins as f64 / half - prior_wins as f64 / half) * 100.0,
    }
}

fn goal_differential(window: &[(i32, i32)]) -> FactorScore {
    if window.is_empty() {
        return FactorScore::NEUTRAL;
    }

    let (mut recent, mut prior) = (0i64, 0i64);
    for (idx, &(team, opponent)) in window.iter().enumerate() {
        let diff = i64::from(team) - i64::from(opponent);
        if idx >= FORM_SPLIT {
            recent += diff;
        } else {
            prior += diff;
        }
    }

    let avg = (recent + prior) as f64 / window.len() as f64;
    FactorScore {
        probability: sigmoid(avg),
        trend: (recent - prior) as f64,
    }
}

/// Standard logistic sigmoid function.
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

// ── Tests ────────────────────────────────────────────────────────────────────
