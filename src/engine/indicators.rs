use serde::Serialize;

use super::win_probability::WinProbability;

/// Trends smaller than this (in points) are shown as flat.
const TREND_DEADBAND: f64 = 2.0;

/// Coarse confidence bucket used to colour the probability bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Unlikely,
    Underdog,
    TossUp,
    Edge,
    Favored,
}

impl ConfidenceBand {
    pub fn from_probability(p: f64) -> Self {
        if p < 0.40 {
            ConfidenceBand::Unlikely
        } else if p < 0.45 {
            ConfidenceBand::Underdog
        } else if p < 0.55 {
            ConfidenceBand::TossUp
        } else if p < 0.60 {
            ConfidenceBand::Edge
        } else {
            ConfidenceBand::Favored
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn from_trend(trend: f64) -> Self {
        if trend.abs() < TREND_DEADBAND {
            TrendDirection::Flat
        } else if trend > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        }
    }
}

impl WinProbability {
    pub fn confidence(&self) -> ConfidenceBand {
        ConfidenceBand::from_probability(self.probability)
    }

    pub fn trend_direction(&self) -> TrendDirection {
        TrendDirection::from_trend(self.trend)
    }

    /// Probability as a whole percentage, e.g. 0.623 → 62.
    pub fn percent(&self) -> u8 {
        (self.probability * 100.0).round() as u8
    }
}
