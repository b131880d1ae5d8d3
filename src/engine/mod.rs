pub mod indicators;
pub mod win_probability;

pub use indicators::{ConfidenceBand, TrendDirection};
pub use win_probability::{
    estimate_win_probability, explain_win_probability, ProbabilityBreakdown, WinProbability,
};
