use chrono::{DateTime, Datelike, Utc};

/// First calendar month (1-based) that belongs to a newly started season.
const SEASON_ROLLOVER_MONTH: u32 = 8;

/// NHL season id for the given instant, e.g. `"20242025"`.
///
/// January through July still belong to the season that began the previous
/// autumn.
pub fn season_for(now: DateTime<Utc>) -> String {
    let start = if now.month() < SEASON_ROLLOVER_MONTH {
        now.year() - 1
    } else {
        now.year()
    };
    format!("{}{}", start, start + 1)
}

/// Checks the `YYYY(YYYY+1)` shape of a season id.
pub fn is_valid_season(season: &str) -> bool {
    if season.len() != 8 || !season.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match (season[..4].parse::<i32>(), season[4..].parse::<i32>()) {
        (Ok(start), Ok(end)) => end == start + 1,
        _ => false,
    }
}
