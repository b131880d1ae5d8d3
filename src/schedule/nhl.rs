use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::models::{Game, TeamSide};
use super::provider::ScheduleSource;
use crate::error::SourceError;

/// Client for the public NHL web API.
/// Schedules: `GET {base}/club-schedule-season/{TEAM}/{SEASON}`
pub struct NhlWebApi {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

impl NhlWebApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(NhlWebApi {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn schedule_url(&self, team: &str, season: &str) -> String {
        self.endpoint(&format!("club-schedule-season/{}/{}", team, season))
    }

    /// GET `url` and decode the body as JSON. `resource` names the request
    /// in status errors.
    pub(crate) async fn get_json(&self, url: &str, resource: &str) -> Result<Value, SourceError> {
        debug!("Fetching {}", url);

        let resp = self.http.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                resource: resource.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().await?;
        decode_body(&body)
    }
}

#[async_trait]
impl ScheduleSource for NhlWebApi {
    fn name(&self) -> &str {
        "NHL-Web-API"
    }

    async fn fetch_team_season(&self, team: &str, season: &str) -> Result<Vec<Game>, SourceError> {
        let url = self.schedule_url(team, season);
        let raw = self.get_json(&url, &format!("{} schedule", team)).await?;
        parse_schedule_response(&raw)
    }
}

/// A body that arrived but is not JSON is a payload problem, not a transport one.
fn decode_body(body: &str) -> Result<Value, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))
}

/// Parse a `club-schedule-season` payload. Entries without an id, start
/// time, or both team codes are skipped.
pub fn parse_schedule_response(raw: &Value) -> Result<Vec<Game>, SourceError> {
    let entries = raw["games"]
        .as_array()
        .ok_or_else(|| SourceError::Malformed("missing `games` array".into()))?;

    let games = entries
        .iter()
        .filter_map(|g| {
            let id = g["id"].as_i64()?;
            let start_time = DateTime::parse_from_rfc3339(g["startTimeUTC"].as_str()?)
                .ok()?
                .with_timezone(&Utc);
            let home = parse_side(&g["homeTeam"])?;
            let away = parse_side(&g["awayTeam"])?;
            Some(Game {
                id,
                start_time,
                home,
                away,
            })
        })
        .collect();

    Ok(games)
}

fn parse_side(raw: &Value) -> Option<TeamSide> {
    let code = raw["abbrev"].as_str()?.to_string();
    let score = raw["score"].as_i64().and_then(|s| i32::try_from(s).ok());
    let season_point_pct = raw["pointPct"]
        .as_f64()
        .filter(|p| (0.0..=1.0).contains(p));
    Some(TeamSide {
        code,
        score,
        season_point_pct,
    })
}
