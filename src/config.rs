use clap::Parser;

use crate::schedule::season::is_valid_season;

/// Hockey schedule dashboard with pre-game win probabilities
#[derive(Parser, Debug, Clone)]
#[command(name = "rink-odds", version, about)]
pub struct Config {
    /// Team code to follow (e.g. SJS)
    #[arg(long, env = "TEAM_CODE", default_value = "SJS")]
    pub team: String,

    /// Season id such as 20242025; derived from the current date when unset
    #[arg(long, env = "SEASON")]
    pub season: Option<String>,

    /// NHL web API base URL
    #[arg(
        long,
        env = "NHL_API_URL",
        default_value = "https://api-web.nhle.com/v1"
    )]
    pub nhl_api_url: String,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Opponent schedules fetched concurrently per batch
    #[arg(long, env = "FETCH_BATCH_SIZE", default_value = "5")]
    pub batch_size: usize,

    /// Schedule reload interval in seconds (0 = load once at startup)
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "900")]
    pub refresh_interval_secs: u64,

    /// NHL player id shown in the dashboard's player panel
    #[arg(long, env = "FEATURED_PLAYER", default_value = "8480043")]
    pub featured_player: i64,

    /// Upstream HTTP request timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let code_ok = (2..=4).contains(&self.team.len())
            && self.team.bytes().all(|b| b.is_ascii_uppercase());
        if !code_ok {
            anyhow::bail!("team must be a 2-4 letter uppercase code, got '{}'", self.team);
        }
        if let Some(season) = &self.season {
            if !is_valid_season(season) {
                anyhow::bail!("season must look like 20242025, got '{}'", season);
            }
        }
        url::Url::parse(&self.nhl_api_url)
            .map_err(|e| anyhow::anyhow!("invalid nhl_api_url '{}': {}", self.nhl_api_url, e))?;
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.featured_player <= 0 {
            anyhow::bail!("featured_player must be a positive NHL player id");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
