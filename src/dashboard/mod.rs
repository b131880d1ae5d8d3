use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::engine::{
    estimate_win_probability, explain_win_probability, ConfidenceBand, ProbabilityBreakdown,
    TrendDirection, WinProbability,
};
use crate::players::{PlayerProfile, PlayerSource};
use crate::schedule::models::{Game, TeamSide};
use crate::schedule::GameStore;

#[derive(Clone)]
pub struct AppState {
    pub store: GameStore,
    pub players: Arc<dyn PlayerSource>,
    /// Followed team code
    pub team: String,
    /// Player shown in the dashboard's player panel
    pub featured_player: i64,
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/healthcheck", get(healthcheck_handler))
        .route("/api/status", get(status_handler))
        .route("/api/schedule", get(schedule_handler))
        .route("/api/games/:id/probability", get(probability_handler))
        .route("/api/players/:id", get(player_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    Home,
    Away,
}

impl Perspective {
    fn is_home(self) -> bool {
        self == Perspective::Home
    }
}

#[derive(Debug, Deserialize)]
pub struct ProbabilityQuery {
    pub perspective: Option<Perspective>,
}

/// One row of the followed team's schedule
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub home: TeamSide,
    pub away: TeamSide,
    pub is_home: bool,
    pub is_future: bool,
    pub opponent: String,
    pub win_probability: WinProbability,
    pub percent: u8,
    pub confidence: ConfidenceBand,
    pub trend_direction: TrendDirection,
}

/// Estimate and breakdown for one game from one side's perspective
#[derive(Debug, Clone, Serialize)]
pub struct ProbabilityView {
    pub game_id: i64,
    pub perspective: Perspective,
    pub team: String,
    pub opponent: String,
    pub estimate: WinProbability,
    pub percent: u8,
    pub confidence: ConfidenceBand,
    pub trend_direction: TrendDirection,
    pub breakdown: ProbabilityBreakdown,
}

/// Serve the dashboard HTML page, injecting the followed team code and
/// featured player id.
async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let html = DASHBOARD_HTML.replace(
        r#"<body>"#,
        &format!(
            r#"<body data-team="{}" data-player="{}">"#,
            state.team, state.featured_player
        ),
    );
    Html(html)
}

/// GET /healthcheck
async fn healthcheck_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.status().await)
}

/// GET /api/schedule
async fn schedule_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let history = state.store.snapshot().await;
    Json(schedule_views(&state.team, &history, Utc::now()))
}

/// GET /api/games/:id/probability?perspective=home|away
async fn probability_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<ProbabilityQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let game = state
        .store
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("game {} not found", id)))?;
    let history = state.store.snapshot().await;

    let perspective = query
        .perspective
        .unwrap_or_else(|| default_perspective(&game, &state.team));
    debug!("Explaining game {} from {:?} perspective", id, perspective);
    Ok(Json(probability_view(&game, &history, perspective)))
}

/// GET /api/players/:id
///
/// Upstream 404 is passed through; any other upstream failure is a 502.
async fn player_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PlayerProfile>, (StatusCode, String)> {
    match state.players.fetch_player(id).await {
        Ok(profile) => {
            debug!("Fetched player {} ({})", id, profile.full_name());
            Ok(Json(profile))
        }
        Err(e) if e.is_not_found() => Err((StatusCode::NOT_FOUND, format!("player {} not found", id))),
        Err(e) => {
            warn!("Player {} fetch failed: {}", id, e);
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

/// The followed team's side when it plays in `game`, otherwise home.
fn default_perspective(game: &Game, team: &str) -> Perspective {
    if game.away.code == team {
        Perspective::Away
    } else {
        Perspective::Home
    }
}

/// The followed team's games, oldest first, each scored against the full
/// history from the team's own side.
pub fn schedule_views(team: &str, history: &[Game], now: DateTime<Utc>) -> Vec<GameView> {
    history
        .iter()
        .filter(|g| g.involves(team))
        .map(|game| {
            let is_home = game.home.code == team;
            let wp = estimate_win_probability(game, history, is_home);
            GameView {
                id: game.id,
                start_time: game.start_time,
                home: game.home.clone(),
                away: game.away.clone(),
                is_home,
                is_future: game.is_future(now),
                opponent: game.sides(is_home).1.code.clone(),
                win_probability: wp,
                percent: wp.percent(),
                confidence: wp.confidence(),
                trend_direction: wp.trend_direction(),
            }
        })
        .collect()
}

pub fn probability_view(game: &Game, history: &[Game], perspective: Perspective) -> ProbabilityView {
    let for_home = perspective.is_home();
    let breakdown = explain_win_probability(game, history, for_home);
    let estimate = breakdown.combine(for_home);
    let (team, opponent) = game.sides(for_home);
    ProbabilityView {
        game_id: game.id,
        perspective,
        team: team.code.clone(),
        opponent: opponent.code.clone(),
        estimate,
        percent: estimate.percent(),
        confidence: estimate.confidence(),
        trend_direction: estimate.trend_direction(),
        breakdown,
    }
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Rink Odds</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #00788c;
    --green: #00c896;
    --red: #ff4f6a;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1rem; }
  .game { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1rem 1.2rem; cursor: pointer; }
  .game .row { display: flex; justify-content: space-between; align-items: center; }
  .game .teams { font-weight: 600; }
  .game .when { color: var(--muted); font-size: .8rem; }
  .bar { height: 8px; background: var(--border); border-radius: 4px; overflow: hidden; margin-top: .6rem; }
  .bar > div { height: 100%; }
  .unlikely { background: #e53935; } .underdog { background: #fb8c00; } .toss_up { background: #fdd835; }
  .edge { background: #9ccc65; } .favored { background: #43a047; }
  .up { color: var(--green); } .down { color: var(--red); }
  .details { margin-top: .6rem; font-size: .85rem; color: var(--muted); display: none; }
  .details.open { display: block; }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  .player { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1rem 1.2rem; display: none; }
  .player.open { display: block; }
  .player .row { display: flex; gap: 1rem; align-items: center; }
  .player img { width: 64px; height: 64px; border-radius: 50%; }
  .player table { width: 100%; margin-top: .6rem; font-size: .85rem; border-collapse: collapse; }
  .player td, .player th { text-align: left; padding: .2rem .4rem; border-bottom: 1px solid var(--border); }
</style>
</head>
<body>
<header>
  <h1>🏒 <span id="team"></span> Schedule</h1>
  <span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="status"></span>
</header>

<section class="player" id="player"></section>
<main id="games"><div class="empty">Loading…</div></main>

<script>
const team = document.body.dataset.team;
const playerId = document.body.dataset.player;
const pct = v => (v*100).toFixed(0)+'%';
const esc = v => String(v ?? '').replace(/[&<>"']/g, c =>
  ({ '&':'&amp;', '<':'&lt;', '>':'&gt;', '"':'&quot;', "'":'&#39;' }[c]));
document.getElementById('team').textContent = team;

async function loadPlayer() {
  const r = await fetch(`/api/players/${encodeURIComponent(playerId)}`);
  if (!r.ok) return;
  const p = await r.json();
  const s = p.current_season, c = p.career;
  const line = (label, v) => v ? `<tr><td>${esc(label)}</td><td>${v.games_played}</td><td>${v.goals}</td><td>${v.assists}</td><td>${v.points}</td><td>${v.plus_minus}</td></tr>` : '';
  const recent = p.last_five.map(g =>
    `<tr><td>${esc(g.date)}</td><td>${esc(g.opponent)}</td><td>${g.goals}</td><td>${g.assists}</td><td>${g.points}</td><td>${g.plus_minus}</td><td>${esc(g.toi)}</td></tr>`
  ).join('');
  const box = document.getElementById('player');
  box.innerHTML = `<div class="row">
      ${p.headshot ? `<img src="${esc(p.headshot)}" alt="">` : ''}
      <div><strong>${esc(p.first_name)} ${esc(p.last_name)}</strong>
      <div style="color:var(--muted);font-size:.8rem;">#${esc(p.sweater_number)} · ${esc(p.position)} · ${esc(p.team)}</div></div>
    </div>
    <table><tr><th></th><th>GP</th><th>G</th><th>A</th><th>P</th><th>+/-</th></tr>
      ${line('Season ' + (p.featured_season ?? ''), s)}${line('Career', c)}</table>
    ${recent ? `<table><tr><th>Date</th><th>Opp</th><th>G</th><th>A</th><th>P</th><th>+/-</th><th>TOI</th></tr>${recent}</table>` : ''}`;
  box.classList.add('open');
}

async function toggleDetails(el, id) {
  const box = el.querySelector('.details');
  if (box.classList.toggle('open') && !box.dataset.loaded) {
    const r = await fetch(`/api/games/${id}/probability`);
    if (!r.ok) return;
    const v = await r.json();
    box.innerHTML = Object.values(v.breakdown).map(d =>
      `<div>${esc(d.label)}: ${pct(d.probability)} × ${d.weight.toFixed(2)} (trend ${d.trend.toFixed(1)})</div>`
    ).join('');
    box.dataset.loaded = '1';
  }
}

async function loadAll() {
  const s = await fetch('/api/status').then(r => r.json()).catch(() => null);
  if (s) {
    document.getElementById('status').textContent = s.loading
      ? 'Loading schedules…'
      : (s.last_error ? 'Error: ' + s.last_error : s.game_count + ' games loaded');
  }
  const r = await fetch('/api/schedule');
  if (!r.ok) return;
  const games = await r.json();
  const main = document.getElementById('games');
  if (!games.length) { main.innerHTML = '<div class="empty">No games yet</div>'; return; }
  main.innerHTML = games.map(g => {
    const when = new Date(g.start_time).toLocaleString([], { month:'short', day:'numeric', hour:'2-digit', minute:'2-digit' });
    const score = g.is_future ? '' : `${g.away.score ?? '–'} – ${g.home.score ?? '–'}`;
    const trend = g.trend_direction === 'flat' ? '' :
      `<span class="${g.trend_direction}">${g.trend_direction === 'up' ? '▲' : '▼'} ${Math.abs(g.win_probability.trend).toFixed(1)}%</span>`;
    return `<div class="game" onclick="toggleDetails(this, ${g.id})">
      <div class="row"><span class="teams">${esc(g.away.code)} @ ${esc(g.home.code)}</span><span>${esc(score)}</span></div>
      <div class="row"><span class="when">${when}</span><span>${pct(g.win_probability.probability)} ${trend}</span></div>
      <div class="bar"><div class="${esc(g.confidence)}" style="width:${g.percent}%"></div></div>
      <div class="details"></div>
    </div>`;
  }).join('');
}

loadAll();
loadPlayer();
setInterval(loadAll, 60000);
</script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::players::nhl::parse_player_landing;
    use crate::schedule::models::fixtures::{played, scheduled};
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::TimeZone;
    use tower::ServiceExt;

    const FEATURED: i64 = 8480043;

    /// Knows one player; id 500 simulates an upstream outage.
    struct FakePlayers;

    #[async_trait]
    impl PlayerSource for FakePlayers {
        async fn fetch_player(&self, player_id: i64) -> Result<PlayerProfile, SourceError> {
            match player_id {
                FEATURED => parse_player_landing(&serde_json::json!({
                    "playerId": FEATURED,
                    "firstName": { "default": "Tomas" },
                    "lastName": { "default": "Hertl" },
                    "currentTeamAbbrev": "SJS",
                    "careerTotals": { "regularSeason": { "gamesPlayed": 10, "goals": 3, "assists": 4 } }
                })),
                500 => Err(SourceError::Malformed("expected value at line 1".into())),
                _ => Err(SourceError::Status {
                    resource: format!("player {}", player_id),
                    status: 404,
                }),
            }
        }
    }

    async fn app() -> Router {
        let store = GameStore::new();
        store.merge(history()).await;
        router(AppState {
            store,
            players: Arc::new(FakePlayers),
            team: "SJS".into(),
            featured_player: FEATURED,
        })
    }

    async fn fetch(uri: &str) -> (StatusCode, String) {
        let response = app()
            .await
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    async fn get_json(uri: &str) -> serde_json::Value {
        let (status, body) = fetch(uri).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        serde_json::from_str(&body).unwrap()
    }

    fn history() -> Vec<Game> {
        vec![
            played(1, "SJS", 4, "VGK", 1),
            played(2, "LAK", 2, "SJS", 3),
            played(3, "EDM", 5, "CGY", 0),
            scheduled(30, "VGK", "SJS"),
        ]
    }

    #[test]
    fn schedule_lists_only_followed_team_from_its_side() {
        let now = Utc.with_ymd_and_hms(2024, 10, 10, 0, 0, 0).unwrap();
        let views = schedule_views("SJS", &history(), now);
        assert_eq!(views.len(), 3);

        assert!(views[0].is_home);
        assert_eq!(views[0].opponent, "VGK");
        assert!(!views[0].is_future);

        let upcoming = &views[2];
        assert!(!upcoming.is_home);
        assert!(upcoming.is_future);
        assert_eq!(upcoming.opponent, "VGK");
        let expected = estimate_win_probability(&history()[3], &history(), false);
        assert_eq!(upcoming.win_probability, expected);
        assert_eq!(upcoming.percent, expected.percent());
    }

    #[test]
    fn probability_view_matches_engine() {
        let games = history();
        let target = &games[3];
        let view = probability_view(target, &games, Perspective::Away);
        assert_eq!(view.team, "SJS");
        assert_eq!(view.opponent, "VGK");
        assert_eq!(view.breakdown, explain_win_probability(target, &games, false));
        assert_relative_eq!(
            view.estimate.probability,
            estimate_win_probability(target, &games, false).probability
        );
    }

    #[test]
    fn default_perspective_follows_team() {
        let games = history();
        assert_eq!(default_perspective(&games[3], "SJS"), Perspective::Away);
        assert_eq!(default_perspective(&games[0], "SJS"), Perspective::Home);
        assert_eq!(default_perspective(&games[2], "SJS"), Perspective::Home);
    }

    #[test]
    fn perspective_query_parses_lowercase() {
        let q: ProbabilityQuery = serde_json::from_str(r#"{"perspective":"away"}"#).unwrap();
        assert_eq!(q.perspective, Some(Perspective::Away));
        assert!(serde_json::from_str::<ProbabilityQuery>(r#"{"perspective":"left"}"#).is_err());
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let (status, body) = fetch("/api/games/1/probability").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("game 1 not found"), "{}", body);
    }

    #[tokio::test]
    async fn unknown_perspective_is_bad_request() {
        let (status, _) = fetch("/api/games/2024020030/probability?perspective=left").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn probability_defaults_to_followed_team_side() {
        let json = get_json("/api/games/2024020030/probability").await;
        assert_eq!(json["perspective"], "away");
        assert_eq!(json["team"], "SJS");
        assert_eq!(json["opponent"], "VGK");

        let json = get_json("/api/games/2024020030/probability?perspective=home").await;
        assert_eq!(json["perspective"], "home");
        assert_eq!(json["team"], "VGK");

        // SJS is not in this game, so home is used.
        let json = get_json("/api/games/2024020003/probability").await;
        assert_eq!(json["perspective"], "home");
        assert_eq!(json["team"], "EDM");
    }

    #[tokio::test]
    async fn schedule_and_status_routes_serve_store() {
        let schedule = get_json("/api/schedule").await;
        assert_eq!(schedule.as_array().map(Vec::len), Some(3));

        let status = get_json("/api/status").await;
        assert_eq!(status["game_count"], 4);
        assert_eq!(get_json("/healthcheck").await["status"], "ok");
    }

    #[tokio::test]
    async fn player_route_maps_upstream_outcomes() {
        let player = get_json(&format!("/api/players/{}", FEATURED)).await;
        assert_eq!(player["last_name"], "Hertl");
        assert_eq!(player["career"]["points"], 7);

        let (status, _) = fetch("/api/players/42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = fetch("/api/players/500").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("malformed payload"), "{}", body);
    }

    #[tokio::test]
    async fn index_carries_team_and_player() {
        let (status, body) = fetch("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<body data-team="SJS" data-player="8480043">"#));
    }

    #[test]
    fn dashboard_escapes_api_text_before_inserting_markup() {
        assert!(DASHBOARD_HTML.contains("const esc = "));
        for raw in ["${g.away.code}", "${g.home.code}", "${d.label}", "${p.last_name}", "${g.opponent}"] {
            assert!(!DASHBOARD_HTML.contains(raw), "unescaped {}", raw);
        }
        assert!(DASHBOARD_HTML.contains("${esc(g.away.code)} @ ${esc(g.home.code)}"));
        assert!(DASHBOARD_HTML.contains("${esc(d.label)}"));
    }

    #[test]
    fn views_serialize_with_snake_case_enums() {
        let games = history();
        let view = probability_view(&games[0], &games, Perspective::Home);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["perspective"], "home");
        assert!(json["breakdown"]["head_to_head"]["label"].is_string());
        assert!(json["confidence"].is_string());
    }
}
