use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::models::{per_game, toi_minutes, DraftDetails, PlayerProfile, RecentGame, SeasonLine, StatLine};
use super::PlayerSource;
use crate::error::SourceError;
use crate::schedule::NhlWebApi;

impl NhlWebApi {
    fn landing_url(&self, player_id: i64) -> String {
        self.endpoint(&format!("player/{}/landing", player_id))
    }
}

/// Player landing endpoint: `GET {base}/player/{ID}/landing`
#[async_trait]
impl PlayerSource for NhlWebApi {
    async fn fetch_player(&self, player_id: i64) -> Result<PlayerProfile, SourceError> {
        let url = self.landing_url(player_id);
        let raw = self.get_json(&url, &format!("player {}", player_id)).await?;
        parse_player_landing(&raw)
    }
}

/// Parse a `player/{id}/landing` payload. The id and both names are
/// required; every stat block is optional.
pub fn parse_player_landing(raw: &Value) -> Result<PlayerProfile, SourceError> {
    let id = raw["playerId"]
        .as_i64()
        .ok_or_else(|| SourceError::Malformed("missing `playerId`".into()))?;
    let first_name = localized(&raw["firstName"])
        .ok_or_else(|| SourceError::Malformed(format!("player {} has no first name", id)))?;
    let last_name = localized(&raw["lastName"])
        .ok_or_else(|| SourceError::Malformed(format!("player {} has no last name", id)))?;

    let mut nhl_seasons: Vec<SeasonLine> = raw["seasonTotals"]
        .as_array()
        .map(|rows| rows.iter().filter_map(parse_season_row).collect())
        .unwrap_or_default();
    nhl_seasons.sort_by(|a, b| b.season.cmp(&a.season));

    let last_five = raw["last5Games"]
        .as_array()
        .map(|rows| rows.iter().map(parse_recent_game).collect())
        .unwrap_or_default();

    Ok(PlayerProfile {
        id,
        first_name,
        last_name,
        sweater_number: count(&raw["sweaterNumber"]),
        position: text(&raw["position"]),
        team: text(&raw["currentTeamAbbrev"]),
        headshot: text(&raw["headshot"]),
        draft: parse_draft(&raw["draftDetails"]),
        featured_season: season_id(&raw["featuredStats"]["season"]),
        current_season: parse_stat_line(&raw["featuredStats"]["regularSeason"]["subSeason"]),
        career: parse_stat_line(&raw["careerTotals"]["regularSeason"]),
        nhl_seasons,
        last_five,
    })
}

/// NHL regular-season rows only; junior and playoff rows are skipped.
fn parse_season_row(row: &Value) -> Option<SeasonLine> {
    if row["leagueAbbrev"].as_str() != Some("NHL") {
        return None;
    }
    if row["gameTypeId"].as_i64().is_some_and(|t| t != 2) {
        return None;
    }
    Some(SeasonLine {
        season: season_id(&row["season"])?,
        team: localized(&row["teamName"]),
        stats: parse_stat_line(row)?,
    })
}

fn parse_stat_line(raw: &Value) -> Option<StatLine> {
    let games_played = count(&raw["gamesPlayed"])?;
    let goals = count(&raw["goals"]).unwrap_or(0);
    let assists = count(&raw["assists"]).unwrap_or(0);
    let points = count(&raw["points"]).unwrap_or(goals + assists);
    Some(StatLine {
        games_played,
        goals,
        assists,
        points,
        plus_minus: signed(&raw["plusMinus"]),
        penalty_minutes: count(&raw["pim"]),
        power_play_goals: count(&raw["powerPlayGoals"]),
        power_play_points: count(&raw["powerPlayPoints"]),
        shorthanded_goals: count(&raw["shorthandedGoals"]),
        game_winning_goals: count(&raw["gameWinningGoals"]),
        shots: count(&raw["shots"]),
        avg_toi: text(&raw["avgToi"]),
        points_per_game: per_game(points, games_played),
    })
}

fn parse_recent_game(raw: &Value) -> RecentGame {
    let toi = text(&raw["toi"]);
    let goals = count(&raw["goals"]).unwrap_or(0);
    let assists = count(&raw["assists"]).unwrap_or(0);
    RecentGame {
        game_id: raw["gameId"].as_i64(),
        date: raw["gameDate"]
            .as_str()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        opponent: text(&raw["opponentAbbrev"]),
        goals,
        assists,
        points: count(&raw["points"]).unwrap_or(goals + assists),
        plus_minus: signed(&raw["plusMinus"]),
        toi_minutes: toi.as_deref().and_then(toi_minutes),
        toi,
    }
}

fn parse_draft(raw: &Value) -> Option<DraftDetails> {
    Some(DraftDetails {
        year: count(&raw["year"])?,
        team: text(&raw["teamAbbrev"]),
        round: count(&raw["round"]),
        pick_in_round: count(&raw["pickInRound"]),
        overall_pick: count(&raw["overallPick"]),
    })
}

/// Names come wrapped as `{"default": "Macklin", "cs": ...}`.
fn localized(raw: &Value) -> Option<String> {
    raw["default"].as_str().or_else(|| raw.as_str()).map(str::to_string)
}

/// Seasons arrive as numbers (20232024) but are stored like schedule season ids.
fn season_id(raw: &Value) -> Option<String> {
    raw.as_u64()
        .map(|s| s.to_string())
        .or_else(|| raw.as_str().map(str::to_string))
}

fn text(raw: &Value) -> Option<String> {
    raw.as_str().map(str::to_string)
}

fn count(raw: &Value) -> Option<u32> {
    raw.as_u64().and_then(|v| u32::try_from(v).ok())
}

fn signed(raw: &Value) -> i32 {
    raw.as_i64().and_then(|v| i32::try_from(v).ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn landing() -> Value {
        json!({
            "playerId": 8480043,
            "isActive": true,
            "currentTeamAbbrev": "SJS",
            "firstName": { "default": "Tomas" },
            "lastName": { "default": "Hertl", "cs": "Hertl" },
            "sweaterNumber": 48,
            "position": "C",
            "headshot": "https://assets.nhle.com/mugs/nhl/20242025/SJS/8480043.png",
            "draftDetails": { "year": 2012, "teamAbbrev": "SJS", "round": 1, "pickInRound": 17, "overallPick": 17 },
            "featuredStats": {
                "season": 20242025,
                "regularSeason": {
                    "subSeason": {
                        "gamesPlayed": 20, "goals": 8, "assists": 9, "points": 17,
                        "plusMinus": -3, "pim": 6, "powerPlayGoals": 3, "powerPlayPoints": 7,
                        "shorthandedGoals": 0, "gameWinningGoals": 1, "shots": 51
                    }
                }
            },
            "careerTotals": {
                "regularSeason": {
                    "gamesPlayed": 800, "goals": 260, "assists": 300, "points": 560,
                    "plusMinus": 12, "avgToi": "18:02"
                }
            },
            "seasonTotals": [
                { "season": 20102011, "leagueAbbrev": "Czech", "gameTypeId": 2,
                  "teamName": { "default": "Slavia Praha" }, "gamesPlayed": 38, "goals": 12 },
                { "season": 20222023, "leagueAbbrev": "NHL", "gameTypeId": 2,
                  "teamName": { "default": "San Jose Sharks" },
                  "gamesPlayed": 82, "goals": 22, "assists": 42, "points": 64, "plusMinus": -25 },
                { "season": 20232024, "leagueAbbrev": "NHL", "gameTypeId": 3,
                  "teamName": { "default": "Vegas Golden Knights" },
                  "gamesPlayed": 7, "goals": 2, "assists": 1, "points": 3 },
                { "season": 20232024, "leagueAbbrev": "NHL", "gameTypeId": 2,
                  "teamName": { "default": "Vegas Golden Knights" },
                  "gamesPlayed": 48, "goals": 15, "assists": 19 }
            ],
            "last5Games": [
                { "gameId": 2024020301, "gameDate": "2024-11-20", "opponentAbbrev": "LAK",
                  "goals": 1, "assists": 1, "points": 2, "plusMinus": 1, "toi": "18:30" },
                { "gameId": 2024020290, "gameDate": "2024-11-18", "opponentAbbrev": "ANA",
                  "goals": 0, "assists": 0, "points": 0, "plusMinus": -2, "toi": "16:12" }
            ]
        })
    }

    #[test]
    fn parses_headline_details() {
        let player = parse_player_landing(&landing()).unwrap();
        assert_eq!(player.id, 8480043);
        assert_eq!(player.full_name(), "Tomas Hertl");
        assert_eq!(player.sweater_number, Some(48));
        assert_eq!(player.position.as_deref(), Some("C"));
        assert_eq!(player.team.as_deref(), Some("SJS"));
        let draft = player.draft.unwrap();
        assert_eq!(draft.year, 2012);
        assert_eq!(draft.pick_in_round, Some(17));
    }

    #[test]
    fn parses_featured_and_career_lines() {
        let player = parse_player_landing(&landing()).unwrap();
        assert_eq!(player.featured_season.as_deref(), Some("20242025"));

        let current = player.current_season.unwrap();
        assert_eq!(current.points, 17);
        assert_eq!(current.plus_minus, -3);
        assert_eq!(current.power_play_points, Some(7));
        assert_relative_eq!(current.points_per_game.unwrap(), 0.85);

        let career = player.career.unwrap();
        assert_eq!(career.games_played, 800);
        assert_eq!(career.avg_toi.as_deref(), Some("18:02"));
        assert_eq!(career.shots, None);
    }

    #[test]
    fn keeps_only_nhl_regular_seasons_newest_first() {
        let player = parse_player_landing(&landing()).unwrap();
        let seasons: Vec<&str> = player.nhl_seasons.iter().map(|s| s.season.as_str()).collect();
        assert_eq!(seasons, vec!["20232024", "20222023"]);

        let vegas = &player.nhl_seasons[0];
        assert_eq!(vegas.team.as_deref(), Some("Vegas Golden Knights"));
        assert_eq!(vegas.stats.games_played, 48);
        // Points fall back to goals + assists when not reported.
        assert_eq!(vegas.stats.points, 34);
    }

    #[test]
    fn parses_last_five_games() {
        let player = parse_player_landing(&landing()).unwrap();
        assert_eq!(player.last_five.len(), 2);
        let latest = &player.last_five[0];
        assert_eq!(latest.opponent.as_deref(), Some("LAK"));
        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2024, 11, 20));
        assert_eq!(latest.points, 2);
        assert_relative_eq!(latest.toi_minutes.unwrap(), 18.5);
        assert_eq!(player.last_five[1].plus_minus, -2);
    }

    #[test]
    fn sparse_landing_still_parses() {
        let player = parse_player_landing(&json!({
            "playerId": 1,
            "firstName": { "default": "A" },
            "lastName": { "default": "B" }
        }))
        .unwrap();
        assert!(player.current_season.is_none());
        assert!(player.career.is_none());
        assert!(player.draft.is_none());
        assert!(player.nhl_seasons.is_empty());
        assert!(player.last_five.is_empty());
    }

    #[test]
    fn missing_identity_is_malformed() {
        let err = parse_player_landing(&json!({ "firstName": { "default": "A" } })).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));

        let err = parse_player_landing(&json!({ "playerId": 5, "lastName": { "default": "B" } }))
            .unwrap_err();
        assert!(err.to_string().contains("first name"), "{}", err);
    }

    #[test]
    fn landing_url_uses_player_id() {
        let api = NhlWebApi::new("https://api-web.nhle.com/v1/", std::time::Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            api.landing_url(8480043),
            "https://api-web.nhle.com/v1/player/8480043/landing"
        );
    }
}
