use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::GameSource;
use crate::error::FetchError;
use crate::models::{Game, GameStatus, GameUpdate, Team};

const BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardResponse {
    #[serde(default)]
    pub events: Vec<EspnEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnEvent {
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_espn_time")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub competitions: Vec<EspnCompetition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnCompetition {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_espn_time")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub competitors: Vec<EspnCompetitor>,
    #[serde(default)]
    pub odds: Vec<EspnOdds>,
    #[serde(default)]
    pub broadcasts: Vec<EspnBroadcast>,
    #[serde(default)]
    pub status: EspnStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnCompetitor {
    #[serde(default)]
    pub home_away: String,
    #[serde(default)]
    pub score: Option<String>,
    pub team: EspnTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnTeam {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub abbreviation: String,
    #[serde(default)]
    pub conference_id: Option<String>,
}

/// Betting line; details look like "MICH -7.5"
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnOdds {
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub home_team_odds: Option<EspnTeamOdds>,
    #[serde(default)]
    pub away_team_odds: Option<EspnTeamOdds>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EspnTeamOdds {
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub underdog: bool,
}

#[derive(Debug, Deserialize)]
pub struct EspnBroadcast {
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EspnStatus {
    #[serde(default)]
    pub display_clock: String,
    #[serde(default)]
    pub period: u32,
    #[serde(rename = "type", default)]
    pub status_type: EspnStatusType,
}

#[derive(Debug, Deserialize, Default)]
pub struct EspnStatusType {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub completed: bool,
}

/// Response from the per-game summary endpoint
#[derive(Debug, Deserialize)]
pub struct SummaryResponse {
    pub header: SummaryHeader,
}

#[derive(Debug, Deserialize)]
pub struct SummaryHeader {
    #[serde(default)]
    pub competitions: Vec<EspnCompetition>,
}

/// Parse both full RFC 3339 timestamps and the short "2024-09-07T16:00Z"
/// form some scoreboard endpoints return
pub fn parse_espn_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(naive) = value.strip_suffix('Z') {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M") {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M%:z")
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn deserialize_espn_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_espn_time(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", value))),
    }
}

/// Turn a scoreboard response into games. Events without a usable
/// competition (fewer than two competitors, no start time) are skipped.
pub fn build_games(response: ScoreboardResponse, sport: &str, league: &str) -> Vec<Game> {
    let mut games = Vec::new();

    for event in response.events {
        let Some(competition) = event.competitions.into_iter().next() else {
            debug!(event = %event.name, "skipping event without competitions");
            continue;
        };
        if competition.competitors.len() < 2 {
            debug!(event = %event.name, "skipping event with fewer than two competitors");
            continue;
        }
        let Some(start_time) = competition.date.or(event.date) else {
            warn!(event = %event.name, "skipping event without a start time");
            continue;
        };

        let id = if competition.id.is_empty() {
            event.id.clone()
        } else {
            competition.id.clone()
        };
        games.push(build_game(id, competition, start_time, sport, league));
    }

    games
}

fn build_game(
    id: String,
    competition: EspnCompetition,
    start_time: DateTime<Utc>,
    sport: &str,
    league: &str,
) -> Game {
    let mut competitors = competition.competitors;
    // competitors are usually listed home first, but trust homeAway
    let home_index = competitors
        .iter()
        .position(|c| c.home_away == "home")
        .unwrap_or(0);
    let home = competitors.remove(home_index);
    let away = competitors.remove(0);

    let odds = competition.odds.into_iter().next();
    let (home_odds, away_odds) = match &odds {
        Some(o) => (
            o.home_team_odds.as_ref().map(|t| (t.favorite, t.underdog)),
            o.away_team_odds.as_ref().map(|t| (t.favorite, t.underdog)),
        ),
        None => (None, None),
    };

    let home_team = team_from(&home.team, home_odds);
    let away_team = team_from(&away.team, away_odds);

    let mut game = Game::new(id, sport, league, home_team, away_team, start_time);
    game.status = GameStatus::from_state(&competition.status.status_type.state);
    game.current_period = competition.status.period;
    game.display_clock = competition.status.display_clock;
    game.odds = odds.and_then(|o| o.details);
    game.network = competition
        .broadcasts
        .into_iter()
        .flat_map(|b| b.names)
        .next()
        .unwrap_or_default();

    for competitor in [&home, &away] {
        if let Some(score) = competitor.score.as_ref().filter(|s| !s.is_empty()) {
            game.scores.insert(competitor.team.id.clone(), score.clone());
        }
    }

    game
}

fn team_from(team: &EspnTeam, odds: Option<(bool, bool)>) -> Team {
    let (favorite, underdog) = odds.unwrap_or((false, false));
    Team::new(&team.id, &team.display_name, &team.abbreviation)
        .in_conference(team.conference_id.clone().unwrap_or_default())
        .with_odds(favorite, underdog)
}

/// Extract the live state of one game from its competition record
pub fn update_from_competition(competition: &EspnCompetition) -> GameUpdate {
    let scores: BTreeMap<String, String> = competition
        .competitors
        .iter()
        .map(|c| {
            let score = c
                .score
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "0".to_string());
            (c.team.id.clone(), score)
        })
        .collect();

    let status = if competition.status.status_type.completed {
        GameStatus::Final
    } else {
        GameStatus::from_state(&competition.status.status_type.state)
    };

    GameUpdate {
        status,
        scores,
        current_period: competition.status.period,
        display_clock: competition.status.display_clock.clone(),
    }
}

/// Client for the public ESPN site API. No API key required.
pub struct EspnApiClient {
    client: Client,
    base_url: String,
}

impl Default for EspnApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EspnApiClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn league_root(&self, sport: &str, league: &str) -> String {
        format!("{}/{}/{}", self.base_url, sport, league)
    }

    async fn get_json<T>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, FetchError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl GameSource for EspnApiClient {
    async fn fetch_scoreboard(
        &self,
        sport: &str,
        league: &str,
        group: Option<&str>,
    ) -> Result<Vec<Game>, FetchError> {
        // without groups the scoreboard only lists the top games of the day
        let url = format!("{}/scoreboard", self.league_root(sport, league));
        let query: Vec<(&str, &str)> = group.map(|g| vec![("groups", g)]).unwrap_or_default();

        let response: ScoreboardResponse = self.get_json(&url, &query).await?;
        let games = build_games(response, sport, league);
        info!(sport, league, group = ?group, count = games.len(), "fetched scoreboard");
        Ok(games)
    }

    async fn fetch_game_score(&self, game: &Game) -> Result<GameUpdate, FetchError> {
        let url = format!("{}/summary", self.league_root(&game.sport, &game.league));

        let summary: SummaryResponse = self.get_json(&url, &[("event", game.id.as_str())]).await?;
        let competition = summary
            .header
            .competitions
            .iter()
            .find(|c| c.id == game.id || c.id.is_empty())
            .ok_or_else(|| FetchError::GameNotFound(game.id.clone()))?;

        let update = update_from_competition(competition);
        debug!(game_id = %game.id, scores = ?update.scores, period = update.current_period, "fetched game score");
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOREBOARD: &str = r#"{
        "events": [
            {
                "id": "401520281",
                "date": "2023-11-25T17:00Z",
                "name": "Ohio State Buckeyes at Michigan Wolverines",
                "competitions": [{
                    "id": "401520281",
                    "date": "2023-11-25T17:00Z",
                    "competitors": [
                        {"id": "194", "homeAway": "away", "score": "24",
                         "team": {"id": "194", "displayName": "Ohio State Buckeyes", "abbreviation": "OSU", "conferenceId": "5"}},
                        {"id": "130", "homeAway": "home", "score": "30",
                         "team": {"id": "130", "displayName": "Michigan Wolverines", "abbreviation": "MICH", "conferenceId": "5"}}
                    ],
                    "odds": [{
                        "details": "MICH -3.5",
                        "overUnder": 46.5,
                        "homeTeamOdds": {"favorite": true, "underdog": false},
                        "awayTeamOdds": {"favorite": false, "underdog": true}
                    }],
                    "broadcasts": [{"market": "national", "names": ["FOX"]}],
                    "status": {"clock": 0.0, "displayClock": "0:00", "period": 4,
                               "type": {"id": "3", "name": "STATUS_FINAL", "state": "post", "completed": true}}
                }]
            },
            {
                "id": "401520300",
                "date": "2023-11-25T20:30:00Z",
                "name": "Purdue at Indiana",
                "competitions": [{
                    "id": "401520300",
                    "competitors": [
                        {"homeAway": "home", "team": {"id": "84", "displayName": "Indiana Hoosiers", "abbreviation": "IU"}},
                        {"homeAway": "away", "team": {"id": "2509", "displayName": "Purdue Boilermakers", "abbreviation": "PUR"}}
                    ],
                    "status": {"displayClock": "0:00", "period": 0, "type": {"state": "pre", "completed": false}}
                }]
            },
            {
                "id": "401520999",
                "date": "2023-11-25T20:30Z",
                "name": "Bye week",
                "competitions": [{"id": "401520999", "competitors": []}]
            }
        ]
    }"#;

    const SUMMARY: &str = r#"{
        "header": {
            "id": "401520281",
            "competitions": [{
                "id": "401520281",
                "date": "2023-11-25T17:00Z",
                "competitors": [
                    {"homeAway": "home", "score": "17", "team": {"id": "130", "displayName": "Michigan Wolverines", "abbreviation": "MICH"}},
                    {"homeAway": "away", "score": "14", "team": {"id": "194", "displayName": "Ohio State Buckeyes", "abbreviation": "OSU"}}
                ],
                "status": {"displayClock": "7:41", "period": 3, "type": {"state": "in", "completed": false}}
            }]
        }
    }"#;

    fn scoreboard() -> ScoreboardResponse {
        serde_json::from_str(SCOREBOARD).unwrap()
    }

    #[test]
    fn test_parse_espn_time_formats() {
        let short = parse_espn_time("2024-09-07T16:00Z").unwrap();
        let full = parse_espn_time("2024-09-07T16:00:00Z").unwrap();
        let offset = parse_espn_time("2024-09-07T12:00-04:00").unwrap();
        assert_eq!(short, full);
        assert_eq!(short, offset);
        assert_eq!(
            parse_espn_time("2024-09-07T16:00:00.000+00:00").unwrap(),
            short
        );
        assert!(parse_espn_time("September 7th").is_none());
        assert!(parse_espn_time("").is_none());
    }

    #[test]
    fn test_invalid_event_date_fails_to_parse() {
        let json = r#"{"events": [{"id": "1", "date": "yesterday", "competitions": []}]}"#;
        assert!(serde_json::from_str::<ScoreboardResponse>(json).is_err());
    }

    #[test]
    fn test_build_games() {
        let games = build_games(scoreboard(), "football", "college-football");
        assert_eq!(games.len(), 2);

        let rivalry = &games[0];
        assert_eq!(rivalry.id, "401520281");
        assert_eq!(rivalry.home.id, "130");
        assert_eq!(rivalry.away.id, "194");
        assert_eq!(rivalry.home_score(), "30");
        assert_eq!(rivalry.away_score(), "24");
        assert_eq!(rivalry.status, GameStatus::Final);
        assert_eq!(rivalry.current_period, 4);
        assert_eq!(rivalry.regulation_periods, 4);
        assert_eq!(rivalry.network, "FOX");
        assert_eq!(rivalry.odds.as_deref(), Some("MICH -3.5"));
        assert!(rivalry.home.is_favorite);
        assert!(rivalry.away.is_underdog);
        assert_eq!(rivalry.home.conference_id, "5");
        assert_eq!(
            rivalry.start_time,
            Utc.with_ymd_and_hms(2023, 11, 25, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_build_games_defaults() {
        let games = build_games(scoreboard(), "football", "college-football");
        let upcoming = &games[1];

        // start time falls back to the event date
        assert_eq!(
            upcoming.start_time,
            Utc.with_ymd_and_hms(2023, 11, 25, 20, 30, 0).unwrap()
        );
        assert_eq!(upcoming.status, GameStatus::Scheduled);
        assert_eq!(upcoming.scores.len(), 2);
        assert_eq!(upcoming.home_score(), "0");
        assert!(upcoming.underdog().is_none());
        assert!(upcoming.network.is_empty());
        assert!(upcoming.odds.is_none());
    }

    #[test]
    fn test_update_from_summary() {
        let summary: SummaryResponse = serde_json::from_str(SUMMARY).unwrap();
        let update = update_from_competition(&summary.header.competitions[0]);

        assert_eq!(update.status, GameStatus::InProgress);
        assert_eq!(update.current_period, 3);
        assert_eq!(update.display_clock, "7:41");
        assert_eq!(update.scores.get("130").map(String::as_str), Some("17"));
        assert_eq!(update.scores.get("194").map(String::as_str), Some("14"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_scoreboard_live() {
        let client = EspnApiClient::new();
        let games = client
            .fetch_scoreboard("football", "college-football", Some("5"))
            .await
            .unwrap();
        println!("Fetched {} games", games.len());
    }
}
