use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{FetchError, TrackerError};

/// A team taking part in a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub display_name: String,
    pub abbreviation: String,
    pub conference_id: String,
    pub is_favorite: bool,
    pub is_underdog: bool,
}

impl Team {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            abbreviation: abbreviation.into(),
            conference_id: String::new(),
            is_favorite: false,
            is_underdog: false,
        }
    }

    pub fn in_conference(mut self, conference_id: impl Into<String>) -> Self {
        self.conference_id = conference_id.into();
        self
    }

    /// Apply odds-derived flags. A team is never both favorite and underdog;
    /// contradictory input clears both.
    pub fn with_odds(mut self, favorite: bool, underdog: bool) -> Self {
        if favorite && underdog {
            self.is_favorite = false;
            self.is_underdog = false;
        } else {
            self.is_favorite = favorite;
            self.is_underdog = underdog;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
}

impl GameStatus {
    /// Map the scoreboard's `pre`/`in`/`post` state onto a status
    pub fn from_state(state: &str) -> Self {
        match state {
            "in" => GameStatus::InProgress,
            "post" => GameStatus::Final,
            _ => GameStatus::Scheduled,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Scheduled => write!(f, "scheduled"),
            GameStatus::InProgress => write!(f, "in progress"),
            GameStatus::Final => write!(f, "final"),
        }
    }
}

/// A game being tracked. Built by the scheduler from upstream data; only
/// `status`, `current_period`, `display_clock` and `scores` change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub sport: String,
    pub league: String,
    pub home: Team,
    pub away: Team,
    pub start_time: DateTime<Utc>,
    pub status: GameStatus,
    pub current_period: u32,
    pub regulation_periods: u32,
    pub display_clock: String,
    pub network: String,
    pub odds: Option<String>,
    pub scores: BTreeMap<String, String>, // team id -> score
}

impl Game {
    /// Create a scheduled game with both scores at "0"
    pub fn new(
        id: impl Into<String>,
        sport: impl Into<String>,
        league: impl Into<String>,
        home: Team,
        away: Team,
        start_time: DateTime<Utc>,
    ) -> Self {
        let sport = sport.into();
        let league = league.into();
        let mut scores = BTreeMap::new();
        scores.insert(home.id.clone(), "0".to_string());
        scores.insert(away.id.clone(), "0".to_string());

        Self {
            id: id.into(),
            regulation_periods: regulation_periods(&sport, &league),
            sport,
            league,
            home,
            away,
            start_time,
            status: GameStatus::Scheduled,
            current_period: 0,
            display_clock: String::new(),
            network: String::new(),
            odds: None,
            scores,
        }
    }

    pub fn home_score(&self) -> &str {
        self.scores.get(&self.home.id).map(String::as_str).unwrap_or("0")
    }

    pub fn away_score(&self) -> &str {
        self.scores.get(&self.away.id).map(String::as_str).unwrap_or("0")
    }

    /// The designated underdog, if the odds named one
    pub fn underdog(&self) -> Option<&Team> {
        if self.home.is_underdog {
            Some(&self.home)
        } else if self.away.is_underdog {
            Some(&self.away)
        } else {
            None
        }
    }

    /// The other participant
    pub fn opponent_of(&self, team_id: &str) -> &Team {
        if self.home.id == team_id {
            &self.away
        } else {
            &self.home
        }
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            scores: self.scores.clone(),
            current_period: self.current_period,
        }
    }

    /// Produce the next observation of this game from a fetched update.
    /// The update must carry a score for exactly the two participants.
    pub fn observe(&self, update: GameUpdate) -> Result<Game, FetchError> {
        let participants: BTreeSet<&str> = [self.home.id.as_str(), self.away.id.as_str()].into();
        let reported: BTreeSet<&str> = update.scores.keys().map(String::as_str).collect();
        if participants != reported {
            return Err(FetchError::Malformed(format!(
                "game {} update reported scores for {:?}",
                self.id, reported
            )));
        }

        let mut next = self.clone();
        next.status = update.status;
        next.scores = update.scores;
        next.current_period = update.current_period;
        next.display_clock = update.display_clock;
        Ok(next)
    }

    /// "Final score: MICH 27 - OSU 24"
    pub fn final_summary(&self) -> String {
        format!(
            "Final score: {} {} - {} {}",
            self.home.abbreviation,
            self.home_score(),
            self.away.abbreviation,
            self.away_score()
        )
    }
}

/// Current state of one game as returned by a score fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub status: GameStatus,
    pub scores: BTreeMap<String, String>,
    pub current_period: u32,
    pub display_clock: String,
}

/// Scores and period observed at one poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub scores: BTreeMap<String, String>,
    pub current_period: u32,
}

/// What the user asked us to track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingRequest {
    pub sport: String,
    pub league: String,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub conferences: Vec<String>,
}

impl TrackingRequest {
    pub fn new(sport: impl Into<String>, league: impl Into<String>) -> Self {
        Self {
            sport: sport.into(),
            league: league.into(),
            ..Default::default()
        }
    }

    pub fn with_teams<I, S>(mut self, teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.teams = teams.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conferences<I, S>(mut self, conferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conferences = conferences.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.sport.trim().is_empty() {
            return Err(TrackerError::Configuration(
                "tracking request is missing a sport".to_string(),
            ));
        }
        if self.league.trim().is_empty() {
            return Err(TrackerError::Configuration(
                "tracking request is missing a league".to_string(),
            ));
        }
        Ok(())
    }
}

/// A fully rendered notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Notifications from one poll, addressed to one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBatch {
    pub channel: String,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    ScoreChange,
    Underdog,
    Overtime,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::ScoreChange => "score_change",
            NotificationCategory::Underdog => "underdog",
            NotificationCategory::Overtime => "overtime",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "score_change" => Ok(NotificationCategory::ScoreChange),
            "underdog" => Ok(NotificationCategory::Underdog),
            "overtime" => Ok(NotificationCategory::Overtime),
            other => Err(TrackerError::Configuration(format!(
                "unknown notification type: {}",
                other
            ))),
        }
    }
}

/// A sport the scoreboard API serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SportInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// A league within a sport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub regulation_periods: u32,
}

pub fn supported_sports() -> Vec<SportInfo> {
    vec![
        SportInfo { id: "baseball", name: "Baseball" },
        SportInfo { id: "basketball", name: "Basketball" },
        SportInfo { id: "football", name: "Football" },
        SportInfo { id: "hockey", name: "Hockey" },
        SportInfo { id: "soccer", name: "Soccer" },
    ]
}

/// Leagues for a sport, or `None` for a sport we don't support
pub fn leagues_for(sport: &str) -> Option<Vec<LeagueInfo>> {
    let leagues = match sport {
        "football" => vec![
            LeagueInfo { id: "nfl", name: "NFL", regulation_periods: 4 },
            LeagueInfo { id: "college-football", name: "College Football", regulation_periods: 4 },
        ],
        "basketball" => vec![
            LeagueInfo { id: "nba", name: "NBA", regulation_periods: 4 },
            LeagueInfo {
                id: "mens-college-basketball",
                name: "Men's College Basketball",
                regulation_periods: 2,
            },
            LeagueInfo {
                id: "womens-college-basketball",
                name: "Women's College Basketball",
                regulation_periods: 4,
            },
        ],
        "baseball" => vec![LeagueInfo { id: "mlb", name: "MLB", regulation_periods: 9 }],
        "hockey" => vec![LeagueInfo { id: "nhl", name: "NHL", regulation_periods: 3 }],
        "soccer" => vec![LeagueInfo { id: "usa.1", name: "MLS", regulation_periods: 2 }],
        _ => return None,
    };
    Some(leagues)
}

/// A conference as the scoreboard's `groups` filter knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConferenceInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// Major conferences of a college league. Other leagues have none.
pub fn conferences_for(league: &str) -> Vec<ConferenceInfo> {
    let table: &[(&'static str, &'static str)] = match league {
        "college-football" => &[
            ("5", "Big Ten"),
            ("8", "SEC"),
            ("1", "ACC"),
            ("4", "Big 12"),
            ("151", "American"),
            ("15", "MAC"),
            ("17", "Mountain West"),
            ("20", "Sun Belt"),
        ],
        "mens-college-basketball" | "womens-college-basketball" => &[
            ("7", "Big Ten"),
            ("23", "SEC"),
            ("2", "ACC"),
            ("8", "Big 12"),
            ("62", "American"),
            ("14", "MAC"),
            ("44", "Mountain West"),
            ("27", "Sun Belt"),
        ],
        _ => &[],
    };

    table
        .iter()
        .map(|&(id, name)| ConferenceInfo { id, name })
        .collect()
}

/// Number of regular periods for a sport/league; the overtime baseline
pub fn regulation_periods(sport: &str, league: &str) -> u32 {
    if let Some(info) = leagues_for(sport)
        .into_iter()
        .flatten()
        .find(|info| info.id == league)
    {
        return info.regulation_periods;
    }

    match sport {
        "baseball" => 9,
        "hockey" => 3,
        "soccer" => 2,
        _ => 4,
    }
}
