//! Fakes shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::{GameSource, NotificationSink};
use crate::error::{DispatchError, FetchError};
use crate::models::{Game, GameStatus, GameUpdate, Notification, Team};

/// Michigan (favorite, home) vs Ohio State (underdog, away).
pub fn sample_game(id: &str, start: DateTime<Utc>) -> Game {
    Game::new(
        id,
        "football",
        "college-football",
        Team::new("130", "Michigan Wolverines", "MICH")
            .in_conference("5")
            .with_odds(true, false),
        Team::new("194", "Ohio State Buckeyes", "OSU")
            .in_conference("5")
            .with_odds(false, true),
        start,
    )
}

pub fn update(home: &str, away: &str, period: u32, status: GameStatus) -> GameUpdate {
    GameUpdate {
        status,
        scores: [("130", home), ("194", away)]
            .iter()
            .map(|(id, score)| (id.to_string(), score.to_string()))
            .collect(),
        current_period: period,
        display_clock: "10:00".to_string(),
    }
}

/// Scripted game source. Score fetches pop from a queue and report the game
/// as missing once it runs dry.
#[derive(Default)]
pub struct FakeSource {
    scoreboards: HashMap<Option<String>, Vec<Game>>,
    failing_groups: HashSet<Option<String>>,
    updates: Mutex<VecDeque<Result<GameUpdate, FetchError>>>,
    hang: bool,
    scoreboard_calls: AtomicUsize,
    score_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_scoreboard(mut self, group: Option<&str>, games: Vec<Game>) -> Self {
        self.scoreboards.insert(group.map(str::to_string), games);
        self
    }

    pub fn failing_group(mut self, group: Option<&str>) -> Self {
        self.failing_groups.insert(group.map(str::to_string));
        self
    }

    pub fn with_updates<I>(self, updates: I) -> Self
    where
        I: IntoIterator<Item = Result<GameUpdate, FetchError>>,
    {
        self.updates.lock().unwrap().extend(updates);
        self
    }

    /// Score fetches never complete.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn scoreboard_calls(&self) -> usize {
        self.scoreboard_calls.load(Ordering::SeqCst)
    }

    pub fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameSource for FakeSource {
    async fn fetch_scoreboard(
        &self,
        _sport: &str,
        _league: &str,
        group: Option<&str>,
    ) -> Result<Vec<Game>, FetchError> {
        self.scoreboard_calls.fetch_add(1, Ordering::SeqCst);
        let key = group.map(str::to_string);
        if self.failing_groups.contains(&key) {
            return Err(FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(self.scoreboards.get(&key).cloned().unwrap_or_default())
    }

    async fn fetch_game_score(&self, game: &Game) -> Result<GameUpdate, FetchError> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        let next = self.updates.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(FetchError::GameNotFound(game.id.clone())))
    }
}

/// Remembers every batch it was handed.
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(String, Vec<Notification>)>>,
}

impl RecordingSink {
    pub fn deliveries(&self) -> Vec<(String, Vec<Notification>)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(
        &self,
        channel: &str,
        notifications: &[Notification],
    ) -> Result<(), DispatchError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((channel.to_string(), notifications.to_vec()));
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn deliver(&self, channel: &str, _: &[Notification]) -> Result<(), DispatchError> {
        Err(DispatchError::Rejected(format!("{} is unavailable", channel)))
    }
}

pub struct HangingSink;

#[async_trait]
impl NotificationSink for HangingSink {
    async fn deliver(&self, _: &str, _: &[Notification]) -> Result<(), DispatchError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
