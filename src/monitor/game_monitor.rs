//! Per-game polling state machine.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::api::GameSource;
use crate::config::TrackerConfig;
use crate::models::{Game, GameStatus};
use crate::monitor::dispatcher::Dispatcher;
use crate::monitor::tracking::PollTracker;

/// How a monitor ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Horizon elapsed or the game went final.
    Completed { summary: String },
    /// Stopped by an external cancellation request.
    Cancelled,
    /// Stopped by a fatal configuration error.
    Failed { reason: String },
}

impl fmt::Display for MonitorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorOutcome::Completed { summary } => write!(f, "{}", summary),
            MonitorOutcome::Cancelled => write!(f, "cancelled"),
            MonitorOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Lifecycle of a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    WaitingForStart,
    Polling,
    Stopped(MonitorOutcome),
}

impl MonitorState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, MonitorState::Stopped(_))
    }

    pub fn outcome(&self) -> Option<&MonitorOutcome> {
        match self {
            MonitorState::Stopped(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MonitorState::WaitingForStart => "waiting",
            MonitorState::Polling => "polling",
            MonitorState::Stopped(MonitorOutcome::Completed { .. }) => "completed",
            MonitorState::Stopped(MonitorOutcome::Cancelled) => "cancelled",
            MonitorState::Stopped(MonitorOutcome::Failed { .. }) => "failed",
        }
    }
}

enum Stop {
    Cancelled,
    Fatal(String),
}

/// Watches one game from before kickoff until the horizon elapses.
pub struct GameMonitor {
    game: Game,
    tracker: PollTracker,
    config: Arc<TrackerConfig>,
    source: Arc<dyn GameSource>,
    dispatcher: Arc<Dispatcher>,
    game_tx: watch::Sender<Game>,
    state_tx: watch::Sender<MonitorState>,
    shutdown: watch::Receiver<bool>,
}

impl GameMonitor {
    pub fn new(
        game: Game,
        config: Arc<TrackerConfig>,
        source: Arc<dyn GameSource>,
        dispatcher: Arc<Dispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (game_tx, _) = watch::channel(game.clone());
        let (state_tx, _) = watch::channel(MonitorState::WaitingForStart);

        Self {
            tracker: PollTracker::prime(&game),
            game,
            config,
            source,
            dispatcher,
            game_tx,
            state_tx,
            shutdown,
        }
    }

    /// Live view of the game as the monitor sees it.
    pub fn subscribe_game(&self) -> watch::Receiver<Game> {
        self.game_tx.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
        self.state_tx.subscribe()
    }

    /// Run until the horizon elapses, the game goes final, or cancellation.
    pub async fn run(mut self) -> MonitorOutcome {
        let outcome = match self.drive().await {
            Ok(summary) => {
                info!(game_id = %self.game.id, summary = %summary, "game monitor completed");
                MonitorOutcome::Completed { summary }
            }
            Err(Stop::Cancelled) => {
                info!(game_id = %self.game.id, "game monitor cancelled");
                MonitorOutcome::Cancelled
            }
            Err(Stop::Fatal(reason)) => {
                error!(game_id = %self.game.id, reason = %reason, "game monitor failed");
                MonitorOutcome::Failed { reason }
            }
        };

        self.state_tx.send_replace(MonitorState::Stopped(outcome.clone()));
        outcome
    }

    async fn drive(&mut self) -> Result<String, Stop> {
        let now = Utc::now();
        // None when the horizon is too far out to represent; polling then
        // ends on final status or cancellation
        let remaining = horizon_remaining(self.game.start_time, now, self.config.monitoring_horizon);
        let deadline = Instant::now().checked_add(remaining);

        let until_start = (self.game.start_time - now).to_std().unwrap_or(Duration::ZERO);
        if !until_start.is_zero() {
            info!(
                game_id = %self.game.id,
                start_time = %self.game.start_time,
                "waiting for game to start"
            );
            until_cancelled(&mut self.shutdown, sleep(until_start))
                .await
                .ok_or(Stop::Cancelled)?;
        }

        self.tracker = PollTracker::prime(&self.game);
        self.state_tx.send_replace(MonitorState::Polling);
        info!(
            game_id = %self.game.id,
            home = %self.game.home.display_name,
            away = %self.game.away.display_name,
            "game monitoring started"
        );

        while deadline.map_or(true, |deadline| Instant::now() < deadline) {
            until_cancelled(&mut self.shutdown, sleep(self.config.poll_interval))
                .await
                .ok_or(Stop::Cancelled)?;

            if self.poll().await? == GameStatus::Final {
                info!(game_id = %self.game.id, "game is final");
                break;
            }
        }

        Ok(self.game.final_summary())
    }

    /// One iteration: fetch, detect, notify, advance. A failed fetch leaves
    /// every tracked value untouched.
    async fn poll(&mut self) -> Result<GameStatus, Stop> {
        let fetch = timeout(
            self.config.fetch_timeout,
            self.source.fetch_game_score(&self.game),
        );
        let update = match until_cancelled(&mut self.shutdown, fetch).await {
            None => return Err(Stop::Cancelled),
            Some(Err(_)) => {
                warn!(
                    game_id = %self.game.id,
                    timeout = ?self.config.fetch_timeout,
                    "score fetch timed out"
                );
                return Ok(self.game.status);
            }
            Some(Ok(Err(e))) => {
                warn!(game_id = %self.game.id, error = %e, "failed to fetch game score");
                return Ok(self.game.status);
            }
            Some(Ok(Ok(update))) => update,
        };

        let observed = match self.game.observe(update) {
            Ok(observed) => observed,
            Err(e) => {
                warn!(game_id = %self.game.id, error = %e, "discarding game update");
                return Ok(self.game.status);
            }
        };

        let outcome = self.tracker.evaluate(&observed, &self.config.categories);
        for event in &outcome.events {
            debug!(game_id = %observed.id, event = ?event, "detected event");
        }

        self.game = observed;
        self.tracker = outcome.next;
        self.game_tx.send_replace(self.game.clone());

        if !outcome.notifications.is_empty() {
            info!(
                game_id = %self.game.id,
                count = outcome.notifications.len(),
                "dispatching notifications"
            );
            let dispatch = self.dispatcher.dispatch(&outcome.notifications);
            match until_cancelled(&mut self.shutdown, dispatch).await {
                None => return Err(Stop::Cancelled),
                Some(Err(e)) => return Err(Stop::Fatal(e.to_string())),
                Some(Ok(report)) => {
                    if !report.all_delivered() {
                        warn!(
                            game_id = %self.game.id,
                            failed = report.failed.len(),
                            delivered = report.delivered.len(),
                            "some channels failed"
                        );
                    }
                }
            }
        }

        Ok(self.game.status)
    }
}

/// Time left to monitor, measured from `now`. Polling lasts until
/// `start + horizon`, however late the monitor starts.
pub fn horizon_remaining(start: DateTime<Utc>, now: DateTime<Utc>, horizon: Duration) -> Duration {
    match (start - now).to_std() {
        Ok(until_start) => until_start.saturating_add(horizon),
        Err(_) => {
            let since_start = (now - start).to_std().unwrap_or(Duration::ZERO);
            horizon.saturating_sub(since_start)
        }
    }
}

/// Drive `fut` unless cancellation is (or becomes) requested first.
async fn until_cancelled<F: Future>(
    shutdown: &mut watch::Receiver<bool>,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancelled(shutdown) => None,
        output = fut => Some(output),
    }
}

async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // no one left who could cancel us
            std::future::pending::<()>().await;
        }
    }
}
