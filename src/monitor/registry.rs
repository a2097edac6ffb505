//! Running monitors, keyed by identity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::{watch, RwLock};
use tracing::{info, info_span, Instrument};

use crate::api::GameSource;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::models::Game;
use crate::monitor::dispatcher::Dispatcher;
use crate::monitor::game_monitor::{GameMonitor, MonitorOutcome, MonitorState};

/// Stable identity of the monitor for a game
pub fn monitor_identity(game_id: &str) -> String {
    format!("game-{}", game_id)
}

/// Cheap handle onto a running (or finished) monitor.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    identity: String,
    started_at: DateTime<Utc>,
    game: watch::Receiver<Game>,
    state: watch::Receiver<MonitorState>,
    cancel: Arc<watch::Sender<bool>>,
}

impl MonitorHandle {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Latest game state the monitor has observed.
    pub fn game(&self) -> Game {
        self.game.borrow().clone()
    }

    pub fn state(&self) -> MonitorState {
        self.state.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        !self.state.borrow().is_stopped()
    }

    /// Ask the monitor to stop. It reports `Cancelled` once it has.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Wait for the monitor to stop.
    pub async fn wait(&self) -> MonitorOutcome {
        let mut state = self.state.clone();
        let stopped = state.wait_for(MonitorState::is_stopped).await;
        match stopped {
            Ok(state) => state.outcome().cloned().unwrap_or(MonitorOutcome::Cancelled),
            Err(_) => MonitorOutcome::Failed {
                reason: "monitor task exited without reporting".to_string(),
            },
        }
    }

    /// True if both handles point at the same monitor.
    pub fn is_same(&self, other: &MonitorHandle) -> bool {
        Arc::ptr_eq(&self.cancel, &other.cancel)
    }
}

/// Owns every monitor and guarantees at most one per identity.
pub struct MonitorRegistry {
    config: Arc<TrackerConfig>,
    source: Arc<dyn GameSource>,
    dispatcher: Arc<Dispatcher>,
    monitors: Arc<RwLock<HashMap<String, MonitorHandle>>>,
    closed: AtomicBool,
}

impl MonitorRegistry {
    pub fn new(
        config: Arc<TrackerConfig>,
        source: Arc<dyn GameSource>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            config,
            source,
            dispatcher,
            monitors: Arc::new(RwLock::new(HashMap::new())),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Start monitoring `game`, or return the monitor already running for it.
    pub async fn spawn(&self, game: Game) -> Result<MonitorHandle> {
        let identity = monitor_identity(&game.id);
        self.spawn_as(identity, game).await
    }

    /// Start-or-attach under an explicit identity. Check and insert happen
    /// under one write lock so concurrent callers cannot both start. A
    /// monitor removes its own entry once it stops.
    pub async fn spawn_as(&self, identity: String, game: Game) -> Result<MonitorHandle> {
        let mut monitors = self.monitors.write().await;

        if self.closed.load(Ordering::SeqCst) {
            return Err(TrackerError::Spawn {
                identity,
                reason: "registry is shut down".to_string(),
            });
        }

        if let Some(existing) = monitors.get(&identity) {
            if existing.is_active() {
                info!(identity = %identity, "monitor already running");
                return Ok(existing.clone());
            }
        }

        let runtime = Handle::try_current().map_err(|e| TrackerError::Spawn {
            identity: identity.clone(),
            reason: e.to_string(),
        })?;

        let (cancel, shutdown) = watch::channel(false);
        let monitor = GameMonitor::new(
            game,
            self.config.clone(),
            self.source.clone(),
            self.dispatcher.clone(),
            shutdown,
        );

        let handle = MonitorHandle {
            identity: identity.clone(),
            started_at: Utc::now(),
            game: monitor.subscribe_game(),
            state: monitor.subscribe_state(),
            cancel: Arc::new(cancel),
        };

        let registered = self.monitors.clone();
        let own = handle.clone();
        let span = info_span!("monitor", identity = %identity);
        runtime.spawn(
            async move {
                monitor.run().await;
                let mut entries = registered.write().await;
                // a newer monitor may already hold the identity
                if entries.get(own.identity()).is_some_and(|h| h.is_same(&own)) {
                    entries.remove(own.identity());
                }
            }
            .instrument(span),
        );
        info!(identity = %identity, "started monitor");

        monitors.insert(identity, handle.clone());
        Ok(handle)
    }

    pub async fn get(&self, identity: &str) -> Option<MonitorHandle> {
        self.monitors.read().await.get(identity).cloned()
    }

    /// Every known monitor, sorted by identity.
    pub async fn list(&self) -> Vec<MonitorHandle> {
        let mut handles: Vec<MonitorHandle> = self.monitors.read().await.values().cloned().collect();
        handles.sort_by(|a, b| a.identity.cmp(&b.identity));
        handles
    }

    pub async fn active(&self) -> Vec<MonitorHandle> {
        self.list()
            .await
            .into_iter()
            .filter(MonitorHandle::is_active)
            .collect()
    }

    pub async fn active_count(&self) -> usize {
        self.monitors
            .read()
            .await
            .values()
            .filter(|h| h.is_active())
            .count()
    }

    /// Cancel every monitor and refuse new ones.
    pub async fn shutdown(&self) {
        let monitors = self.monitors.write().await;
        self.closed.store(true, Ordering::SeqCst);
        for handle in monitors.values() {
            handle.cancel();
        }
        info!(count = monitors.len(), "registry shut down");
    }
}
