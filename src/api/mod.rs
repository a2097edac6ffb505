pub mod espn_api;
pub mod webhook_api;

pub use espn_api::EspnApiClient;
pub use webhook_api::{HomeAssistantWebhook, LoggerSink, SlackWebhook};

use async_trait::async_trait;

use crate::error::{DispatchError, FetchError};
use crate::models::{Game, GameUpdate, Notification};

/// Upstream source of games and live scores
#[async_trait]
pub trait GameSource: Send + Sync {
    /// Fetch every game on a league's scoreboard, optionally narrowed to one
    /// conference group.
    async fn fetch_scoreboard(
        &self,
        sport: &str,
        league: &str,
        group: Option<&str>,
    ) -> Result<Vec<Game>, FetchError>;

    /// Fetch the current score, period and clock for one game.
    async fn fetch_game_score(&self, game: &Game) -> Result<GameUpdate, FetchError>;
}

/// Delivery transport for one notification channel
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(
        &self,
        channel: &str,
        notifications: &[Notification],
    ) -> Result<(), DispatchError>;
}
