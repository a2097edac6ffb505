//! Fans notifications out to the configured channels.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::api::{HomeAssistantWebhook, LoggerSink, NotificationSink, SlackWebhook};
use crate::config::TrackerConfig;
use crate::error::{DispatchError, Result, TrackerError};
use crate::models::{Notification, NotificationBatch};

pub const LOGGER_CHANNEL: &str = "logger";
pub const SLACK_CHANNEL: &str = "slack";
pub const HOME_ASSISTANT_CHANNEL: &str = "hass";

/// Outcome of sending one poll's notifications.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, DispatchError)>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Routes notification batches to named sinks.
pub struct Dispatcher {
    channels: Vec<String>,
    sinks: HashMap<String, Arc<dyn NotificationSink>>,
    timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher with no sinks registered.
    pub fn new<I, S>(channels: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
            sinks: HashMap::new(),
            timeout,
        }
    }

    /// Creates a dispatcher with the built-in sinks for the configured
    /// channels. Fails if a channel has no sink.
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        let mut dispatcher = Self::new(config.channels.iter().cloned(), config.dispatch_timeout)
            .with_sink(LOGGER_CHANNEL, Arc::new(LoggerSink));

        for channel in &config.channels {
            match channel.as_str() {
                SLACK_CHANNEL => {
                    let url = config.webhooks.slack_url.as_ref().ok_or_else(|| {
                        TrackerError::Configuration(
                            "slack channel enabled but SLACK_WEBHOOK_URL is not set".to_string(),
                        )
                    })?;
                    dispatcher = dispatcher.with_sink(SLACK_CHANNEL, Arc::new(SlackWebhook::new(url)));
                }
                HOME_ASSISTANT_CHANNEL => {
                    let url = config.webhooks.home_assistant_url.as_ref().ok_or_else(|| {
                        TrackerError::Configuration(
                            "hass channel enabled but HASS_WEBHOOK_URL is not set".to_string(),
                        )
                    })?;
                    dispatcher = dispatcher
                        .with_sink(HOME_ASSISTANT_CHANNEL, Arc::new(HomeAssistantWebhook::new(url)));
                }
                _ => {}
            }
        }

        dispatcher.validate()?;
        Ok(dispatcher)
    }

    /// Registers (or replaces) the sink for a channel name.
    pub fn with_sink(mut self, channel: impl Into<String>, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.insert(channel.into(), sink);
        self
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Checks every configured channel has a sink.
    pub fn validate(&self) -> Result<()> {
        for channel in &self.channels {
            self.sink(channel)?;
        }
        Ok(())
    }

    fn sink(&self, channel: &str) -> Result<&Arc<dyn NotificationSink>> {
        self.sinks.get(channel).ok_or_else(|| {
            TrackerError::Configuration(format!("unknown notification channel: {}", channel))
        })
    }

    /// One batch per configured channel, each with the same notifications.
    pub fn batches(&self, notifications: &[Notification]) -> Vec<NotificationBatch> {
        self.channels
            .iter()
            .map(|channel| NotificationBatch {
                channel: channel.clone(),
                notifications: notifications.to_vec(),
            })
            .collect()
    }

    /// Send notifications to every configured channel.
    pub async fn dispatch(&self, notifications: &[Notification]) -> Result<DispatchReport> {
        self.dispatch_batches(self.batches(notifications)).await
    }

    /// Deliver each batch to its channel. A channel failure is logged and
    /// recorded in the report; the remaining channels are still attempted.
    /// An unknown channel fails the whole call before anything is sent.
    pub async fn dispatch_batches(&self, batches: Vec<NotificationBatch>) -> Result<DispatchReport> {
        let routed = batches
            .into_iter()
            .map(|batch| Ok((self.sink(&batch.channel)?, batch)))
            .collect::<Result<Vec<_>>>()?;

        let mut report = DispatchReport::default();
        for (sink, batch) in routed {
            let channel = batch.channel;
            let result = match timeout(self.timeout, sink.deliver(&channel, &batch.notifications)).await {
                Ok(result) => result,
                Err(_) => Err(DispatchError::Timeout {
                    channel: channel.clone(),
                    timeout: self.timeout,
                }),
            };

            match result {
                Ok(()) => {
                    debug!(channel = %channel, count = batch.notifications.len(), "notifications delivered");
                    report.delivered.push(channel);
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "failed to deliver notifications");
                    report.failed.push((channel, e));
                }
            }
        }

        Ok(report)
    }
}
