//! Tracker configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{Result, TrackerError};
use crate::models::NotificationCategory;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_MONITORING_HORIZON: Duration = Duration::from_secs(5 * 60 * 60);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest horizon accepted from the environment: one week.
const MAX_MONITORING_HORIZON_MINUTES: u64 = 7 * 24 * 60;

/// Webhook endpoints for the built-in channels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookConfig {
    pub slack_url: Option<String>,
    pub home_assistant_url: Option<String>,
}

/// Configuration shared by the scheduler, registry and every monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Which kinds of change produce notifications.
    pub categories: BTreeSet<NotificationCategory>,
    /// Channels each poll's notifications are sent to, in order.
    pub channels: Vec<String>,
    /// Delay between polls of one game.
    pub poll_interval: Duration,
    /// How long after the start time a game is monitored.
    pub monitoring_horizon: Duration,
    /// Upper bound on one upstream fetch.
    pub fetch_timeout: Duration,
    /// Upper bound on one channel delivery.
    pub dispatch_timeout: Duration,
    pub webhooks: WebhookConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            categories: BTreeSet::from([NotificationCategory::ScoreChange]),
            channels: vec!["logger".to_string()],
            poll_interval: DEFAULT_POLL_INTERVAL,
            monitoring_horizon: DEFAULT_MONITORING_HORIZON,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            webhooks: WebhookConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key/value source. Unset or blank keys
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(types) = get("NOTIFICATION_TYPES") {
            config.categories = split_list(&types)
                .map(|name| name.parse::<NotificationCategory>())
                .collect::<Result<BTreeSet<_>>>()?;
        }

        if let Some(channels) = get("NOTIFICATION_CHANNELS") {
            config = config.with_channels(split_list(&channels));
        }

        if let Some(secs) = get("POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(parse_number("POLL_INTERVAL_SECS", &secs)?);
        }

        if let Some(minutes) = get("MONITORING_HORIZON_MINUTES") {
            let minutes = parse_number("MONITORING_HORIZON_MINUTES", &minutes)?;
            if minutes > MAX_MONITORING_HORIZON_MINUTES {
                return Err(TrackerError::Configuration(format!(
                    "MONITORING_HORIZON_MINUTES must be at most {}, got {}",
                    MAX_MONITORING_HORIZON_MINUTES, minutes
                )));
            }
            config.monitoring_horizon = Duration::from_secs(minutes * 60);
        }

        if let Some(secs) = get("FETCH_TIMEOUT_SECS") {
            config.fetch_timeout = Duration::from_secs(parse_number("FETCH_TIMEOUT_SECS", &secs)?);
        }

        if let Some(secs) = get("DISPATCH_TIMEOUT_SECS") {
            config.dispatch_timeout =
                Duration::from_secs(parse_number("DISPATCH_TIMEOUT_SECS", &secs)?);
        }

        config.webhooks = WebhookConfig {
            slack_url: get("SLACK_WEBHOOK_URL"),
            home_assistant_url: get("HASS_WEBHOOK_URL"),
        };

        if config.poll_interval.is_zero() {
            return Err(TrackerError::Configuration(
                "POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn with_categories<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = NotificationCategory>,
    {
        self.categories = categories.into_iter().collect();
        self
    }

    /// Sets the channels, dropping blanks and repeats.
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels.clear();
        for channel in channels {
            let channel: String = channel.into();
            let channel = channel.trim().to_string();
            if !channel.is_empty() && !self.channels.contains(&channel) {
                self.channels.push(channel);
            }
        }
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_monitoring_horizon(mut self, horizon: Duration) -> Self {
        self.monitoring_horizon = horizon;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn with_webhooks(mut self, webhooks: WebhookConfig) -> Self {
        self.webhooks = webhooks;
        self
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        TrackerError::Configuration(format!("{} must be a whole number, got {:?}", key, value))
    })
}
