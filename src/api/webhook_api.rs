use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::api::NotificationSink;
use crate::error::DispatchError;
use crate::models::Notification;

/// Writes notifications to the log instead of sending them anywhere
#[derive(Debug, Default, Clone)]
pub struct LoggerSink;

#[async_trait]
impl NotificationSink for LoggerSink {
    async fn deliver(
        &self,
        channel: &str,
        notifications: &[Notification],
    ) -> Result<(), DispatchError> {
        for notification in notifications {
            info!(
                channel,
                title = %notification.title,
                message = %notification.message,
                "notification"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
}

/// Posts each notification to a Slack incoming webhook
pub struct SlackWebhook {
    client: Client,
    url: String,
}

impl SlackWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    fn payload(notification: &Notification) -> SlackPayload {
        SlackPayload {
            text: format!("*{}*\n{}", notification.title, notification.message),
        }
    }
}

#[async_trait]
impl NotificationSink for SlackWebhook {
    async fn deliver(
        &self,
        channel: &str,
        notifications: &[Notification],
    ) -> Result<(), DispatchError> {
        for notification in notifications {
            post_json(&self.client, &self.url, channel, &Self::payload(notification)).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HomeAssistantPayload<'a> {
    title: &'a str,
    message: &'a str,
}

/// Posts each notification to a Home Assistant webhook automation
pub struct HomeAssistantWebhook {
    client: Client,
    url: String,
}

impl HomeAssistantWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for HomeAssistantWebhook {
    async fn deliver(
        &self,
        channel: &str,
        notifications: &[Notification],
    ) -> Result<(), DispatchError> {
        for notification in notifications {
            let payload = HomeAssistantPayload {
                title: &notification.title,
                message: &notification.message,
            };
            post_json(&self.client, &self.url, channel, &payload).await?;
        }
        Ok(())
    }
}

async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    channel: &str,
    payload: &T,
) -> Result<(), DispatchError> {
    let response = client.post(url).json(payload).send().await?;

    if !response.status().is_success() {
        return Err(DispatchError::Status {
            channel: channel.to_string(),
            status: response.status(),
        });
    }
    Ok(())
}
