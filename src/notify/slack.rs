use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use tracing::debug;

use super::Notification;
use super::NotificationSink;
use super::SlackMessage;
use crate::NotifyError;
use crate::NotifyResult;
use crate::SlackConfig;
use crate::WebhookEndpoints;

/// Posts change alerts to Slack incoming webhooks.
///
/// The destination list is read from the shared [`WebhookEndpoints`] snapshot
/// at delivery time.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    http: Client,
    endpoints: WebhookEndpoints,
    dry_run: bool,
}

impl SlackNotifier {
    pub fn new(
        endpoints: WebhookEndpoints,
        config: &SlackConfig,
    ) -> NotifyResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            http,
            endpoints,
            dry_run: config.dry_run,
        })
    }

    pub fn with_timeout(
        endpoints: WebhookEndpoints,
        timeout: Duration,
    ) -> NotifyResult<Self> {
        Self::new(
            endpoints,
            &SlackConfig {
                request_timeout_in_ms: timeout.as_millis() as u64,
                ..Default::default()
            },
        )
    }

    async fn post(
        &self,
        url: &str,
        payload: &str,
    ) -> NotifyResult<()> {
        let res = self
            .http
            .post(url)
            .form(&[("payload", payload)])
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                url: url.to_string(),
                source,
            })?;

        if res.status() != StatusCode::OK {
            return Err(NotifyError::UnexpectedStatus {
                url: url.to_string(),
                status: res.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for SlackNotifier {
    async fn notify(
        &self,
        notification: &Notification,
    ) -> NotifyResult<()> {
        let payload =
            SlackMessage::change_alert(notification.action, &notification.key, &notification.value)
                .to_json()?;

        if self.dry_run {
            debug!(payload = %payload, "Dry run, skip posting");
            return Ok(());
        }

        let endpoints = self.endpoints.snapshot();
        for url in endpoints.iter() {
            self.post(url, &payload).await?;
            debug!(url = %url, key = %notification.key, "Posted notification");
        }
        Ok(())
    }
}
