use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Notification sink settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SlackConfig {
    /// Initial endpoint set, replaced once the store copy is read
    #[serde(default)]
    pub incoming_webhook_urls: Vec<String>,

    /// Log payloads instead of posting them
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            incoming_webhook_urls: Vec::new(),
            dry_run: false,
            request_timeout_in_ms: default_request_timeout(),
        }
    }
}

impl SlackConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = self
            .incoming_webhook_urls
            .iter()
            .find(|u| !(u.starts_with("http://") || u.starts_with("https://")))
        {
            return Err(invalid(format!("incoming webhook url {url:?} is not an http(s) url")));
        }
        if self.request_timeout_in_ms == 0 {
            return Err(invalid("slack.request_timeout_in_ms must be greater than 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }
}

fn default_request_timeout() -> u64 {
    5000
}
