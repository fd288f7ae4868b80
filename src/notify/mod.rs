//! Notification sink adapter.
//!
//! The engine hands every successfully locked change to a [`NotificationSink`].
//! [`SlackNotifier`] formats it as a Slack message and posts it to each
//! configured incoming webhook.

mod message;
mod slack;
pub use message::*;
pub use slack::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Action;
use crate::ChangeEvent;
use crate::NotifyResult;

/// A change to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub action: Action,
    pub key: String,
    pub value: String,
    pub prev_value: Option<String>,
}

impl From<&ChangeEvent> for Notification {
    fn from(event: &ChangeEvent) -> Self {
        Notification {
            action: event.action,
            key: event.key.clone(),
            value: event.value.clone(),
            prev_value: event.prev_value.clone(),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Delivers one notification to every destination.
    ///
    /// Fails on the first destination that cannot be reached or answers with
    /// a non-success status; remaining destinations are not attempted.
    async fn notify(
        &self,
        notification: &Notification,
    ) -> NotifyResult<()>;
}
