use serde::Deserialize;
use serde::Serialize;

use crate::Action;
use crate::NotifyResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackAttachment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl SlackAttachment {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Slack message body, shared by webhook posts and command replies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SlackAttachment>,
}

impl SlackMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(
        mut self,
        attachments: Vec<SlackAttachment>,
    ) -> Self {
        self.attachments = attachments;
        self
    }

    /// Alert for a change of `key` to `value`.
    pub fn change_alert(
        action: Action,
        key: &str,
        value: &str,
    ) -> Self {
        Self::new(format!("*{action}* event occurred!!!"))
            .with_attachments(vec![SlackAttachment::new(key, value)])
    }

    pub fn to_json(&self) -> NotifyResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
