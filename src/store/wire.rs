//! etcd v2 JSON bodies and their mapping onto store types

use std::time::Duration;

use serde::Deserialize;

use super::Action;
use super::ChangeEvent;
use super::Node;
use crate::StoreError;

pub(crate) const ERROR_CODE_KEY_NOT_FOUND: u32 = 100;
pub(crate) const ERROR_CODE_TEST_FAILED: u32 = 101;
pub(crate) const ERROR_CODE_NODE_EXIST: u32 = 105;
pub(crate) const ERROR_CODE_EVENT_INDEX_CLEARED: u32 = 401;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireNode {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub created_index: u64,
    #[serde(default)]
    pub modified_index: u64,
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl From<WireNode> for Node {
    fn from(n: WireNode) -> Self {
        Node {
            key: n.key,
            value: n.value.unwrap_or_default(),
            created_index: n.created_index,
            modified_index: n.modified_index,
            ttl: n.ttl.filter(|t| *t > 0).map(|t| Duration::from_secs(t as u64)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireResponse {
    pub action: Action,
    pub node: WireNode,
    #[serde(default)]
    pub prev_node: Option<WireNode>,
}

impl From<WireResponse> for ChangeEvent {
    fn from(r: WireResponse) -> Self {
        let version = r.node.modified_index;
        ChangeEvent {
            action: r.action,
            key: r.node.key,
            value: r.node.value.unwrap_or_default(),
            prev_value: r.prev_node.map(|p| p.value.unwrap_or_default()),
            version,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireError {
    pub error_code: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub index: u64,
}

impl From<WireError> for StoreError {
    fn from(e: WireError) -> Self {
        match e.error_code {
            ERROR_CODE_KEY_NOT_FOUND => StoreError::KeyNotFound {
                key: e.cause,
                index: e.index,
            },
            ERROR_CODE_TEST_FAILED => StoreError::CompareFailed {
                key: e.cause,
                index: e.index,
            },
            ERROR_CODE_NODE_EXIST => StoreError::NodeExists {
                key: e.cause,
                index: e.index,
            },
            ERROR_CODE_EVENT_INDEX_CLEARED => StoreError::EventIndexCleared { index: e.index },
            code => StoreError::Server {
                code,
                message: format!("{} ({})", e.message, e.cause),
                index: e.index,
            },
        }
    }
}
