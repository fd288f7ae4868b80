//! Error hierarchy for the watch-and-notify service
//!
//! Errors are grouped by the collaborator that produced them: the coordination
//! store, the notification sink, and the configuration layer.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type NotifyResult<T> = std::result::Result<T, NotifyError>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Coordination store failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Notification delivery failures
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Failures reported by a [`crate::KeysApi`] implementation.
///
/// The variants carrying `index` report the store's global index at the time
/// of the failure, which callers use to resume watching.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Key does not exist (etcd code 100)
    #[error("Key not found: {key} (index {index})")]
    KeyNotFound { key: String, index: u64 },

    /// Compare-and-swap precondition failed (etcd code 101)
    #[error("Compare failed on {key} (index {index})")]
    CompareFailed { key: String, index: u64 },

    /// Create-only write found an existing key (etcd code 105)
    #[error("Key already exists: {key} (index {index})")]
    NodeExists { key: String, index: u64 },

    /// Requested watch index is no longer in the store's history (etcd code 401)
    #[error("Event index cleared, current index is {index}")]
    EventIndexCleared { index: u64 },

    /// Any other error code returned by the store
    #[error("Store error {code}: {message}")]
    Server { code: u32, message: String, index: u64 },

    /// Watch aborted because its governing scope was cancelled
    #[error("Watch cancelled")]
    Cancelled,

    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected store response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Malformed store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No store endpoint configured")]
    NoEndpoints,
}

impl StoreError {
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound { .. })
    }

    pub fn is_node_exists(&self) -> bool {
        matches!(self, StoreError::NodeExists { .. })
    }

    /// A concurrent writer won the compare-and-swap race.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StoreError::CompareFailed { .. })
    }

    /// Store index carried by the error metadata, if any.
    pub fn current_index(&self) -> Option<u64> {
        match self {
            StoreError::KeyNotFound { index, .. }
            | StoreError::CompareFailed { index, .. }
            | StoreError::NodeExists { index, .. }
            | StoreError::EventIndexCleared { index }
            | StoreError::Server { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Webhook request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Webhook post failed. status code = {status} ({url})")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Failed to encode webhook payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to build webhook client: {0}")]
    Client(String),
}
