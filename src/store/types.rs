use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Kind of change reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Get,
    Set,
    Create,
    Update,
    Delete,
    Expire,
    CompareAndSwap,
    CompareAndDelete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Set => "set",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Expire => "expire",
            Action::CompareAndSwap => "compareAndSwap",
            Action::CompareAndDelete => "compareAndDelete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Action::Get),
            "set" => Ok(Action::Set),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "expire" => Ok(Action::Expire),
            "compareAndSwap" => Ok(Action::CompareAndSwap),
            "compareAndDelete" => Ok(Action::CompareAndDelete),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// A key and its value at a given modification index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub key: String,
    /// Empty for deleted or expired nodes
    pub value: String,
    pub created_index: u64,
    pub modified_index: u64,
    /// Remaining time to live, if the node was written with one
    pub ttl: Option<Duration>,
}

/// Result of a point read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub node: Node,
    /// Global store index at the time of the read
    pub index: u64,
}

/// A single change observed on a watched key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub action: Action,
    /// Key that changed; a descendant of the watched key for prefix watches
    pub key: String,
    pub value: String,
    /// Absent when the key did not exist before the change
    pub prev_value: Option<String>,
    /// Modified index of the change. Strictly increasing across the store.
    pub version: u64,
}

impl ChangeEvent {
    /// True when the write did not change the stored content.
    pub fn is_unchanged(&self) -> bool {
        self.prev_value.as_deref() == Some(self.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrevExist {
    #[default]
    Ignore,
    /// Write only if the key already exists
    Exist,
    /// Write only if the key does not exist
    NoExist,
}

/// Conditions attached to a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub prev_exist: PrevExist,
    /// Write only if the key's modified index still equals this value
    pub prev_index: Option<u64>,
    pub ttl: Option<Duration>,
}

impl SetOptions {
    pub fn create_only() -> Self {
        Self {
            prev_exist: PrevExist::NoExist,
            ..Default::default()
        }
    }

    pub fn compare_index(prev_index: u64) -> Self {
        Self {
            prev_index: Some(prev_index),
            ..Default::default()
        }
    }

    pub fn with_ttl(
        mut self,
        ttl: Duration,
    ) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub prev_index: Option<u64>,
}

impl DeleteOptions {
    pub fn compare_index(prev_index: u64) -> Self {
        Self {
            prev_index: Some(prev_index),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// First version of interest. `None` waits for the next change.
    pub wait_index: Option<u64>,
    /// Also report changes to descendants of the key
    pub recursive: bool,
}
