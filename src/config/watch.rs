use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use super::validate_key_path;
use crate::constants::DEFAULT_LOCK_TTL_IN_SECS;
use crate::constants::DEFAULT_METADATA_DIR;
use crate::constants::DEFAULT_RETRY_DELAY_IN_MS;
use crate::constants::INSTANCE_ID_PREFIX;
use crate::Result;

/// Watch engine settings and metadata layout
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Root under which the watch list, webhook list and lock entries live
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,

    /// Keys added through the command interface must start with this prefix
    #[serde(default = "default_watch_base")]
    pub watch_base: String,

    /// Lifetime of a lock entry. Bounds the deduplication window.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_in_secs: u64,

    /// Pause after a failed watch call before it is retried
    #[serde(default = "default_retry_delay")]
    pub retry_delay_in_ms: u64,

    /// Written into lock entries. Generated when empty.
    #[serde(default)]
    pub instance_id: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            metadata_dir: default_metadata_dir(),
            watch_base: default_watch_base(),
            lock_ttl_in_secs: default_lock_ttl(),
            retry_delay_in_ms: default_retry_delay(),
            instance_id: String::new(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        validate_key_path(&self.metadata_dir, "watch.metadata_dir")?;
        validate_key_path(&self.watch_base, "watch.watch_base")?;
        if self.lock_ttl_in_secs == 0 {
            return Err(invalid("watch.lock_ttl_in_secs must be greater than 0"));
        }
        if self.retry_delay_in_ms == 0 {
            return Err(invalid("watch.retry_delay_in_ms must be greater than 0"));
        }
        Ok(())
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_in_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_in_ms)
    }

    /// Configured instance id, or a fresh random one.
    pub fn resolve_instance_id(&self) -> String {
        if self.instance_id.is_empty() {
            format!("{}{}", INSTANCE_ID_PREFIX, nanoid::nanoid!(10))
        } else {
            self.instance_id.clone()
        }
    }
}

fn default_metadata_dir() -> String {
    DEFAULT_METADATA_DIR.to_string()
}
fn default_watch_base() -> String {
    "/".to_string()
}
fn default_lock_ttl() -> u64 {
    DEFAULT_LOCK_TTL_IN_SECS
}
fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_IN_MS
}
