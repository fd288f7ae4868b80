// -
// Metadata namespace (relative to the configured metadata root)

/// Comma-joined list of keys to watch
pub const WATCH_TARGET_LIST_KEY: &str = "watchTargetList";

/// Comma-joined list of incoming webhook endpoints
pub const INCOMING_WEBHOOK_URLS_KEY: &str = "incomingWebHookUrls";

/// Directory holding per-event lock entries, named by change version
pub const LOCK_DIR: &str = "lock";

// -
// Defaults

pub(crate) const DEFAULT_METADATA_DIR: &str = "/etcdbot_meta/";
pub(crate) const DEFAULT_ETCD_ENDPOINT: &str = "http://localhost:2379";
pub(crate) const DEFAULT_LOCK_TTL_IN_SECS: u64 = 60;
pub(crate) const DEFAULT_RETRY_DELAY_IN_MS: u64 = 10_000;
pub(crate) const DEFAULT_TRIGGER_WORD: &str = "etcdbot";

/// Number of change events the in-memory store keeps for resumed watches
pub(crate) const MEM_EVENT_HISTORY_CAPACITY: usize = 1000;

/// Prefix of generated instance ids
pub(crate) const INSTANCE_ID_PREFIX: &str = "watchbot-";
