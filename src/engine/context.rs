use std::sync::Arc;
use std::time::Duration;

use super::EventLock;
use super::WebhookEndpoints;
use crate::constants::INCOMING_WEBHOOK_URLS_KEY;
use crate::constants::LOCK_DIR;
use crate::constants::WATCH_TARGET_LIST_KEY;
use crate::utils::join_key;
use crate::KeysApi;
use crate::NotificationSink;
use crate::WatchConfig;

/// Everything a watch loop needs, handed to each loop at spawn time.
pub struct EngineContext {
    pub(crate) keys: Arc<dyn KeysApi>,
    pub(crate) sink: Arc<dyn NotificationSink>,
    pub(crate) lock: EventLock,
    pub(crate) endpoints: WebhookEndpoints,
    pub(crate) meta_dir: String,
    pub(crate) retry_delay: Duration,
}

impl EngineContext {
    pub fn new(
        keys: Arc<dyn KeysApi>,
        sink: Arc<dyn NotificationSink>,
        endpoints: WebhookEndpoints,
        config: &WatchConfig,
    ) -> Self {
        let meta_dir = config.metadata_dir.clone();
        let lock = EventLock::new(
            keys.clone(),
            join_key(&meta_dir, LOCK_DIR),
            config.lock_ttl(),
            config.resolve_instance_id(),
        );
        Self {
            keys,
            sink,
            lock,
            endpoints,
            meta_dir,
            retry_delay: config.retry_delay(),
        }
    }

    pub fn watch_list_key(&self) -> String {
        join_key(&self.meta_dir, WATCH_TARGET_LIST_KEY)
    }

    pub fn webhook_urls_key(&self) -> String {
        join_key(&self.meta_dir, INCOMING_WEBHOOK_URLS_KEY)
    }

    pub fn lock(&self) -> &EventLock {
        &self.lock
    }
}
