//! Hot-reloadable webhook endpoint set.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::decode_endpoints;
use super::EngineContext;
use crate::metrics::WATCH_ERRORS;
use crate::utils::sleep_or_cancelled;
use crate::KeyWatcher;
use crate::StoreError;

/// Shared snapshot of the webhook destinations.
///
/// Read by every delivery and replaced wholesale by the endpoint watcher;
/// readers never see a partially updated list.
#[derive(Debug, Clone, Default)]
pub struct WebhookEndpoints {
    inner: Arc<ArcSwap<Vec<String>>>,
}

impl WebhookEndpoints {
    pub fn new(initial: Vec<String>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<String>> {
        self.inner.load_full()
    }

    pub fn replace(
        &self,
        endpoints: Vec<String>,
    ) {
        self.inner.store(Arc::new(endpoints));
    }
}

/// Keeps the endpoint snapshot in sync with `<metaDir>/incomingWebHookUrls`.
///
/// A missing key leaves the configured seed in place; a later delete empties it.
pub(crate) async fn watch_webhook_endpoints(
    ctx: Arc<EngineContext>,
    cancel: CancellationToken,
) {
    let key = ctx.webhook_urls_key();

    let wait_index = match ctx.keys.get(&key).await {
        Ok(res) => {
            let endpoints = decode_endpoints(&res.node.value);
            info!(count = endpoints.len(), "Loaded incoming webhook urls");
            ctx.endpoints.replace(endpoints);
            Some(res.index + 1)
        }
        Err(e) => {
            if e.is_key_not_found() {
                info!(key = %key, "No incoming webhook urls in store yet");
            } else {
                error!(key = %key, "Fail to initialize incoming webhook urls: {}", e);
            }
            e.current_index().map(|index| index + 1)
        }
    };

    let mut watcher = KeyWatcher::new(ctx.keys.clone(), key.clone()).from_index(wait_index);
    loop {
        let event = match watcher.next(&cancel).await {
            Ok(event) => event,
            Err(StoreError::Cancelled) => {
                debug!(key = %key, "Stop watching key");
                return;
            }
            Err(e) => {
                error!(key = %key, "Watch failed: {}", e);
                WATCH_ERRORS.with_label_values(&["endpoints"]).inc();
                if sleep_or_cancelled(&cancel, ctx.retry_delay).await {
                    return;
                }
                continue;
            }
        };

        let endpoints = decode_endpoints(&event.value);
        info!(count = endpoints.len(), action = %event.action, "Updating incoming webhook urls");
        ctx.endpoints.replace(endpoints);
    }
}
