use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;
use tracing::warn;

use super::supervisor::Supervisor;
use super::watch_webhook_endpoints;
use super::EngineContext;
use super::Generation;
use super::WebhookEndpoints;
use crate::constants::WATCH_TARGET_LIST_KEY;
use crate::utils::join_key;
use crate::Error;
use crate::KeysApi;
use crate::NotificationSink;
use crate::Result;
use crate::WatchConfig;

/// Process-level handle on the watch-and-notify engine.
///
/// `start` spawns the watch-list supervisor and the webhook endpoint watcher
/// under a single root scope; `stop` cancels that scope and waits until every
/// loop has exited.
pub struct WatchEngine {
    ctx: Arc<EngineContext>,
    root: CancellationToken,
    tracker: TaskTracker,
    generation_tx: Arc<watch::Sender<Generation>>,
    started: AtomicBool,
}

impl WatchEngine {
    pub fn new(
        keys: Arc<dyn KeysApi>,
        sink: Arc<dyn NotificationSink>,
        endpoints: WebhookEndpoints,
        config: &WatchConfig,
    ) -> Self {
        let (generation_tx, _) = watch::channel(Generation::default());
        Self {
            ctx: Arc::new(EngineContext::new(keys, sink, endpoints, config)),
            root: CancellationToken::new(),
            tracker: TaskTracker::new(),
            generation_tx: Arc::new(generation_tx),
            started: AtomicBool::new(false),
        }
    }

    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Watch engine already started");
            return;
        }
        info!(
            instance = %self.ctx.lock().owner(),
            watch_list = %self.ctx.watch_list_key(),
            "Starting watch engine"
        );

        let supervisor = Supervisor::new(self.ctx.clone(), self.root.clone(), self.generation_tx.clone());
        self.tracker.spawn(supervisor.run());
        self.tracker
            .spawn(watch_webhook_endpoints(self.ctx.clone(), self.root.clone()));
    }

    /// Cancels every loop and waits for them to finish.
    pub async fn stop(&self) {
        self.root.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("Watch engine stopped");
    }

    /// Latest generation of per-key loops.
    pub fn generations(&self) -> watch::Receiver<Generation> {
        self.generation_tx.subscribe()
    }

    pub fn endpoints(&self) -> &WebhookEndpoints {
        &self.ctx.endpoints
    }

    pub fn context(&self) -> Arc<EngineContext> {
        self.ctx.clone()
    }

    /// Cancelled when the engine stops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.clone()
    }
}

/// Startup read of the watch list key.
///
/// An absent key is fine; any other failure means the store cannot be used
/// and is reported as fatal.
pub async fn probe_store(
    keys: &dyn KeysApi,
    config: &WatchConfig,
) -> Result<()> {
    let key = join_key(&config.metadata_dir, WATCH_TARGET_LIST_KEY);
    match keys.get(&key).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_key_not_found() => Ok(()),
        Err(e) => Err(Error::Fatal(format!("coordination store is not usable: {e}"))),
    }
}
