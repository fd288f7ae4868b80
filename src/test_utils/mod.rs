//! Test doubles shared by the unit tests: an in-memory sink that records
//! deliveries, a store wrapper that fails a configurable number of watches
//! and reads, and a ready-made engine context.

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::ChangeEvent;
use crate::DeleteOptions;
use crate::EngineContext;
use crate::KeysApi;
use crate::MemKeysApi;
use crate::Node;
use crate::Notification;
use crate::NotificationSink;
use crate::NotifyError;
use crate::NotifyResult;
use crate::ReadResponse;
use crate::SetOptions;
use crate::StoreError;
use crate::StoreResult;
use crate::WatchConfig;
use crate::WatchOptions;
use crate::WebhookEndpoints;

pub(crate) const TEST_META_DIR: &str = "/meta";

pub(crate) fn test_watch_config() -> WatchConfig {
    WatchConfig {
        metadata_dir: TEST_META_DIR.to_string(),
        retry_delay_in_ms: 50,
        instance_id: "test-instance".to_string(),
        ..Default::default()
    }
}

pub(crate) fn test_context(
    keys: Arc<dyn KeysApi>,
    sink: Arc<dyn NotificationSink>,
) -> Arc<EngineContext> {
    Arc::new(EngineContext::new(
        keys,
        sink,
        WebhookEndpoints::default(),
        &test_watch_config(),
    ))
}

/// Records every notification; can be told to fail the next `n` deliveries.
#[derive(Debug)]
pub(crate) struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
    count_tx: watch::Sender<usize>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        let (count_tx, _) = watch::channel(0);
        Arc::new(Self {
            delivered: Mutex::new(Vec::new()),
            count_tx,
            failures_left: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        })
    }

    pub(crate) fn fail_next(
        &self,
        n: usize,
    ) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub(crate) fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().clone()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` notifications were delivered.
    pub(crate) async fn wait_for(
        &self,
        count: usize,
    ) -> Vec<Notification> {
        let mut rx = self.count_tx.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|n| *n >= count))
            .await
            .expect("timed out waiting for notifications")
            .expect("sink dropped");
        self.delivered()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(
        &self,
        notification: &Notification,
    ) -> NotifyResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NotifyError::UnexpectedStatus {
                url: "http://sink.test/hook".to_string(),
                status: 500,
            });
        }

        let mut delivered = self.delivered.lock();
        delivered.push(notification.clone());
        self.count_tx.send_replace(delivered.len());
        Ok(())
    }
}

/// Delegates to a [`MemKeysApi`] but fails the first `n` watch calls, and
/// the first reads of keys registered with [`FlakyKeys::fail_next_gets`].
pub(crate) struct FlakyKeys {
    inner: Arc<MemKeysApi>,
    watch_failures_left: AtomicUsize,
    watch_calls: AtomicUsize,
    get_failures: Mutex<HashMap<String, usize>>,
}

impl FlakyKeys {
    pub(crate) fn new(
        inner: Arc<MemKeysApi>,
        watch_failures: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner,
            watch_failures_left: AtomicUsize::new(watch_failures),
            watch_calls: AtomicUsize::new(0),
            get_failures: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn fail_next_gets(
        &self,
        key: &str,
        n: usize,
    ) {
        self.get_failures.lock().insert(key.to_string(), n);
    }

    pub(crate) fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeysApi for FlakyKeys {
    async fn get(
        &self,
        key: &str,
    ) -> StoreResult<ReadResponse> {
        let failing = match self.get_failures.lock().get_mut(key) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if failing {
            return Err(StoreError::UnexpectedStatus {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        opts: SetOptions,
    ) -> StoreResult<Node> {
        self.inner.set(key, value, opts).await
    }

    async fn delete(
        &self,
        key: &str,
        opts: DeleteOptions,
    ) -> StoreResult<()> {
        self.inner.delete(key, opts).await
    }

    async fn watch(
        &self,
        key: &str,
        opts: WatchOptions,
    ) -> StoreResult<ChangeEvent> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .watch_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::UnexpectedStatus {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.inner.watch(key, opts).await
    }
}

/// Waits until `rx` holds a value matching `pred`.
pub(crate) async fn wait_until<T, F>(
    rx: &mut watch::Receiver<T>,
    pred: F,
) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for condition")
        .expect("sender dropped")
        .clone()
}
