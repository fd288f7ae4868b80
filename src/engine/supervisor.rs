//! Watch-list supervisor.
//!
//! Owns the running per-key loops. Every change to the watch list replaces
//! the whole set: the current generation's scope is cancelled, its loops are
//! joined, and a fresh generation is spawned from the decoded list.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::decode_watch_list;
use super::watch_and_notify;
use super::EngineContext;
use crate::metrics::WATCH_ERRORS;
use crate::metrics::WATCH_LIST_GENERATION;
use crate::utils::sleep_or_cancelled;
use crate::KeyWatcher;
use crate::StoreError;

/// One set of per-key loops started from a single observed watch list value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    /// Starts at 1 for the initial read; 0 before the supervisor has run
    pub number: u64,
    pub keys: Vec<String>,
    /// First version each loop of this generation watches from
    pub start_index: Option<u64>,
}

struct RunningGeneration {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

pub(crate) struct Supervisor {
    ctx: Arc<EngineContext>,
    root: CancellationToken,
    generation_tx: Arc<watch::Sender<Generation>>,
    current: Option<RunningGeneration>,
    number: u64,
}

impl Supervisor {
    pub(crate) fn new(
        ctx: Arc<EngineContext>,
        root: CancellationToken,
        generation_tx: Arc<watch::Sender<Generation>>,
    ) -> Self {
        Self {
            ctx,
            root,
            generation_tx,
            current: None,
            number: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        let list_key = self.ctx.watch_list_key();
        let Some(wait_index) = self.load(&list_key).await else {
            debug!("Watch list supervisor stopped before the first read");
            return;
        };
        let mut watcher = KeyWatcher::new(self.ctx.keys.clone(), list_key.clone()).from_index(wait_index);

        loop {
            match watcher.next(&self.root).await {
                Ok(event) => {
                    let keys = decode_watch_list(&event.value);
                    info!(
                        action = %event.action,
                        version = event.version,
                        count = keys.len(),
                        "Watch list changed"
                    );
                    self.replace_generation(keys, Some(event.version + 1)).await;
                }
                Err(StoreError::Cancelled) => break,
                Err(StoreError::EventIndexCleared { .. }) => {
                    // Changes may have been missed, so start over from a fresh read
                    WATCH_ERRORS.with_label_values(&["watch_list"]).inc();
                    let Some(wait_index) = self.load(&list_key).await else {
                        break;
                    };
                    watcher = KeyWatcher::new(self.ctx.keys.clone(), list_key.clone()).from_index(wait_index);
                }
                Err(e) => {
                    error!(key = %list_key, "Watch list watch failed: {}", e);
                    WATCH_ERRORS.with_label_values(&["watch_list"]).inc();
                    if sleep_or_cancelled(&self.root, self.ctx.retry_delay).await {
                        break;
                    }
                }
            }
        }

        self.stop_current().await;
        debug!("Watch list supervisor stopped");
    }

    /// Reads the watch list and starts a generation for it.
    ///
    /// Read errors other than a missing list are retried after the retry
    /// delay. Returns the version to watch the list from, or `None` when
    /// cancelled before a read succeeded.
    async fn load(
        &mut self,
        list_key: &str,
    ) -> Option<Option<u64>> {
        let (keys, wait_index) = loop {
            match self.ctx.keys.get(list_key).await {
                Ok(res) => {
                    let keys = decode_watch_list(&res.node.value);
                    info!(count = keys.len(), index = res.index, "Loaded watch list");
                    break (keys, Some(res.index + 1));
                }
                Err(e) if e.is_key_not_found() => {
                    info!(key = %list_key, "Watch list is empty");
                    break (Vec::new(), e.current_index().map(|index| index + 1));
                }
                Err(e) => {
                    error!(key = %list_key, "Fail to read watch list: {}", e);
                    WATCH_ERRORS.with_label_values(&["watch_list"]).inc();
                    if sleep_or_cancelled(&self.root, self.ctx.retry_delay).await {
                        return None;
                    }
                }
            }
        };
        self.replace_generation(keys, wait_index).await;
        Some(wait_index)
    }

    async fn replace_generation(
        &mut self,
        keys: Vec<String>,
        start_index: Option<u64>,
    ) {
        self.stop_current().await;

        let cancel = self.root.child_token();
        let handles = keys
            .iter()
            .map(|key| {
                tokio::spawn(watch_and_notify(
                    self.ctx.clone(),
                    key.clone(),
                    start_index,
                    cancel.clone(),
                ))
            })
            .collect();
        self.current = Some(RunningGeneration { cancel, handles });

        self.number += 1;
        WATCH_LIST_GENERATION.set(self.number as i64);
        info!(generation = self.number, keys = ?keys, ?start_index, "Started watch generation");
        self.generation_tx.send_replace(Generation {
            number: self.number,
            keys,
            start_index,
        });
    }

    /// Cancels the running generation and waits for all of its loops.
    async fn stop_current(&mut self) {
        let Some(running) = self.current.take() else {
            return;
        };
        running.cancel.cancel();
        for result in join_all(running.handles).await {
            if let Err(e) = result {
                warn!("Watch loop ended abnormally: {}", e);
            }
        }
    }
}
