//! In-memory coordination store.
//!
//! Mirrors the etcd v2 semantics the engine relies on: a single global index
//! bumped by every write, create-only and compare-and-swap writes, TTL expiry
//! reported as `expire` events, and watches that can resume from any version
//! still held in a bounded event history.
//!
//! Expiry is lazy: expired nodes are reaped at the start of every operation,
//! and a blocked watch wakes up at the earliest pending expiry.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;

use super::Action;
use super::ChangeEvent;
use super::DeleteOptions;
use super::KeysApi;
use super::Node;
use super::PrevExist;
use super::ReadResponse;
use super::SetOptions;
use super::WatchOptions;
use crate::constants::MEM_EVENT_HISTORY_CAPACITY;
use crate::StoreError;
use crate::StoreResult;

#[derive(Debug, Clone)]
struct MemNode {
    value: String,
    created_index: u64,
    modified_index: u64,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct MemState {
    index: u64,
    nodes: BTreeMap<String, MemNode>,
    history: VecDeque<ChangeEvent>,
    /// Version of the newest event evicted from `history`
    cleared_up_to: u64,
}

impl MemState {
    fn record(
        &mut self,
        event: ChangeEvent,
    ) {
        if self.history.len() == MEM_EVENT_HISTORY_CAPACITY {
            if let Some(evicted) = self.history.pop_front() {
                self.cleared_up_to = evicted.version;
            }
        }
        self.history.push_back(event);
    }

    /// Removes expired nodes, recording one `expire` event each.
    /// Returns true if anything expired.
    fn reap_expired(
        &mut self,
        now: Instant,
    ) -> bool {
        let expired: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.expires_at.is_some_and(|at| at <= now))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            if let Some(node) = self.nodes.remove(key) {
                self.index += 1;
                let event = ChangeEvent {
                    action: Action::Expire,
                    key: key.clone(),
                    value: String::new(),
                    prev_value: Some(node.value),
                    version: self.index,
                };
                self.record(event);
            }
        }
        !expired.is_empty()
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.nodes.values().filter_map(|n| n.expires_at).min()
    }

    fn to_node(
        key: &str,
        n: &MemNode,
        now: Instant,
    ) -> Node {
        Node {
            key: key.to_string(),
            value: n.value.clone(),
            created_index: n.created_index,
            modified_index: n.modified_index,
            ttl: n.expires_at.map(|at| at.saturating_duration_since(now)),
        }
    }
}

fn matches_key(
    watched: &str,
    changed: &str,
    recursive: bool,
) -> bool {
    if watched == changed {
        return true;
    }
    if !recursive {
        return false;
    }
    let prefix = watched.trim_end_matches('/');
    changed.len() > prefix.len() && changed.starts_with(prefix) && changed.as_bytes()[prefix.len()] == b'/'
}

/// In-process [`KeysApi`] implementation.
#[derive(Debug)]
pub struct MemKeysApi {
    state: Mutex<MemState>,
    index_tx: watch::Sender<u64>,
}

impl Default for MemKeysApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemKeysApi {
    pub fn new() -> Self {
        let (index_tx, _) = watch::channel(0);
        Self {
            state: Mutex::new(MemState::default()),
            index_tx,
        }
    }

    /// Current global index
    pub fn current_index(&self) -> u64 {
        self.state.lock().index
    }

    fn publish(
        &self,
        index: u64,
    ) {
        self.index_tx.send_replace(index);
    }

    /// Reaps expired nodes and wakes watchers if anything changed.
    fn reap(
        &self,
        state: &mut MemState,
    ) {
        if state.reap_expired(Instant::now()) {
            self.publish(state.index);
        }
    }
}

#[async_trait]
impl KeysApi for MemKeysApi {
    async fn get(
        &self,
        key: &str,
    ) -> StoreResult<ReadResponse> {
        let mut state = self.state.lock();
        self.reap(&mut state);

        match state.nodes.get(key) {
            Some(n) => Ok(ReadResponse {
                node: MemState::to_node(key, n, Instant::now()),
                index: state.index,
            }),
            None => Err(StoreError::KeyNotFound {
                key: key.to_string(),
                index: state.index,
            }),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        opts: SetOptions,
    ) -> StoreResult<Node> {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.reap(&mut state);

        let existing = state.nodes.get(key).cloned();
        match (opts.prev_exist, &existing) {
            (PrevExist::NoExist, Some(_)) => {
                return Err(StoreError::NodeExists {
                    key: key.to_string(),
                    index: state.index,
                });
            }
            (PrevExist::Exist, None) => {
                return Err(StoreError::KeyNotFound {
                    key: key.to_string(),
                    index: state.index,
                });
            }
            _ => {}
        }
        if let Some(prev_index) = opts.prev_index {
            match &existing {
                None => {
                    return Err(StoreError::KeyNotFound {
                        key: key.to_string(),
                        index: state.index,
                    });
                }
                Some(n) if n.modified_index != prev_index => {
                    return Err(StoreError::CompareFailed {
                        key: key.to_string(),
                        index: state.index,
                    });
                }
                Some(_) => {}
            }
        }

        let action = if opts.prev_index.is_some() {
            Action::CompareAndSwap
        } else {
            match opts.prev_exist {
                PrevExist::NoExist => Action::Create,
                PrevExist::Exist => Action::Update,
                PrevExist::Ignore => Action::Set,
            }
        };

        state.index += 1;
        let index = state.index;
        let node = MemNode {
            value: value.to_string(),
            created_index: existing.as_ref().map(|n| n.created_index).unwrap_or(index),
            modified_index: index,
            expires_at: opts.ttl.map(|ttl| now + ttl),
        };
        let stored = MemState::to_node(key, &node, now);
        state.nodes.insert(key.to_string(), node);
        state.record(ChangeEvent {
            action,
            key: key.to_string(),
            value: value.to_string(),
            prev_value: existing.map(|n| n.value),
            version: index,
        });
        trace!(key, index, %action, "mem store write");
        self.publish(index);

        Ok(stored)
    }

    async fn delete(
        &self,
        key: &str,
        opts: DeleteOptions,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        self.reap(&mut state);

        let Some(existing) = state.nodes.get(key) else {
            return Err(StoreError::KeyNotFound {
                key: key.to_string(),
                index: state.index,
            });
        };
        if let Some(prev_index) = opts.prev_index {
            if existing.modified_index != prev_index {
                return Err(StoreError::CompareFailed {
                    key: key.to_string(),
                    index: state.index,
                });
            }
        }

        let removed = state.nodes.remove(key).map(|n| n.value);
        state.index += 1;
        let index = state.index;
        state.record(ChangeEvent {
            action: if opts.prev_index.is_some() {
                Action::CompareAndDelete
            } else {
                Action::Delete
            },
            key: key.to_string(),
            value: String::new(),
            prev_value: removed,
            version: index,
        });
        self.publish(index);

        Ok(())
    }

    async fn watch(
        &self,
        key: &str,
        opts: WatchOptions,
    ) -> StoreResult<ChangeEvent> {
        let mut index_rx = self.index_tx.subscribe();
        let wait_index = match opts.wait_index {
            Some(wait_index) => wait_index,
            None => self.current_index() + 1,
        };

        loop {
            let next_expiry = {
                let mut state = self.state.lock();
                self.reap(&mut state);

                if wait_index <= state.cleared_up_to {
                    return Err(StoreError::EventIndexCleared { index: state.index });
                }
                if let Some(event) = state
                    .history
                    .iter()
                    .find(|e| e.version >= wait_index && matches_key(key, &e.key, opts.recursive))
                {
                    return Ok(event.clone());
                }
                index_rx.borrow_and_update();
                state.next_expiry()
            };

            match next_expiry {
                Some(at) => {
                    tokio::select! {
                        _ = index_rx.changed() => {}
                        _ = tokio::time::sleep_until(at) => {}
                    }
                }
                None => {
                    // The sender lives as long as `self`
                    let _ = index_rx.changed().await;
                }
            }
        }
    }
}
