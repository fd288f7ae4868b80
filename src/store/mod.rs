//! Coordination store client.
//!
//! [`KeysApi`] is the only seam between the engine and the hierarchical
//! key-value store. Two implementations are provided:
//!
//! - [`EtcdKeysClient`]: etcd v2 keys API over HTTP
//! - [`MemKeysApi`]: in-process store with the same versioning, TTL and watch
//!   semantics, used for tests and dry runs
//!
//! Long-poll watches are wrapped by [`KeyWatcher`], which remembers where the
//! previous watch left off and observes a cancellation token.

mod etcd_client;
mod mem_keys_api;
mod types;
mod watcher;
mod wire;

pub use etcd_client::*;
pub use mem_keys_api::*;
pub use types::*;
pub use watcher::*;

#[cfg(test)]
mod mem_keys_api_test;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::StoreResult;

/// Point reads, conditional writes, deletes and blocking watches against
/// the coordination store.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeysApi: Send + Sync + 'static {
    /// Reads a key. Fails with `KeyNotFound` carrying the current index when absent.
    async fn get(
        &self,
        key: &str,
    ) -> StoreResult<ReadResponse>;

    /// Writes a key subject to `opts`, returning the stored node.
    async fn set(
        &self,
        key: &str,
        value: &str,
        opts: SetOptions,
    ) -> StoreResult<Node>;

    async fn delete(
        &self,
        key: &str,
        opts: DeleteOptions,
    ) -> StoreResult<()>;

    /// Blocks until a change matching `opts` is available.
    ///
    /// Has no application-level timeout; callers abort it by dropping the future.
    async fn watch(
        &self,
        key: &str,
        opts: WatchOptions,
    ) -> StoreResult<ChangeEvent>;
}
