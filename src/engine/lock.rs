//! Best-effort distributed lock keyed by change version.
//!
//! A lock entry is created with create-if-absent semantics and a TTL, and is
//! never released explicitly. Among any number of instances racing on the same
//! version, at most one creates the entry while it is alive. Once the TTL
//! lapses the same version can be claimed again, so delivery is at most once
//! per version *within the TTL*, not exactly once.

use std::sync::Arc;
use std::time::Duration;

use crate::utils::join_key;
use crate::KeysApi;
use crate::SetOptions;
use crate::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// This instance owns delivery of the event
    Acquired,
    /// Another instance already claimed the event
    AlreadyClaimed,
}

#[derive(Clone)]
pub struct EventLock {
    keys: Arc<dyn KeysApi>,
    lock_dir: String,
    ttl: Duration,
    owner: String,
}

impl std::fmt::Debug for EventLock {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EventLock")
            .field("lock_dir", &self.lock_dir)
            .field("ttl", &self.ttl)
            .field("owner", &self.owner)
            .finish()
    }
}

impl EventLock {
    pub fn new(
        keys: Arc<dyn KeysApi>,
        lock_dir: impl Into<String>,
        ttl: Duration,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            lock_dir: lock_dir.into(),
            ttl,
            owner: owner.into(),
        }
    }

    pub fn lock_key(
        &self,
        version: u64,
    ) -> String {
        join_key(&self.lock_dir, &version.to_string())
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Claims the event with the given version.
    ///
    /// An existing entry is reported as [`LockOutcome::AlreadyClaimed`]; any
    /// other store failure is returned to the caller.
    pub async fn try_acquire(
        &self,
        version: u64,
    ) -> StoreResult<LockOutcome> {
        let key = self.lock_key(version);
        match self
            .keys
            .set(&key, &self.owner, SetOptions::create_only().with_ttl(self.ttl))
            .await
        {
            Ok(_) => Ok(LockOutcome::Acquired),
            Err(e) if e.is_node_exists() => Ok(LockOutcome::AlreadyClaimed),
            Err(e) => Err(e),
        }
    }
}
