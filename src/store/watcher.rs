use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::ChangeEvent;
use super::KeysApi;
use super::WatchOptions;
use crate::StoreError;
use crate::StoreResult;

/// Re-callable watch on a single key.
///
/// After each event the watcher resumes from `event.version + 1`, so no change
/// is reported twice and none is skipped while the store still holds it.
pub struct KeyWatcher {
    keys: Arc<dyn KeysApi>,
    key: String,
    recursive: bool,
    next_index: Option<u64>,
}

impl KeyWatcher {
    /// Watches for changes made after the call is first issued.
    pub fn new(
        keys: Arc<dyn KeysApi>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            key: key.into(),
            recursive: false,
            next_index: None,
        }
    }

    /// Starts from the first change with version `>= wait_index`.
    pub fn from_index(
        mut self,
        wait_index: Option<u64>,
    ) -> Self {
        self.next_index = wait_index;
        self
    }

    pub fn recursive(
        mut self,
        recursive: bool,
    ) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn next_index(&self) -> Option<u64> {
        self.next_index
    }

    /// Blocks until the next change or until `cancel` fires.
    ///
    /// Returns [`StoreError::Cancelled`] on cancellation. When the requested
    /// version has been compacted away, the watcher jumps to the store's
    /// current index before returning the error; the skipped events are lost.
    /// Cancellation wins over a watch that completes at the same moment, so
    /// that event is dropped and not re-delivered by this watcher.
    pub async fn next(
        &mut self,
        cancel: &CancellationToken,
    ) -> StoreResult<ChangeEvent> {
        let opts = WatchOptions {
            wait_index: self.next_index,
            recursive: self.recursive,
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StoreError::Cancelled),
            result = self.keys.watch(&self.key, opts) => result,
        };

        match result {
            Ok(event) => {
                self.next_index = Some(event.version + 1);
                Ok(event)
            }
            Err(StoreError::EventIndexCleared { index }) => {
                warn!(
                    key = %self.key,
                    requested = ?self.next_index,
                    resume_from = index + 1,
                    "Watch index cleared, resuming from current index"
                );
                self.next_index = Some(index + 1);
                Err(StoreError::EventIndexCleared { index })
            }
            Err(e) => Err(e),
        }
    }
}
