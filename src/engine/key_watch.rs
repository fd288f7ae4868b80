//! Per-key watch loop.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::EngineContext;
use super::LockOutcome;
use crate::metrics::ACTIVE_WATCH_LOOPS;
use crate::metrics::LOCK_SKIPS;
use crate::metrics::NOTIFICATIONS_DELIVERED;
use crate::metrics::NOTIFICATION_FAILURES;
use crate::metrics::UNCHANGED_EVENTS;
use crate::metrics::WATCH_ERRORS;
use crate::utils::sleep_or_cancelled;
use crate::ChangeEvent;
use crate::KeyWatcher;
use crate::Notification;
use crate::StoreError;

/// What happened to a single change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// New value equals the previous one
    Unchanged,
    /// Another instance holds the lock for this version
    AlreadyClaimed,
    /// The lock entry could not be written
    LockFailed,
    Delivered,
    DeliveryFailed,
}

impl fmt::Display for EventOutcome {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            EventOutcome::Unchanged => "unchanged",
            EventOutcome::AlreadyClaimed => "already_claimed",
            EventOutcome::LockFailed => "lock_failed",
            EventOutcome::Delivered => "delivered",
            EventOutcome::DeliveryFailed => "delivery_failed",
        };
        f.write_str(s)
    }
}

/// Locks and delivers one change event.
///
/// Never fails: every error is logged and folded into the outcome so the
/// calling loop can move on to the next event.
pub async fn handle_change(
    ctx: &EngineContext,
    event: &ChangeEvent,
) -> EventOutcome {
    if event.is_unchanged() {
        debug!(key = %event.key, version = event.version, "Value unchanged, skip");
        UNCHANGED_EVENTS.inc();
        return EventOutcome::Unchanged;
    }

    match ctx.lock.try_acquire(event.version).await {
        Ok(LockOutcome::Acquired) => {}
        Ok(LockOutcome::AlreadyClaimed) => {
            debug!(key = %event.key, version = event.version, "Event already claimed");
            LOCK_SKIPS.with_label_values(&["claimed"]).inc();
            return EventOutcome::AlreadyClaimed;
        }
        Err(e) => {
            warn!(
                key = %event.key,
                version = event.version,
                "Fail to acquire lock, skip event: {}",
                e
            );
            LOCK_SKIPS.with_label_values(&["error"]).inc();
            return EventOutcome::LockFailed;
        }
    }

    let action = event.action.as_str();
    match ctx.sink.notify(&Notification::from(event)).await {
        Ok(()) => {
            info!(key = %event.key, action, version = event.version, "Notification delivered");
            NOTIFICATIONS_DELIVERED.with_label_values(&[action]).inc();
            EventOutcome::Delivered
        }
        Err(e) => {
            error!(key = %event.key, action, version = event.version, "Notification failed: {}", e);
            NOTIFICATION_FAILURES.with_label_values(&[action]).inc();
            EventOutcome::DeliveryFailed
        }
    }
}

/// Watches `key` until `cancel` fires, handling every change in order.
///
/// `start_index` is the first version of interest; `None` starts with the
/// next change. Watch failures pause for the retry delay and are retried
/// from the same point.
pub async fn watch_and_notify(
    ctx: Arc<EngineContext>,
    key: String,
    start_index: Option<u64>,
    cancel: CancellationToken,
) {
    ACTIVE_WATCH_LOOPS.inc();
    debug!(key = %key, ?start_index, "Start watching key");

    let mut watcher = KeyWatcher::new(ctx.keys.clone(), key.clone()).from_index(start_index);
    loop {
        match watcher.next(&cancel).await {
            Ok(event) => {
                let outcome = handle_change(&ctx, &event).await;
                debug!(key = %key, version = event.version, %outcome, "Event handled");
            }
            Err(StoreError::Cancelled) => break,
            Err(StoreError::EventIndexCleared { .. }) => {
                // The watcher already moved past the cleared range
                WATCH_ERRORS.with_label_values(&["key"]).inc();
            }
            Err(e) => {
                error!(key = %key, "Watch failed: {}", e);
                WATCH_ERRORS.with_label_values(&["key"]).inc();
                if sleep_or_cancelled(&cancel, ctx.retry_delay).await {
                    break;
                }
            }
        }
    }

    debug!(key = %key, "Stop watching key");
    ACTIVE_WATCH_LOOPS.dec();
}
