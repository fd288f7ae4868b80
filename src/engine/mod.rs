//! Watch-and-notify engine.
//!
//! A [`WatchEngine`] runs three kinds of tasks under one root cancellation
//! scope:
//!
//! - the watch-list supervisor, which keeps one per-key loop running for every
//!   key in `<metaDir>/watchTargetList` and replaces them all when the list
//!   changes
//! - the per-key loops, which lock every change by version and hand it to the
//!   [`crate::NotificationSink`]
//! - the webhook endpoint watcher, which keeps [`WebhookEndpoints`] in sync
//!   with `<metaDir>/incomingWebHookUrls`

mod context;
mod endpoints;
mod key_watch;
mod lock;
mod supervisor;
mod watch_engine;
mod watch_list;

pub use context::*;
pub use endpoints::*;
pub use key_watch::*;
pub use lock::*;
pub use supervisor::Generation;
pub use watch_engine::*;
pub use watch_list::*;
