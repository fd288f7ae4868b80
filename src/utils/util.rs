use std::fs::create_dir_all;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::Result;

/// Joins a key name under a directory key, normalising slashes.
///
/// `join_key("/etcdbot_meta/", "lock")` yields `/etcdbot_meta/lock`.
pub fn join_key(
    dir: &str,
    name: &str,
) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_matches('/');
    let dir = if dir.starts_with('/') || dir.is_empty() {
        dir.to_string()
    } else {
        format!("/{dir}")
    };
    if name.is_empty() {
        return if dir.is_empty() { "/".to_string() } else { dir };
    }
    format!("{dir}/{name}")
}

/// Sleeps for `delay` unless `cancel` fires first.
///
/// Returns true when cancelled.
pub(crate) async fn sleep_or_cancelled(
    cancel: &CancellationToken,
    delay: Duration,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

pub fn open_file_for_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new().append(true).create(true).open(path)?;
    Ok(log_file)
}
