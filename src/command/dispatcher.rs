use std::sync::Arc;

use tracing::error;
use tracing::info;

use super::Command;
use super::USAGE;
use crate::constants::WATCH_TARGET_LIST_KEY;
use crate::decode_watch_list;
use crate::encode_watch_list;
use crate::is_watchable_key;
use crate::utils::join_key;
use crate::DeleteOptions;
use crate::KeysApi;
use crate::SetOptions;
use crate::SlackAttachment;
use crate::SlackMessage;
use crate::StoreResult;
use crate::WatchConfig;

pub const REPLY_OK: &str = "OK";
pub const REPLY_NO_ENTRY: &str = "no entry exists.";
pub const REPLY_NOT_IN_LIST: &str = "not in watch list.";
pub const REPLY_ALREADY_IN_LIST: &str = "already in watch list.";
pub const REPLY_EMPTY_LIST: &str = "empty watch list.";
pub const REPLY_INVALID_KEY: &str = "invalid key!";
pub const REPLY_NOT_EXISTS: &str = "not exists!";
pub const REPLY_CONFLICT: &str = "conflict, try again.";
pub const REPLY_INTERNAL_ERROR: &str = "internal error.";

/// Runs operator commands against the store.
///
/// Every outcome is one of a fixed set of plain replies; store errors are
/// logged and never echoed back.
#[derive(Clone)]
pub struct CommandDispatcher {
    keys: Arc<dyn KeysApi>,
    list_key: String,
    watch_base: String,
}

impl CommandDispatcher {
    pub fn new(
        keys: Arc<dyn KeysApi>,
        config: &WatchConfig,
    ) -> Self {
        Self {
            keys,
            list_key: join_key(&config.metadata_dir, WATCH_TARGET_LIST_KEY),
            watch_base: config.watch_base.clone(),
        }
    }

    pub async fn dispatch(
        &self,
        text: &str,
    ) -> SlackMessage {
        self.execute(Command::parse(text)).await
    }

    pub async fn execute(
        &self,
        command: Command,
    ) -> SlackMessage {
        let result = match command {
            Command::Get => self.get_all().await,
            Command::Delete(path) => self.delete(&path).await,
            Command::WatchList => self.watch_list().await,
            Command::WatchAdd(path) => self.watch_add(&path).await,
            Command::WatchDelete(path) => self.watch_delete(&path).await,
            Command::Help => Ok(SlackMessage::new(USAGE)),
        };
        result.unwrap_or_else(|e| {
            if e.is_version_conflict() || e.is_node_exists() {
                info!("Watch list changed concurrently: {}", e);
                SlackMessage::new(REPLY_CONFLICT)
            } else {
                error!("Command failed: {}", e);
                SlackMessage::new(REPLY_INTERNAL_ERROR)
            }
        })
    }

    /// Current watch list and the modified index it was read at.
    /// `None` when the list key does not exist.
    async fn read_list(&self) -> StoreResult<Option<(Vec<String>, u64)>> {
        match self.keys.get(&self.list_key).await {
            Ok(res) => Ok(Some((decode_watch_list(&res.node.value), res.node.modified_index))),
            Err(e) if e.is_key_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_all(&self) -> StoreResult<SlackMessage> {
        let Some((keys, _)) = self.read_list().await? else {
            return Ok(SlackMessage::new(REPLY_NO_ENTRY));
        };

        let mut attachments = Vec::with_capacity(keys.len());
        for key in keys {
            match self.keys.get(&key).await {
                Ok(res) => attachments.push(SlackAttachment::new(key, res.node.value)),
                Err(e) if e.is_key_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        if attachments.is_empty() {
            return Ok(SlackMessage::new(REPLY_NO_ENTRY));
        }
        Ok(SlackMessage::new(format!("entry count: {}", attachments.len())).with_attachments(attachments))
    }

    async fn delete(
        &self,
        path: &str,
    ) -> StoreResult<SlackMessage> {
        let in_list = self
            .read_list()
            .await?
            .is_some_and(|(keys, _)| keys.iter().any(|k| k == path));
        if !in_list {
            return Ok(SlackMessage::new(REPLY_NOT_IN_LIST));
        }

        info!(key = %path, "Deleting watched key");
        match self.keys.delete(path, DeleteOptions::default()).await {
            Ok(()) => Ok(SlackMessage::new(REPLY_OK)),
            Err(e) if e.is_key_not_found() => Ok(SlackMessage::new(REPLY_NOT_EXISTS)),
            Err(e) => Err(e),
        }
    }

    async fn watch_list(&self) -> StoreResult<SlackMessage> {
        let keys = self.read_list().await?.map(|(keys, _)| keys).unwrap_or_default();
        if keys.is_empty() {
            return Ok(SlackMessage::new(REPLY_EMPTY_LIST));
        }

        let text: String = keys.iter().map(|k| format!("- {k}\n")).collect();
        Ok(SlackMessage::new(text))
    }

    async fn watch_add(
        &self,
        path: &str,
    ) -> StoreResult<SlackMessage> {
        if !is_watchable_key(path, &self.watch_base) {
            return Ok(SlackMessage::new(REPLY_INVALID_KEY));
        }

        let (mut keys, opts) = match self.read_list().await? {
            Some((keys, modified_index)) => (keys, SetOptions::compare_index(modified_index)),
            None => (Vec::new(), SetOptions::create_only()),
        };
        if keys.iter().any(|k| k == path) {
            return Ok(SlackMessage::new(REPLY_ALREADY_IN_LIST));
        }

        keys.push(path.to_string());
        info!(key = %path, "Adding key to watch list");
        self.keys.set(&self.list_key, &encode_watch_list(&keys), opts).await?;
        Ok(SlackMessage::new(REPLY_OK))
    }

    async fn watch_delete(
        &self,
        path: &str,
    ) -> StoreResult<SlackMessage> {
        let Some((keys, modified_index)) = self.read_list().await? else {
            return Ok(SlackMessage::new(REPLY_NOT_IN_LIST));
        };
        if !keys.iter().any(|k| k == path) {
            return Ok(SlackMessage::new(REPLY_NOT_IN_LIST));
        }

        let remaining: Vec<String> = keys.into_iter().filter(|k| k != path).collect();
        info!(key = %path, remaining = remaining.len(), "Removing key from watch list");
        if remaining.is_empty() {
            self.keys
                .delete(&self.list_key, DeleteOptions::compare_index(modified_index))
                .await?;
        } else {
            self.keys
                .set(
                    &self.list_key,
                    &encode_watch_list(&remaining),
                    SetOptions::compare_index(modified_index),
                )
                .await?;
        }
        Ok(SlackMessage::new(REPLY_OK))
    }
}
