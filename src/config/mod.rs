//! Configuration management for the watch-and-notify service.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`, or an explicit override file)
//! - Environment variable overrides (`BOT__SECTION__FIELD`)
//! - Component-wise validation
mod etcd;
mod hook;
mod monitoring;
mod slack;
mod watch;
pub use etcd::*;
pub use hook::*;
pub use monitoring::*;
pub use slack::*;
pub use watch::*;

#[cfg(test)]
mod config_test;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

const ENV_PREFIX: &str = "BOT";

/// Keys whose environment values are comma-separated lists
const LIST_KEYS: [&str; 2] = ["etcd.endpoints", "slack.incoming_webhook_urls"];

/// Main configuration container
///
/// Sources are merged in priority order:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct BotConfig {
    /// Coordination store connection
    #[serde(default)]
    pub etcd: EtcdConfig,
    /// Watch engine behaviour and metadata layout
    #[serde(default)]
    pub watch: WatchConfig,
    /// Notification sink
    #[serde(default)]
    pub slack: SlackConfig,
    /// Outgoing-webhook command listener
    #[serde(default)]
    pub hook: HookConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Debug for BotConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("etcd", &self.etcd)
            .field("watch", &self.watch)
            .field("hook.enabled", &self.hook.enabled)
            .finish_non_exhaustive()
    }
}

fn environment() -> Environment {
    let env = Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .ignore_empty(true)
        .try_parsing(true);
    LIST_KEYS.iter().fold(env, |env, key| env.with_list_parse_key(key))
}

impl BotConfig {
    /// Loads configuration from defaults, `CONFIG_PATH` and `BOT__` variables.
    ///
    /// Does NOT validate; call `validate()` after all overrides are applied.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = builder.add_source(environment()).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies an override file on top of the current values.
    /// Environment variables still win.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path).required(true))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.etcd.validate()?;
        self.watch.validate()?;
        self.slack.validate()?;
        self.hook.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

pub(super) fn invalid(message: impl Into<String>) -> Error {
    Error::Config(ConfigError::Message(message.into()))
}

/// Accepts absolute keys made of word characters, dashes and dots.
pub(super) fn validate_key_path(
    path: &str,
    name: &str,
) -> Result<()> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        // The store root
        return Ok(());
    }
    if !crate::is_valid_key(trimmed) {
        return Err(invalid(format!("{name} is not a valid key path: {path:?}")));
    }
    Ok(())
}
