use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::constants::DEFAULT_TRIGGER_WORD;
use crate::Result;

/// Outgoing-webhook command listener
#[derive(Serialize, Deserialize, Clone)]
pub struct HookConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Expected `token` form field. Empty accepts any token.
    #[serde(default)]
    pub token: String,

    /// Expected `channel_name` form field. Empty accepts any channel.
    #[serde(default)]
    pub channel_name: String,

    /// Prefix that marks a message as a command
    #[serde(default = "default_trigger_word")]
    pub trigger_word: String,
}

impl std::fmt::Debug for HookConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("HookConfig")
            .field("enabled", &self.enabled)
            .field("listen_address", &self.listen_address)
            .field("port", &self.port)
            .field("channel_name", &self.channel_name)
            .field("trigger_word", &self.trigger_word)
            .finish_non_exhaustive()
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: default_listen_address(),
            port: default_port(),
            token: String::new(),
            channel_name: String::new(),
            trigger_word: default_trigger_word(),
        }
    }
}

impl HookConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.trigger_word.trim().is_empty() {
            return Err(invalid("hook.trigger_word cannot be empty when the hook is enabled"));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.listen_address, self.port)
            .parse()
            .map_err(|e| invalid(format!("invalid hook listen address: {e}")))
    }
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_trigger_word() -> String {
    DEFAULT_TRIGGER_WORD.to_string()
}
