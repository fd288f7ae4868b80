use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::constants::DEFAULT_ETCD_ENDPOINT;
use crate::Result;

/// Coordination store connection settings
#[derive(Serialize, Deserialize, Clone)]
pub struct EtcdConfig {
    /// Client URLs, tried in order
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Basic auth user. Empty disables authentication.
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Timeout for reads and writes in milliseconds. Watches never time out.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,
}

impl std::fmt::Debug for EtcdConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EtcdConfig")
            .field("endpoints", &self.endpoints)
            .field("username", &self.username)
            .field("connect_timeout_in_ms", &self.connect_timeout_in_ms)
            .field("request_timeout_in_ms", &self.request_timeout_in_ms)
            .finish_non_exhaustive()
    }
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            username: String::new(),
            password: String::new(),
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
        }
    }
}

impl EtcdConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(invalid("etcd.endpoints must contain at least one endpoint"));
        }
        for endpoint in &self.endpoints {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(invalid(format!(
                    "etcd endpoint {endpoint:?} must start with http:// or https://"
                )));
            }
        }
        if self.request_timeout_in_ms == 0 {
            return Err(invalid("etcd.request_timeout_in_ms must be greater than 0"));
        }
        Ok(())
    }
}

fn default_endpoints() -> Vec<String> {
    vec![DEFAULT_ETCD_ENDPOINT.to_string()]
}
fn default_connect_timeout() -> u64 {
    3000
}
fn default_request_timeout() -> u64 {
    1000
}
