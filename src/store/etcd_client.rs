//! etcd v2 keys API client.
//!
//! Talks plain HTTP/JSON to `/v2/keys`. Endpoints are tried in order when a
//! connection cannot be established; the last endpoint that answered is pinned
//! for subsequent requests.

use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::wire::WireError;
use super::wire::WireResponse;
use super::ChangeEvent;
use super::DeleteOptions;
use super::KeysApi;
use super::Node;
use super::PrevExist;
use super::ReadResponse;
use super::SetOptions;
use super::WatchOptions;
use crate::EtcdConfig;
use crate::StoreError;
use crate::StoreResult;

const ETCD_INDEX_HEADER: &str = "X-Etcd-Index";

pub struct EtcdKeysClient {
    http: Client,
    endpoints: Vec<String>,
    pinned: AtomicUsize,
    username: String,
    password: String,
    request_timeout: Duration,
}

impl fmt::Debug for EtcdKeysClient {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("EtcdKeysClient")
            .field("endpoints", &self.endpoints)
            .field("username", &self.username)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl EtcdKeysClient {
    pub fn new(config: &EtcdConfig) -> StoreResult<Self> {
        let endpoints: Vec<String> = config
            .endpoints
            .iter()
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        if endpoints.is_empty() {
            return Err(StoreError::NoEndpoints);
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_in_ms))
            .build()?;

        Ok(Self {
            http,
            endpoints,
            pinned: AtomicUsize::new(0),
            username: config.username.clone(),
            password: config.password.clone(),
            request_timeout: Duration::from_millis(config.request_timeout_in_ms),
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    fn keys_url(
        endpoint: &str,
        key: &str,
    ) -> String {
        if key.starts_with('/') {
            format!("{endpoint}/v2/keys{key}")
        } else {
            format!("{endpoint}/v2/keys/{key}")
        }
    }

    /// Sends a request built by `build`, failing over to the next endpoint
    /// only when the connection itself could not be established.
    async fn send<F>(
        &self,
        build: F,
        timeout: Option<Duration>,
    ) -> StoreResult<Response>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let count = self.endpoints.len();
        let start = self.pinned.load(Ordering::Relaxed) % count;
        let mut last_err = None;

        for offset in 0..count {
            let idx = (start + offset) % count;
            let endpoint = &self.endpoints[idx];
            let mut request = build(&self.http, endpoint);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            if !self.username.is_empty() {
                request = request.basic_auth(&self.username, Some(&self.password));
            }

            match request.send().await {
                Ok(res) => {
                    if idx != start {
                        debug!(endpoint = %endpoint, "Pinned etcd endpoint");
                        self.pinned.store(idx, Ordering::Relaxed);
                    }
                    return Ok(res);
                }
                Err(e) if e.is_connect() => {
                    warn!(endpoint = %endpoint, "etcd endpoint unreachable: {}", e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err.map(StoreError::from).unwrap_or(StoreError::NoEndpoints))
    }

    /// Splits a response into its decoded body and the `X-Etcd-Index` header.
    ///
    /// Returns `Ok(None)` for a successful response with an empty body, which
    /// etcd sends when it gives up on a long poll.
    async fn decode<T: DeserializeOwned>(res: Response) -> StoreResult<Option<(T, u64)>> {
        let index = res
            .headers()
            .get(ETCD_INDEX_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let status = res.status();
        let body = res.bytes().await?;
        trace!(status = status.as_u16(), index, "etcd response");

        if status.is_success() {
            if body.iter().all(|b| b.is_ascii_whitespace()) {
                return Ok(None);
            }
            return Ok(Some((serde_json::from_slice(&body)?, index)));
        }

        match serde_json::from_slice::<WireError>(&body) {
            Ok(err) => Err(err.into()),
            Err(_) => Err(StoreError::UnexpectedStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    fn empty_body() -> StoreError {
        StoreError::UnexpectedStatus {
            status: 200,
            body: String::new(),
        }
    }
}

#[async_trait]
impl KeysApi for EtcdKeysClient {
    async fn get(
        &self,
        key: &str,
    ) -> StoreResult<ReadResponse> {
        let res = self
            .send(
                |http, endpoint| http.get(Self::keys_url(endpoint, key)),
                Some(self.request_timeout),
            )
            .await?;
        let (body, index): (WireResponse, u64) =
            Self::decode(res).await?.ok_or_else(Self::empty_body)?;

        Ok(ReadResponse {
            node: body.node.into(),
            index,
        })
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        opts: SetOptions,
    ) -> StoreResult<Node> {
        let mut form: Vec<(&str, String)> = vec![("value", value.to_string())];
        if let Some(ttl) = opts.ttl {
            form.push(("ttl", ttl.as_secs().max(1).to_string()));
        }
        match opts.prev_exist {
            PrevExist::Ignore => {}
            PrevExist::Exist => form.push(("prevExist", "true".to_string())),
            PrevExist::NoExist => form.push(("prevExist", "false".to_string())),
        }
        if let Some(prev_index) = opts.prev_index {
            form.push(("prevIndex", prev_index.to_string()));
        }

        let res = self
            .send(
                |http, endpoint| http.put(Self::keys_url(endpoint, key)).form(&form),
                Some(self.request_timeout),
            )
            .await?;
        let (body, _): (WireResponse, u64) =
            Self::decode(res).await?.ok_or_else(Self::empty_body)?;

        Ok(body.node.into())
    }

    async fn delete(
        &self,
        key: &str,
        opts: DeleteOptions,
    ) -> StoreResult<()> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(prev_index) = opts.prev_index {
            query.push(("prevIndex", prev_index.to_string()));
        }

        let res = self
            .send(
                |http, endpoint| http.delete(Self::keys_url(endpoint, key)).query(&query),
                Some(self.request_timeout),
            )
            .await?;
        Self::decode::<WireResponse>(res).await?;
        Ok(())
    }

    async fn watch(
        &self,
        key: &str,
        opts: WatchOptions,
    ) -> StoreResult<ChangeEvent> {
        let mut query: Vec<(&str, String)> = vec![("wait", "true".to_string())];
        if let Some(wait_index) = opts.wait_index {
            query.push(("waitIndex", wait_index.to_string()));
        }
        if opts.recursive {
            query.push(("recursive", "true".to_string()));
        }

        loop {
            let res = self
                .send(
                    |http, endpoint| http.get(Self::keys_url(endpoint, key)).query(&query),
                    None,
                )
                .await?;
            match Self::decode::<WireResponse>(res).await? {
                Some((body, _)) => return Ok(body.into()),
                None => {
                    debug!(key, "etcd closed long poll without an event, re-issuing");
                }
            }
        }
    }
}
