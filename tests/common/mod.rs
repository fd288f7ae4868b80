use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use d_watchbot::Generation;
use d_watchbot::KeysApi;
use d_watchbot::MemKeysApi;
use d_watchbot::SlackMessage;
use d_watchbot::SlackNotifier;
use d_watchbot::WatchConfig;
use d_watchbot::WatchEngine;
use d_watchbot::WebhookEndpoints;
use parking_lot::Mutex;
use tokio::sync::watch;
use warp::http::StatusCode;
use warp::Filter;
use warp::Reply;

pub const META_DIR: &str = "/etcdbot_meta";
pub const LIST_KEY: &str = "/etcdbot_meta/watchTargetList";
pub const URLS_KEY: &str = "/etcdbot_meta/incomingWebHookUrls";

pub fn watch_config(instance_id: &str) -> WatchConfig {
    WatchConfig {
        metadata_dir: META_DIR.to_string(),
        watch_base: "/public".to_string(),
        retry_delay_in_ms: 50,
        instance_id: instance_id.to_string(),
        ..Default::default()
    }
}

/// Incoming-webhook stand-in that records every message it accepts.
#[derive(Clone)]
pub struct FakeSlack {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<SlackMessage>>>,
    failures_left: Arc<AtomicUsize>,
}

impl FakeSlack {
    pub fn start() -> Self {
        let received: Arc<Mutex<Vec<SlackMessage>>> = Arc::new(Mutex::new(Vec::new()));
        let failures_left = Arc::new(AtomicUsize::new(0));

        let recorded = received.clone();
        let failing = failures_left.clone();
        let route = warp::post()
            .and(warp::path!("hook"))
            .and(warp::body::form())
            .map(move |form: HashMap<String, String>| {
                if failing
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
                let payload = form.get("payload").cloned().unwrap_or_default();
                if let Ok(message) = serde_json::from_str::<SlackMessage>(&payload) {
                    recorded.lock().push(message);
                }
                StatusCode::OK.into_response()
            });

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        Self {
            addr,
            received,
            failures_left,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/hook", self.addr)
    }

    pub fn fail_next(
        &self,
        n: usize,
    ) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<SlackMessage> {
        self.received.lock().clone()
    }

    pub async fn wait_for(
        &self,
        count: usize,
    ) -> Vec<SlackMessage> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let received = self.received();
                if received.len() >= count {
                    return received;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for slack messages")
    }
}

pub fn start_engine(
    keys: Arc<MemKeysApi>,
    slack: &FakeSlack,
    instance_id: &str,
) -> WatchEngine {
    let endpoints = WebhookEndpoints::new(vec![slack.url()]);
    let sink = Arc::new(SlackNotifier::with_timeout(endpoints.clone(), Duration::from_secs(2)).unwrap());
    let keys: Arc<dyn KeysApi> = keys;
    let engine = WatchEngine::new(keys, sink, endpoints, &watch_config(instance_id));
    engine.start();
    engine
}

pub async fn wait_for_generation<F>(
    rx: &mut watch::Receiver<Generation>,
    pred: F,
) -> Generation
where
    F: FnMut(&Generation) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for generation")
        .expect("engine dropped")
        .clone()
}
