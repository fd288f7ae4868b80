use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref NOTIFICATIONS_DELIVERED: IntCounterVec = IntCounterVec::new(
        Opts::new("notifications_delivered", "Notifications delivered to every webhook endpoint"),
        &["action"]
    )
    .expect("metric can not be created");

    pub static ref NOTIFICATION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("notification_failures", "Notifications rejected by the sink"),
        &["action"]
    )
    .expect("metric can not be created");

    /// Events not delivered by this instance, by reason (`claimed`, `error`)
    pub static ref LOCK_SKIPS: IntCounterVec = IntCounterVec::new(
        Opts::new("lock_skips", "Events skipped at lock acquisition"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref UNCHANGED_EVENTS: IntCounter =
        IntCounter::new("unchanged_events", "Writes that left the value unchanged")
            .expect("metric can not be created");

    /// Failed watch calls, by loop kind (`key`, `watch_list`, `endpoints`)
    pub static ref WATCH_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_errors", "Failed watch calls"),
        &["loop"]
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_WATCH_LOOPS: IntGauge =
        IntGauge::new("active_watch_loops", "Running per-key watch loops")
            .expect("metric can not be created");

    pub static ref WATCH_LIST_GENERATION: IntGauge =
        IntGauge::new("watch_list_generation", "Current watch list generation number")
            .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(NOTIFICATIONS_DELIVERED.clone()),
        Box::new(NOTIFICATION_FAILURES.clone()),
        Box::new(LOCK_SKIPS.clone()),
        Box::new(UNCHANGED_EVENTS.clone()),
        Box::new(WATCH_ERRORS.clone()),
        Box::new(ACTIVE_WATCH_LOOPS.clone()),
        Box::new(WATCH_LIST_GENERATION.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            warn!("collector can not be registered: {}", e);
        }
    }
}

/// Serves `/metrics` on `port` until `shutdown` fires.
pub async fn start_server(
    port: u16,
    shutdown: CancellationToken,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics").and(warp::get()).and_then(metrics_handler);

    let (addr, server) = warp::serve(metrics_route)
        .bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move { shutdown.cancelled().await });
    info!("Metrics server listening on {}", addr);
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(encode_metrics(&REGISTRY))
}

pub(crate) fn encode_metrics(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
