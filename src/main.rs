use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use d_watchbot::hook;
use d_watchbot::metrics;
use d_watchbot::probe_store;
use d_watchbot::utils::open_file_for_append;
use d_watchbot::BotConfig;
use d_watchbot::CommandDispatcher;
use d_watchbot::Error;
use d_watchbot::EtcdKeysClient;
use d_watchbot::KeysApi;
use d_watchbot::MemKeysApi;
use d_watchbot::Result;
use d_watchbot::SlackNotifier;
use d_watchbot::WatchEngine;
use d_watchbot::WebhookEndpoints;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[derive(Debug, Parser)]
#[command(name = "d-watchbot", version, about = "Watch store keys and post changes to Slack")]
struct Cli {
    /// Configuration file applied on top of defaults and CONFIG_PATH
    #[arg(long)]
    config: Option<String>,

    /// Also write logs to <log-dir>/d-watchbot.log
    #[arg(long, env = "BOT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Use a process-local store instead of etcd
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initializing Logs
    let _guard = init_observability(cli.log_dir.as_deref())?;

    let mut config = BotConfig::new()?;
    if let Some(path) = &cli.config {
        config = config.with_override_config(path)?;
    }
    let config = config.validate()?;
    info!(?config, "Configuration loaded");

    let keys: Arc<dyn KeysApi> = if cli.in_memory {
        info!("Using in-memory store");
        Arc::new(MemKeysApi::new())
    } else {
        Arc::new(EtcdKeysClient::new(&config.etcd)?)
    };
    probe_store(keys.as_ref(), &config.watch).await?;

    let endpoints = WebhookEndpoints::new(config.slack.incoming_webhook_urls.clone());
    let sink = Arc::new(SlackNotifier::new(endpoints.clone(), &config.slack)?);
    let engine = WatchEngine::new(keys.clone(), sink, endpoints, &config.watch);

    // Initializing Shutdown Signal
    let shutdown = CancellationToken::new();
    let mut servers: Vec<JoinHandle<()>> = Vec::new();

    if config.monitoring.prometheus_enabled {
        servers.push(tokio::spawn(metrics::start_server(
            config.monitoring.prometheus_port,
            shutdown.clone(),
        )));
    }
    if config.hook.enabled {
        let dispatcher = CommandDispatcher::new(keys.clone(), &config.watch);
        let hook_config = config.hook.clone();
        let hook_shutdown = shutdown.clone();
        servers.push(tokio::spawn(async move {
            if let Err(e) = hook::serve(dispatcher, hook_config, hook_shutdown).await {
                error!("Hook listener stopped: {}", e);
            }
        }));
    }

    engine.start();
    info!("Application started. Waiting for a shutdown signal...");

    wait_for_signal().await?;

    engine.stop().await;
    shutdown.cancel();
    for server in servers {
        if let Err(e) = server.await {
            error!("Server task failed: {}", e);
        }
    }

    info!("Exiting program.");
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;
    tokio::select! {
        _ = sighup.recv() => info!("SIGHUP detected."),
        _ = sigint.recv() => info!("SIGINT detected."),
        _ = sigterm.recv() => info!("SIGTERM detected."),
        _ = sigquit.recv() => info!("SIGQUIT detected."),
    }
    Ok(())
}

fn init_observability(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let stdout = tracing_subscriber::fmt::layer().with_filter(env_filter());

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(stdout)
            .try_init()
            .map_err(|e| Error::Fatal(format!("cannot install log subscriber: {e}")))?;
        return Ok(None);
    };

    let log_file = open_file_for_append(&log_dir.join("d-watchbot.log"))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(env_filter());
    tracing_subscriber::registry()
        .with(stdout)
        .with(file)
        .try_init()
        .map_err(|e| Error::Fatal(format!("cannot install log subscriber: {e}")))?;

    Ok(Some(guard))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
