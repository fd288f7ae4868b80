//! Slack outgoing-webhook listener.
//!
//! Accepts form posts from Slack, runs the text after the trigger word through
//! the [`CommandDispatcher`] and answers with the reply as Slack JSON.


use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Filter;
use warp::Reply;

use crate::CommandDispatcher;
use crate::Error;
use crate::HookConfig;
use crate::Result;

const MAX_FORM_BYTES: u64 = 64 * 1024;
const SLACKBOT_USER: &str = "slackbot";

/// Request filter without access logging.
pub fn routes(
    dispatcher: CommandDispatcher,
    config: HookConfig,
) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    let config = Arc::new(config);

    let probe = warp::get()
        .or(warp::head())
        .unify()
        .map(|| StatusCode::OK.into_response());

    let command = warp::post()
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form::<HashMap<String, String>>())
        .and(warp::any().map(move || dispatcher.clone()))
        .and(warp::any().map(move || config.clone()))
        .and_then(handle_command);

    let malformed = warp::post().map(|| StatusCode::BAD_REQUEST.into_response());
    let unsupported = warp::any().map(|| StatusCode::NOT_IMPLEMENTED.into_response());

    probe
        .or(command)
        .unify()
        .or(malformed)
        .unify()
        .or(unsupported)
        .unify()
}

async fn handle_command(
    form: HashMap<String, String>,
    dispatcher: CommandDispatcher,
    config: Arc<HookConfig>,
) -> std::result::Result<Response, Infallible> {
    let field = |name| form_field(&form, name);

    if !config.token.is_empty() && config.token != field("token") {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    if !config.channel_name.is_empty() && config.channel_name != field("channel_name") {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    if field("user_name") == SLACKBOT_USER {
        return Ok(StatusCode::OK.into_response());
    }

    let Some(args) = field("text").strip_prefix(config.trigger_word.as_str()) else {
        return Ok(StatusCode::OK.into_response());
    };

    let args = args.trim();
    debug!(user = %field("user_name"), command = %args, "Dispatching hook command");
    let reply = dispatcher.dispatch(args).await;
    Ok(warp::reply::json(&reply).into_response())
}

fn form_field<'a>(
    form: &'a HashMap<String, String>,
    name: &str,
) -> &'a str {
    form.get(name).map(String::as_str).unwrap_or_default()
}

/// Serves the listener until `shutdown` fires.
pub async fn serve(
    dispatcher: CommandDispatcher,
    config: HookConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = config.socket_addr()?;
    let access_log = warp::log::custom(|info| {
        info!(
            method = %info.method(),
            path = %info.path(),
            status = info.status().as_u16(),
            elapsed_ms = info.elapsed().as_millis() as u64,
            remote = ?info.remote_addr(),
            "hook request"
        );
    });

    let (bound, server) = warp::serve(routes(dispatcher, config).with(access_log))
        .try_bind_with_graceful_shutdown(addr, async move { shutdown.cancelled().await })
        .map_err(|e| Error::Fatal(format!("cannot bind hook listener on {addr}: {e}")))?;
    info!("Outgoing hook listener on {}", bound);
    server.await;
    Ok(())
}
