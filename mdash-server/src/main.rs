//! MotoDash Server
//!
//! Runs the instrument cluster tick loop and serves its state over HTTP

use anyhow::{Context, Result};
use mdash_adapters::{ChannelSource, DemoEngine, FileStore};
use mdash_core::source::CommandSink;
use mdash_server::{api, cluster::Cluster, config::DashConfig, manager, sinks, state};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting MotoDash");

    let config = DashConfig::load();

    // Engine and its inbound transports
    let store = FileStore::new(&config.data_file);
    info!("Odometer record at {}", store.path().display());
    let mut engine = DemoEngine::new(config.engine.clone(), Box::new(store)).with_mode(config.mode);

    let (track_tx, api_source) = ChannelSource::new("api");
    engine.add_source(Box::new(api_source));
    let commands = attach_sockets(&config, &mut engine);

    let cluster = Cluster::from_config(&config, engine, Box::new(sinks::TracingDisplay));

    // Create application state
    let state = state::AppState::new()
        .with_command_sink(commands)
        .with_track_sender(track_tx)
        .with_sink_dir(config.sink_dir.clone());

    let cancel = CancellationToken::new();

    let tick_loop = tokio::spawn(manager::run(cluster, state.clone(), cancel.clone()));
    tokio::spawn(sinks::run_forwarder(state.clone(), cancel.clone()));

    // Build the router
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!("Server listening on http://{}", config.listen);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutting down"),
            Err(e) => warn!("Ctrl-C handler failed, shutting down: {}", e),
        }
        shutdown.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await?;

    // Let the tick loop write the final odometer reading
    cancel.cancel();
    if let Err(e) = tick_loop.await {
        warn!("Tick loop ended abnormally: {}", e);
    }

    Ok(())
}

#[cfg(unix)]
fn attach_sockets(config: &DashConfig, engine: &mut DemoEngine) -> Box<dyn CommandSink> {
    use mdash_adapters::{UnixCommandSink, UnixSpeedSource, UnixTrackSource};

    engine.add_source(Box::new(UnixTrackSource::bind(&config.sockets.track)));
    engine.add_source(Box::new(UnixSpeedSource::bind(&config.sockets.speed)));
    Box::new(UnixCommandSink::new(&config.sockets.command))
}

#[cfg(not(unix))]
fn attach_sockets(_config: &DashConfig, _engine: &mut DemoEngine) -> Box<dyn CommandSink> {
    warn!("Datagram sockets need a unix host, media and speed feeds disabled");
    Box::new(mdash_core::source::NullCommandSink)
}
