use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidgen_api::config::ServerConfig;
use vidgen_api::notifications::TaskEventForwarder;
use vidgen_api::router::build_app_router;
use vidgen_api::state::AppState;
use vidgen_api::ws;
use vidgen_core::JobSubmitter;
use vidgen_engine::{Engine, EngineConfig};
use vidgen_events::EventBus;
use vidgen_kie::{KieApi, KieConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vidgen_api=debug,vidgen_engine=debug,vidgen_kie=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    let engine_config = EngineConfig::from_env()?;
    let kie_config = KieConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        max_concurrent = engine_config.max_concurrent,
        callback_url = %kie_config.callback_url,
        "Loaded configuration",
    );

    // --- Generation API client ---
    let submitter: Arc<dyn JobSubmitter> = Arc::new(KieApi::new(kie_config)?);

    // --- Event bus + engine ---
    let event_bus = Arc::new(EventBus::default());
    let engine = Arc::new(Engine::new(
        &engine_config,
        submitter,
        Arc::clone(&event_bus),
    ));

    let cancel = CancellationToken::new();
    let loop_handles = engine.spawn_loops(&cancel);
    tracing::info!("Scheduler loops started (admission, reconciliation, retention)");

    // --- WebSocket manager + heartbeat ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager), ws::HEARTBEAT_INTERVAL);

    // Relay task events to WebSocket clients.
    let forwarder = TaskEventForwarder::new(Arc::clone(&ws_manager));
    let forwarder_handle = tokio::spawn(forwarder.run(event_bus.subscribe(), cancel.clone()));

    // --- App state ---
    let state = AppState {
        engine: Arc::clone(&engine),
        ws_manager: Arc::clone(&ws_manager),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, static_dir = %config.static_dir.display(), "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    for handle in loop_handles {
        match tokio::time::timeout(Duration::from_secs(5), handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Background loop ended abnormally"),
            Err(_) => tracing::warn!("Background loop did not stop within 5s"),
        }
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), forwarder_handle).await;
    tracing::info!(in_flight = engine.in_flight(), "Background loops stopped");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
///
/// If a handler cannot be installed that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
