//! Encore session player daemon - main entry point
//!
//! Runs one playback session: the transport controller, its simulated
//! media surfaces, the persisted preference store, and the REST/SSE
//! control surface the portal front-end drives.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use encore_player::analytics::{AnalyticsSink, HttpAnalyticsSink, NoopSink};
use encore_player::api;
use encore_player::db::{self, SqlitePreferenceStore};
use encore_player::playback::{ClockHandle, ControllerPorts, SessionController};
use encore_player::resolver::HttpPlaylistResolver;

/// Command-line arguments for encore-player
#[derive(Parser, Debug)]
#[command(name = "encore-player")]
#[command(about = "Session playback daemon for the Encore artist portal")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "ENCORE_PLAYER_PORT")]
    port: u16,

    /// Path to the player preference database
    #[arg(short, long, default_value = "encore-player.db", env = "ENCORE_PLAYER_DB")]
    database: PathBuf,

    /// Base URL of the portal backend (playlist resolution)
    #[arg(long, env = "ENCORE_BACKEND_URL")]
    backend_url: String,

    /// Tracking endpoint for playback analytics (omit to disable)
    #[arg(long, env = "ENCORE_TRACKING_URL")]
    tracking_url: Option<String>,

    /// Player placement tag attached to analytics payloads
    #[arg(long, default_value = "artist_page", env = "ENCORE_PLAYER_CONTEXT")]
    player_context: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encore_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Encore session player on port {}", args.port);

    let pool = db::init_db(&args.database)
        .await
        .context("Failed to open preference database")?;

    let analytics: Arc<dyn AnalyticsSink> = match &args.tracking_url {
        Some(url) => {
            info!("Forwarding playback analytics to {}", url);
            HttpAnalyticsSink::new(url.clone())
        }
        None => {
            info!("No tracking endpoint configured, analytics disabled");
            Arc::new(NoopSink)
        }
    };

    // Simulated surfaces: position advances in real time, ended fires
    // at the track duration. Actual rendering happens in the client.
    let tick = Duration::from_millis(250);
    let controller = SessionController::new(ControllerPorts {
        audio: ClockHandle::spawn(300.0, tick),
        video: ClockHandle::spawn(300.0, tick),
        resolver: Arc::new(HttpPlaylistResolver::new(args.backend_url.clone())),
        analytics,
        preferences: Arc::new(SqlitePreferenceStore::new(pool)),
        player_context: args.player_context.clone(),
    });
    controller.init().await;
    info!("Session controller initialized");

    let app_state = api::AppState {
        controller: controller.clone(),
        port: args.port,
    };
    let app = api::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    controller.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
