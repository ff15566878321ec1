//! SharpBlade Daemon
//!
//! Drives the SwitchBlade touchpad and dynamic keys: renders a dashboard that
//! follows touch input, assigns dynamic key images and keeps the app's
//! `.rzdisplaystate` file where the device expects it.

mod config;
mod rendering;
mod state;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = load_or_create_config(Path::new(&config_path))?;
    info!("Loaded configuration from: {}", config_path);

    // Start the SDK and everything hanging off it; failure here is fatal
    let state = Arc::new(AppState::new(&config)?);
    info!(
        "RzDisplayState monitoring: {}",
        if state.is_display_state_monitored() {
            "armed"
        } else {
            "off"
        }
    );

    if let Err(e) = state.render_now() {
        warn!("Initial render failed: {}", e);
    }

    // Forward device events to the dashboard
    let event_state = state.clone();
    let events = tokio::spawn(async move {
        event_loop(event_state).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received interrupt, shutting down");

    events.abort();
    state.shutdown();
    info!("Rendered {} frames", state.frames_rendered());
    if state.is_display_state_monitored() {
        warn!("RzDisplayState monitoring still armed after shutdown");
    }

    Ok(())
}

/// Loads the configuration, writing the defaults first if the file is missing.
fn load_or_create_config(path: &Path) -> Result<Config> {
    if path.exists() {
        return Config::load(path).context("Failed to load configuration");
    }

    warn!("{} not found, using defaults", path.display());
    let config = Config::default();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Failed to create {}: {}", parent.display(), e);
            return Ok(config);
        }
    }
    if let Err(e) = config.save(path) {
        warn!("Failed to write default configuration: {}", e);
    }
    Ok(config)
}

async fn event_loop(state: Arc<AppState>) {
    let mut events = state.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => state.handle_event(&event),
            Err(RecvError::Lagged(missed)) => {
                warn!("Event handler fell behind, dropped {} events", missed);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
