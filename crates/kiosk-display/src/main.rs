mod config;

use std::path::PathBuf;
use std::sync::Arc;

use carousel_core::{DisplayState, Phase};
use carousel_engine::Engine;
use carousel_sources::HttpSource;
use clap::Parser;
use tokio::sync::watch;

use crate::config::KioskConfig;

/// Command line arguments for the kiosk display driver
#[derive(Parser, Debug)]
#[command(name = "kiosk-display")]
#[command(about = "Carousel display driver for the robotic parts kiosk")]
struct Args {
    /// Path to the kiosk configuration JSON file
    #[arg(short, long)]
    config: PathBuf,

    /// Override the remote service base URL from the config file
    #[arg(long)]
    base_url: Option<String>,

    /// Override the bearer token from the config file
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt().pretty().init();

    // Load kiosk configuration from JSON file
    let config_content = tokio::fs::read_to_string(&args.config).await.map_err(|e| {
        format!(
            "Failed to read config file '{}': {}",
            args.config.display(),
            e
        )
    })?;

    let mut config: KioskConfig = serde_json::from_str(&config_content).map_err(|e| {
        format!(
            "Failed to parse config file '{}': {}",
            args.config.display(),
            e
        )
    })?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(token) = args.token {
        config.auth_token = Some(token);
    }

    tracing::info!(
        "Loaded kiosk config from {}: polling {}",
        args.config.display(),
        config.base_url
    );

    let source = Arc::new(HttpSource::new(&config.base_url, config.auth_token.clone()));
    let engine = Engine::new(config.timing(), source.clone(), source);
    let display = engine.subscribe();
    let shutdown = engine.shutdown_handle();

    tokio::spawn(render_loop(display));
    let runner = tokio::spawn(engine.run());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;
    tracing::info!("Shutdown requested");
    shutdown.shutdown();
    runner.await.map_err(|e| format!("Engine task failed: {}", e))?;

    Ok(())
}

/// Stand-in for the visual renderer: log every display transition the engine
/// emits.
async fn render_loop(mut display: watch::Receiver<DisplayState>) {
    loop {
        let state = display.borrow_and_update().clone();
        render(&state);
        if display.changed().await.is_err() {
            break;
        }
    }
}

fn render(state: &DisplayState) {
    match state.phase {
        Phase::Loading => tracing::info!("Initializing display system"),
        Phase::Error => tracing::warn!("Station service unreachable, display blanked"),
        Phase::NoTray => tracing::info!("No trays loaded, waiting"),
        Phase::Displaying => {
            let station = state
                .station
                .as_ref()
                .map(|s| s.label.as_str())
                .unwrap_or("?");
            match &state.part {
                Some(part) => tracing::info!(
                    station,
                    part = %part.name,
                    index = state.part_index,
                    "Displaying part"
                ),
                None => tracing::info!(station, "Waiting for parts"),
            }
        }
    }
}
