//! RathaIO - HTTP control server for a small wheeled robot
//!
//! Single daemon exposing the rover over HTTP on the local network:
//!
//! - **POST /control**: differential drive from two joystick axes
//! - **GET/POST /lights**: indicator LED strip on/off
//! - **GET /camera/{id}/...**: MJPEG streams, snapshots and camera status
//!
//! Hardware access goes through a per-platform capability provider, so the
//! same binary runs on a Raspberry Pi, an Odroid, any Linux board with
//! sysfs GPIO, or fully simulated on a desktop.

use log::{info, warn};
use ratha_io::error::Result;
use ratha_io::{server, AppConfig, HardwareContext, Platform};
use std::env;
use std::sync::Arc;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `rathaio <path>` (positional)
/// - `rathaio --config <path>` (flag-based)
/// - `rathaio -c <path>` (short flag)
///
/// Defaults to `/etc/rathaio.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    // Default path
    "/etc/rathaio.toml".to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load the config before the logger so its level can seed the filter
    let config_path = parse_config_path();
    let loaded = AppConfig::load_or_defaults(&config_path);

    let default_level = loaded
        .as_ref()
        .map(|(config, _)| config.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&default_level))
        .init();

    info!("RathaIO v{} starting...", env!("CARGO_PKG_VERSION"));

    // A missing file falls back to defaults; a broken one is fatal
    let (config, from_file) = loaded?;
    if from_file {
        info!("Using config: {}", config_path);
    } else {
        warn!("No config at {}, using built-in defaults", config_path);
    }

    let (platform, model_hint) = Platform::resolve(&config.platform.platform)?;
    match &model_hint {
        Some(model) => info!("Platform: {} ({})", platform.name(), model),
        None => info!("Platform: {}", platform.name()),
    }

    // Built-in defaults carry per-board wiring, so re-derive them once the
    // platform is known. A config file always wins.
    let config = if from_file {
        config
    } else {
        AppConfig::defaults_for(platform)
    };

    let context = Arc::new(HardwareContext::initialize(platform, model_hint, &config)?);

    info!("RathaIO running. Press Ctrl-C to stop.");
    server::serve(Arc::clone(&context), &config.server.bind_address).await?;

    // Shutdown
    info!("Shutting down...");
    context.shutdown();

    info!("RathaIO stopped");
    Ok(())
}
