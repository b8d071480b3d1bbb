//! Main application entry point (server binary).
//!
//! A thin wrapper around the `geoip_api` library that handles:
//! - Environment variable loading (.env file)
//! - Command-line / environment parsing
//! - Logger initialization

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use geoip_api::config::Opt;
use geoip_api::initialization::init_logger_with;
use geoip_api::{run_server, Config, LogSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // .env in the working directory, else next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    let logging = LogSettings::from(&opt);
    init_logger_with(logging.level.into(), logging.format)
        .context("Failed to initialize logger")?;
    if let Some(raw) = &logging.unrecognized_level {
        log::info!("Unknown LOG_LEVEL '{}', using INFO", raw);
    }

    let config = Config::from(opt);
    log::info!("Starting GeoIP API (version {})", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server(config).await {
        log::error!("{:#}", e);
        eprintln!("geoip_api error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
