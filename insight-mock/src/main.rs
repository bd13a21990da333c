/// Insight Mock Server
///
/// A lightweight mock of the Insight `addrs/txs` endpoint backed by an in-memory ledger.
/// Designed for local discovery runs and integration tests.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use insight_mock::{run_server, ActivityLedger};

#[derive(Debug)]
struct Config {
    // Optional JSON object of address -> tx count loaded at startup
    activity_file: Option<String>,

    // Server
    server_host: String,
    server_port: u16,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let activity_file = env::var("ACTIVITY_FILE").ok();

        let server_host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        Ok(Self {
            activity_file,
            server_host,
            server_port,
        })
    }
}

fn load_activity(path: &str) -> Result<HashMap<String, u64>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON object of address -> count", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting Insight Mock Server...");

    // Load configuration
    let config = Config::from_env()
        .context("Failed to load configuration")?;

    log::info!("Server will listen on {}:{}", config.server_host, config.server_port);

    let ledger = match config.activity_file.as_deref() {
        Some(path) => {
            let activity = load_activity(path)?;
            log::info!("Loaded activity for {} addresses from {}", activity.len(), path);
            ActivityLedger::with_activity(activity)
        }
        None => ActivityLedger::new(),
    };

    // Run server
    run_server(Arc::new(ledger), config.server_host, config.server_port)
        .await
        .context("Server error")?;

    Ok(())
}
