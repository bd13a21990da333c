use anyhow::Context;
use bip44_discovery::{Account, ChainKind, DiscoveryConfig, InsightOracle};
use std::collections::HashSet;
use std::env;
use std::time::Instant;

const SAMPLE_XPUB: &str = "xpub6BhPoCyVJgAh9YHxKfu46kGtq6iGetbLwCuTbVAuMusQreM21nEGiiB3TDfqfhu92seYnWTRhdXhrmsChrZdPfUh7VAm6tryfBvYdMWgsCp";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    // Set RUST_LOG=debug to see every window query
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DiscoveryConfig::from_env().context("Failed to load configuration")?;
    let account_key = env::var("ACCOUNT_XPUB").unwrap_or_else(|_| SAMPLE_XPUB.to_string());

    let oracle = InsightOracle::from_config(&config)?;
    let mut account = Account::from_xpub(&account_key, config.gap_limits, oracle)
        .context("Failed to load account key")?;

    let start = Instant::now();
    account.discover().await.context("Discovery failed")?;

    log::info!("Addresses: {:?}", account.addresses());
    log_unused(&account);

    if let Ok(address) = env::var("MARK_USED_ADDRESS") {
        let used: HashSet<String> = [address].into_iter().collect();

        for _ in 0..2 {
            let rediscovered = account.mark_used(&used).await?;
            log::info!("New discovery? {}", rediscovered);
            log_unused(&account);
        }
    }

    log::info!("Finished in {:?}", start.elapsed());
    println!("{}", serde_json::to_string_pretty(&account.summary())?);
    Ok(())
}

fn log_unused<D, O>(account: &Account<D, O>)
where
    D: bip44_discovery::KeyDerivation,
    O: bip44_discovery::ActivityOracle,
{
    log::info!(
        "Unused: external {:?}, internal {:?}",
        account.chain(ChainKind::External).unused_buffer(),
        account.chain(ChainKind::Internal).unused_buffer()
    );
}
