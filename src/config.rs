/// Discovery configuration from environment variables
///
/// Controls the Insight endpoint, per-chain gap limits and the oracle request timeout.

use crate::error::DiscoveryError;
use crate::scanner::ChainKind;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_INSIGHT_URL: &str = "https://insight.bitpay.com";
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 30;

/// Number of consecutive unused addresses that ends discovery on each chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GapLimits {
    external: u32,
    internal: u32,
}

impl GapLimits {
    /// Both limits must be positive.
    pub fn new(external: u32, internal: u32) -> Result<Self, DiscoveryError> {
        if external == 0 || internal == 0 {
            return Err(DiscoveryError::Config(format!(
                "gap limits must be positive (external={}, internal={})",
                external, internal
            )));
        }
        Ok(Self { external, internal })
    }

    pub fn external(&self) -> u32 {
        self.external
    }

    pub fn internal(&self) -> u32 {
        self.internal
    }

    pub fn limit_for(&self, chain: ChainKind) -> u32 {
        match chain {
            ChainKind::External => self.external,
            ChainKind::Internal => self.internal,
        }
    }
}

/// BIP44 recommends 20 for receiving addresses; change addresses are
/// used immediately after generation, so a short gap suffices.
impl Default for GapLimits {
    fn default() -> Self {
        Self {
            external: 20,
            internal: 5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    /// Insight API base URL
    pub insight_url: String,
    pub gap_limits: GapLimits,
    /// Per-request timeout applied by the HTTP oracle
    pub oracle_timeout: Duration,
}

impl DiscoveryConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `INSIGHT_URL`: Insight API endpoint (default `https://insight.bitpay.com`)
    /// - `GAP_LIMIT_EXTERNAL`: receiving chain gap limit (default 20)
    /// - `GAP_LIMIT_INTERNAL`: change chain gap limit (default 5)
    /// - `ORACLE_TIMEOUT_SECS`: HTTP request timeout (default 30)
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Against a local insight-mock
    /// INSIGHT_URL=http://localhost:3001 GAP_LIMIT_EXTERNAL=5 cargo run
    /// ```
    pub fn from_env() -> Result<Self, DiscoveryError> {
        let insight_url = env::var("INSIGHT_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_INSIGHT_URL.to_string());
        log::info!("Insight URL: {}", insight_url);

        let defaults = GapLimits::default();
        let external = read_env("GAP_LIMIT_EXTERNAL", defaults.external())?;
        let internal = read_env("GAP_LIMIT_INTERNAL", defaults.internal())?;
        let gap_limits = GapLimits::new(external, internal)?;
        log::info!(
            "Gap limits: external={}, internal={}",
            gap_limits.external(),
            gap_limits.internal()
        );

        let timeout_secs = read_env("ORACLE_TIMEOUT_SECS", DEFAULT_ORACLE_TIMEOUT_SECS)?;

        Ok(Self {
            insight_url,
            gap_limits,
            oracle_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            insight_url: DEFAULT_INSIGHT_URL.to_string(),
            gap_limits: GapLimits::default(),
            oracle_timeout: Duration::from_secs(DEFAULT_ORACLE_TIMEOUT_SECS),
        }
    }
}

fn read_env<T>(key: &str, default: T) -> Result<T, DiscoveryError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| DiscoveryError::Config(format!("invalid {}={:?}: {}", key, value, e))),
        Err(_) => Ok(default),
    }
}
