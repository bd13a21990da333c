//! BIP44 account discovery
//!
//! Finds the used addresses of a BIP44 account by gap-limit scanning its receiving
//! (external) and change (internal) chains against an address-activity service.
//!
//! # Architecture
//!
//! - **KeyDerivation**: deterministic `(chain, index) -> address` mapping (xpub based)
//! - **ActivityOracle**: batched "has any of these addresses been used" query (Insight API)
//! - **ChainScanner**: windowed gap-limit scan of one chain, committed atomically
//! - **Account**: both chains, plus re-discovery when an unused address gets used
//!
//! # Example
//!
//! ```ignore
//! use bip44_discovery::{Account, DiscoveryConfig, InsightOracle};
//!
//! let config = DiscoveryConfig::from_env()?;
//! let oracle = InsightOracle::from_config(&config)?;
//! let mut account = Account::from_xpub(xpub, config.gap_limits, oracle)?;
//!
//! account.discover().await?;
//!
//! let seen: HashSet<String> = [incoming_address].into();
//! if account.is_affected(&seen) {
//!     account.mark_used(&seen).await?;
//! }
//! ```

pub mod account;
pub mod config;
pub mod derivation;
pub mod error;
pub mod oracle;
pub mod scanner;

#[cfg(test)]
pub(crate) mod test_support;

pub use account::{Account, AccountSummary, ChainSummary};
pub use config::{DiscoveryConfig, GapLimits};
pub use derivation::{KeyDerivation, XpubDerivation};
pub use error::DiscoveryError;
pub use oracle::{ActivityOracle, InsightOracle};
pub use scanner::{ChainKind, ChainScanner, ScanOutcome};
