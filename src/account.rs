//! BIP44 account discovery across the receiving and change chains

use serde::Serialize;
use std::collections::HashSet;

use crate::config::GapLimits;
use crate::derivation::{KeyDerivation, XpubDerivation};
use crate::error::DiscoveryError;
use crate::oracle::ActivityOracle;
use crate::scanner::{ChainKind, ChainScanner};

pub struct Account<D, O> {
    id: String,
    derivation: D,
    oracle: O,
    ext_chain: ChainScanner,
    int_chain: ChainScanner,
}

impl<O: ActivityOracle> Account<XpubDerivation, O> {
    /// Build an account from its extended public key (or a descriptor containing one)
    pub fn from_xpub(
        account_key: &str,
        gap_limits: GapLimits,
        oracle: O,
    ) -> Result<Self, DiscoveryError> {
        let derivation = XpubDerivation::new(account_key)?;
        let id = derivation.xpub().to_string();
        Ok(Self::new(id, derivation, oracle, gap_limits))
    }
}

impl<D: KeyDerivation, O: ActivityOracle> Account<D, O> {
    pub fn new(id: impl Into<String>, derivation: D, oracle: O, gap_limits: GapLimits) -> Self {
        Self {
            id: id.into(),
            derivation,
            oracle,
            ext_chain: ChainScanner::new(ChainKind::External, &gap_limits),
            int_chain: ChainScanner::new(ChainKind::Internal, &gap_limits),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chain(&self, chain: ChainKind) -> &ChainScanner {
        match chain {
            ChainKind::External => &self.ext_chain,
            ChainKind::Internal => &self.int_chain,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Scan both chains from where they last stopped.
    ///
    /// The chains are scanned concurrently. A chain whose scan succeeded keeps its
    /// result even when the other one fails; the external chain's error is reported first.
    pub async fn discover(&mut self) -> Result<(), DiscoveryError> {
        let ext_start = self.ext_chain.resume_index();
        let int_start = self.int_chain.resume_index();

        let (ext, int) = futures::future::join(
            self.ext_chain.scan(ext_start, &self.derivation, &self.oracle),
            self.int_chain.scan(int_start, &self.derivation, &self.oracle),
        )
        .await;

        let ext = ext.map(|outcome| self.ext_chain.commit(outcome));
        let int = int.map(|outcome| self.int_chain.commit(outcome));
        ext.and(int)
    }

    /// Whether any of `changed` belongs to the addresses discovered so far.
    pub fn is_affected(&self, changed: &HashSet<String>) -> bool {
        self.ext_chain.knows_any(changed) || self.int_chain.knows_any(changed)
    }

    /// Extend discovery on every chain whose unused buffer contains one of `used`.
    ///
    /// Such a buffer is promoted to used and the chain is scanned on from its next index.
    /// Only the unused buffers are consulted: an address that was already promoted to
    /// used never triggers another scan. Returns whether any chain was rescanned.
    pub async fn mark_used(&mut self, used: &HashSet<String>) -> Result<bool, DiscoveryError> {
        let mut rescanned = false;

        if self.ext_chain.unused_intersects(used) {
            log::info!("Account {}: external unused address seen, rediscovering", self.id);
            self.ext_chain.advance(&self.derivation, &self.oracle).await?;
            rescanned = true;
        }

        if self.int_chain.unused_intersects(used) {
            log::info!("Account {}: internal unused address seen, rediscovering", self.id);
            self.int_chain.advance(&self.derivation, &self.oracle).await?;
            rescanned = true;
        }

        Ok(rescanned)
    }

    /// Every address discovered so far, external chain first
    pub fn addresses(&self) -> Vec<String> {
        self.ext_chain
            .known_addresses()
            .chain(self.int_chain.known_addresses())
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            account: self.id.clone(),
            external: ChainSummary::from(&self.ext_chain),
            internal: ChainSummary::from(&self.int_chain),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub account: String,
    pub external: ChainSummary,
    pub internal: ChainSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainSummary {
    pub gap_limit: u32,
    pub next_index: u32,
    pub used: Vec<String>,
    pub unused: Vec<String>,
}

impl From<&ChainScanner> for ChainSummary {
    fn from(chain: &ChainScanner) -> Self {
        Self {
            gap_limit: chain.gap_limit(),
            next_index: chain.next_index(),
            used: chain.used_addresses().to_vec(),
            unused: chain.unused_buffer().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{IndexDerivation, ScriptedOracle};

    const EXT: ChainKind = ChainKind::External;
    const INT: ChainKind = ChainKind::Internal;

    fn account(oracle: ScriptedOracle) -> Account<IndexDerivation, ScriptedOracle> {
        Account::new("test", IndexDerivation, oracle, GapLimits::default())
    }

    fn set(addrs: &[String]) -> HashSet<String> {
        addrs.iter().cloned().collect()
    }

    fn addr_set(chain: ChainKind, index: u32) -> HashSet<String> {
        set(&[IndexDerivation::addr(chain, index)])
    }

    #[tokio::test]
    async fn test_internal_chain_discovery() {
        let oracle = ScriptedOracle::new();
        oracle.activate(INT, 0..5);
        let mut account = account(oracle);

        account.discover().await.unwrap();

        let int = account.chain(INT);
        assert_eq!(int.used_addresses(), IndexDerivation::range(INT, 0..5).as_slice());
        assert_eq!(int.unused_buffer(), IndexDerivation::range(INT, 5..10).as_slice());
        assert_eq!(int.next_index(), 10);

        let ext = account.chain(EXT);
        assert!(ext.used_addresses().is_empty());
        assert_eq!(ext.next_index(), 20);
    }

    #[tokio::test]
    async fn test_mark_used_extends_internal_chain() {
        let oracle = ScriptedOracle::new();
        oracle.activate(INT, 0..5);
        let mut account = account(oracle);
        account.discover().await.unwrap();

        account.oracle().activate(INT, 10..15);
        let queries_before = account.oracle().query_count();

        assert!(account.mark_used(&addr_set(INT, 7)).await.unwrap());

        let int = account.chain(INT);
        assert_eq!(int.used_addresses(), IndexDerivation::range(INT, 0..15).as_slice());
        assert_eq!(int.unused_buffer(), IndexDerivation::range(INT, 15..20).as_slice());
        assert_eq!(int.next_index(), 20);
        // internal chain only: [10,15), [15,20)
        assert_eq!(account.oracle().query_count(), queries_before + 2);

        let queries_before = account.oracle().query_count();
        assert!(!account.mark_used(&addr_set(INT, 7)).await.unwrap());
        assert_eq!(account.oracle().query_count(), queries_before);
    }

    #[tokio::test]
    async fn test_mark_used_ignores_used_addresses() {
        let oracle = ScriptedOracle::new();
        oracle.activate(EXT, 0..3);
        let mut account = account(oracle);
        account.discover().await.unwrap();

        let used = addr_set(EXT, 1);
        assert!(account.is_affected(&used));
        assert!(!account.mark_used(&used).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_used_rescans_each_matching_chain() {
        let mut account = account(ScriptedOracle::new());
        account.discover().await.unwrap();

        let mut used = addr_set(EXT, 3);
        used.extend(addr_set(INT, 2));

        assert!(account.mark_used(&used).await.unwrap());
        assert_eq!(account.chain(EXT).next_index(), 40);
        assert_eq!(account.chain(INT).next_index(), 10);
    }

    #[tokio::test]
    async fn test_mark_used_unknown_address() {
        let mut account = account(ScriptedOracle::new());
        account.discover().await.unwrap();
        let queries = account.oracle().query_count();

        assert!(!account.mark_used(&addr_set(EXT, 500)).await.unwrap());
        assert!(!account.mark_used(&HashSet::new()).await.unwrap());
        assert_eq!(account.oracle().query_count(), queries);
    }

    #[tokio::test]
    async fn test_discover_twice_is_idempotent() {
        let oracle = ScriptedOracle::new();
        oracle.activate(EXT, 0..25);
        oracle.activate(INT, 0..4);
        let mut account = account(oracle);

        account.discover().await.unwrap();
        let first = account.addresses();
        let (ext_next, int_next) = (
            account.chain(EXT).next_index(),
            account.chain(INT).next_index(),
        );

        account.discover().await.unwrap();

        assert_eq!(account.addresses(), first);
        assert_eq!(account.chain(EXT).next_index(), ext_next);
        assert_eq!(account.chain(INT).next_index(), int_next);
    }

    #[tokio::test]
    async fn test_is_affected() {
        let oracle = ScriptedOracle::new();
        oracle.activate(EXT, 0..1);
        let mut account = account(oracle);

        assert!(!account.is_affected(&addr_set(EXT, 0)));
        account.discover().await.unwrap();
        let queries = account.oracle().query_count();

        assert!(account.is_affected(&addr_set(EXT, 0)));
        assert!(account.is_affected(&addr_set(EXT, 39)));
        assert!(account.is_affected(&addr_set(INT, 4)));
        assert!(!account.is_affected(&addr_set(EXT, 40)));
        assert!(!account.is_affected(&addr_set(INT, 5)));
        assert_eq!(account.oracle().query_count(), queries);
    }

    #[tokio::test]
    async fn test_discover_failure_then_retry() {
        let oracle = ScriptedOracle::new();
        oracle.activate(EXT, 0..20);
        oracle.fail_from(0);
        let mut account = account(oracle);

        let err = account.discover().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(account.chain(EXT).next_index(), 0);
        assert_eq!(account.chain(INT).next_index(), 0);

        account.oracle().recover();
        account.discover().await.unwrap();
        assert_eq!(account.chain(EXT).next_index(), 40);
        assert_eq!(account.chain(INT).next_index(), 5);
    }

    #[tokio::test]
    async fn test_discover_commits_the_chain_that_succeeded() {
        let oracle = ScriptedOracle::new();
        // the external window is queried first, every later query fails
        oracle.fail_from(1);
        let mut account = account(oracle);

        let err = account.discover().await.unwrap_err();

        assert!(matches!(err, DiscoveryError::OracleUnavailable(_)));
        assert_eq!(account.chain(EXT).next_index(), 20);
        assert_eq!(account.chain(EXT).unused_buffer().len(), 20);
        assert_eq!(account.chain(INT).next_index(), 0);
        assert!(account.chain(INT).unused_buffer().is_empty());
    }

    #[tokio::test]
    async fn test_mark_used_external_failure_leaves_internal_untouched() {
        let mut account = account(ScriptedOracle::new());
        account.discover().await.unwrap();
        let ext_before = account.chain(EXT).unused_buffer().to_vec();
        let int_before = account.chain(INT).unused_buffer().to_vec();

        let queries = account.oracle().query_count();
        account.oracle().fail_from(queries);
        let mut used = addr_set(EXT, 0);
        used.extend(addr_set(INT, 0));

        let err = account.mark_used(&used).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::OracleUnavailable(_)));
        // only the external window was attempted
        assert_eq!(account.oracle().query_count(), queries + 1);
        assert_eq!(account.chain(EXT).unused_buffer(), ext_before.as_slice());
        assert_eq!(account.chain(INT).unused_buffer(), int_before.as_slice());
        assert_eq!(account.chain(INT).next_index(), 5);
        assert!(account.chain(INT).used_addresses().is_empty());
    }

    #[tokio::test]
    async fn test_summary() {
        let mut account = account(ScriptedOracle::new());
        account.discover().await.unwrap();

        let summary = account.summary();
        assert_eq!(summary.account, "test");
        assert_eq!(summary.internal.gap_limit, 5);
        assert_eq!(summary.external.unused.len(), 20);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["internal"]["next_index"], 5);
    }
}
