/// Common test utilities for discovery integration tests
///
/// This module provides shared test infrastructure including:
/// - An in-process Insight mock server per test
/// - Address helpers for the sample account
/// - Account construction against the mock

use bip44_discovery::{
    Account, ChainKind, GapLimits, InsightOracle, KeyDerivation, XpubDerivation,
};
use insight_mock::{ActivityLedger, Mode};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

pub const SAMPLE_XPUB: &str = "xpub6BhPoCyVJgAh9YHxKfu46kGtq6iGetbLwCuTbVAuMusQreM21nEGiiB3TDfqfhu92seYnWTRhdXhrmsChrZdPfUh7VAm6tryfBvYdMWgsCp";

pub type TestAccount = Account<XpubDerivation, InsightOracle>;

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// Mock Insight server plus a derivation for the sample account
pub struct TestEnvironment {
    pub ledger: Arc<ActivityLedger>,
    pub base_url: String,
    derivation: XpubDerivation,
}

impl TestEnvironment {
    pub async fn new() -> anyhow::Result<Self> {
        init_logger();

        let ledger = Arc::new(ActivityLedger::new());
        let addr = insight_mock::spawn_server(ledger.clone()).await?;
        let base_url = format!("http://{}", addr);
        log::info!("📡 Insight mock: {}", base_url);

        Ok(Self {
            ledger,
            base_url,
            derivation: XpubDerivation::new(SAMPLE_XPUB)?,
        })
    }

    pub fn account(&self, gap_limits: GapLimits) -> anyhow::Result<TestAccount> {
        let oracle = InsightOracle::new(&self.base_url, Duration::from_secs(5))?;
        Ok(Account::from_xpub(SAMPLE_XPUB, gap_limits, oracle)?)
    }

    pub fn addr(&self, chain: ChainKind, index: u32) -> String {
        self.derivation
            .derive_address(chain, index)
            .expect("sample account derivation")
    }

    pub fn addrs(&self, chain: ChainKind, indices: Range<u32>) -> Vec<String> {
        indices.map(|i| self.addr(chain, i)).collect()
    }

    pub fn addr_set(&self, chain: ChainKind, index: u32) -> HashSet<String> {
        [self.addr(chain, index)].into_iter().collect()
    }

    /// Give every address in `indices` one transaction
    pub fn activate(&self, chain: ChainKind, indices: Range<u32>) {
        for address in self.addrs(chain, indices) {
            self.ledger.set_activity(&address, 1);
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        self.ledger.set_mode(mode);
    }
}
