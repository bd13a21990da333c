/// In-memory activity backend
///
/// Holds per-address transaction counts and the failure mode the server should emulate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// How /api/addrs/txs answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    /// 503 for every query
    Outage,
    /// 200 with a body lacking `totalItems`
    Malformed,
}

#[derive(Debug, Default)]
pub struct ActivityLedger {
    counts: RwLock<HashMap<String, u64>>,
    mode: RwLock<Mode>,
    served: AtomicU64,
}

impl ActivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity(activity: HashMap<String, u64>) -> Self {
        Self {
            counts: RwLock::new(activity),
            ..Self::default()
        }
    }

    /// Record `count` transactions for `address` (0 removes it)
    pub fn set_activity(&self, address: &str, count: u64) {
        let mut counts = self.counts.write().unwrap_or_else(|e| e.into_inner());
        if count == 0 {
            counts.remove(address);
        } else {
            counts.insert(address.to_string(), count);
        }
    }

    pub fn known_addresses(&self) -> usize {
        self.counts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Sum of transaction counts over `addresses`
    ///
    /// A transaction touching several of the addresses is counted once per address;
    /// callers only compare the total against zero.
    pub fn total_items(&self, addresses: &[&str]) -> u64 {
        self.served.fetch_add(1, Ordering::SeqCst);
        let counts = self.counts.read().unwrap_or_else(|e| e.into_inner());
        addresses
            .iter()
            .filter_map(|a| counts.get(*a))
            .sum()
    }

    pub fn served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> Mode {
        *self.mode.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_mode(&self, mode: Mode) {
        log::info!("Switching mock mode to {:?}", mode);
        *self.mode.write().unwrap_or_else(|e| e.into_inner()) = mode;
    }
}
