//! In-process fakes for the derivation and oracle seams

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::derivation::KeyDerivation;
use crate::error::DiscoveryError;
use crate::oracle::ActivityOracle;
use crate::scanner::ChainKind;

/// Derives readable addresses such as `ext/3` and `int/7`
pub struct IndexDerivation;

impl IndexDerivation {
    pub fn addr(chain: ChainKind, index: u32) -> String {
        match chain {
            ChainKind::External => format!("ext/{}", index),
            ChainKind::Internal => format!("int/{}", index),
        }
    }

    pub fn range(chain: ChainKind, indices: std::ops::Range<u32>) -> Vec<String> {
        indices.map(|i| Self::addr(chain, i)).collect()
    }
}

impl KeyDerivation for IndexDerivation {
    fn derive_address(&self, chain: ChainKind, index: u32) -> Result<String, DiscoveryError> {
        Ok(Self::addr(chain, index))
    }
}

/// Counts queried addresses found in an editable set of active addresses
#[derive(Default)]
pub struct ScriptedOracle {
    active: Mutex<HashSet<String>>,
    queries: Mutex<Vec<Vec<String>>>,
    fail_from: Mutex<Option<usize>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self, chain: ChainKind, indices: std::ops::Range<u32>) {
        let mut active = self.active.lock().unwrap();
        active.extend(IndexDerivation::range(chain, indices));
    }

    /// Every query from the `n`th onwards (0-based, counting all queries so far) fails
    pub fn fail_from(&self, n: usize) {
        *self.fail_from.lock().unwrap() = Some(n);
    }

    pub fn recover(&self) {
        *self.fail_from.lock().unwrap() = None;
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<Vec<String>> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityOracle for ScriptedOracle {
    async fn query_activity(&self, addresses: &[String]) -> Result<u64, DiscoveryError> {
        let seen = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(addresses.to_vec());
            queries.len() - 1
        };

        if let Some(n) = *self.fail_from.lock().unwrap() {
            if seen >= n {
                return Err(DiscoveryError::OracleUnavailable("connection refused".into()));
            }
        }

        let active = self.active.lock().unwrap();
        Ok(addresses.iter().filter(|a| active.contains(*a)).count() as u64)
    }
}

/// Never answers
pub struct StalledOracle;

#[async_trait]
impl ActivityOracle for StalledOracle {
    async fn query_activity(&self, _addresses: &[String]) -> Result<u64, DiscoveryError> {
        futures::future::pending().await
    }
}
