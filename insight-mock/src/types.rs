/// Insight API request and response types
///
/// These match the Insight `addrs/txs` format so clients can consume them transparently.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Form or query fields of /api/addrs/txs
#[derive(Debug, Clone, Deserialize)]
pub struct AddrsTxsRequest {
    /// Comma-separated address list
    #[serde(default)]
    pub addrs: String,
    #[serde(default)]
    pub from: u64,
    #[serde(default)]
    pub to: u64,
}

impl AddrsTxsRequest {
    pub fn addresses(&self) -> Vec<&str> {
        self.addrs
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect()
    }
}

/// Response from /api/addrs/txs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddrsTxsResponse {
    pub total_items: u64,
    pub from: u64,
    pub to: u64,
    /// Always empty; the mock tracks counts, not transactions
    pub items: Vec<serde_json::Value>,
}

// ============================================================================
// MOCK CONTROL TYPES (not part of the Insight API)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActivityRequest {
    /// Address -> number of transactions touching it
    pub activity: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActivityResponse {
    pub updated: usize,
    pub known_addresses: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestStats {
    pub served: u64,
}
