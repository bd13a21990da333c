use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;

/// Remote service reporting whether a set of addresses has any transaction history.
#[async_trait]
pub trait ActivityOracle: Send + Sync {
    /// Number of transactions touching any of `addresses`, queried as one batch.
    async fn query_activity(&self, addresses: &[String]) -> Result<u64, DiscoveryError>;
}

/// Insight API client (`POST /api/addrs/txs`)
pub struct InsightOracle {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddrsTxsResponse {
    total_items: Option<serde_json::Value>,
}

impl InsightOracle {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        Self::new(&config.insight_url, config.oracle_timeout)
    }
}

#[async_trait]
impl ActivityOracle for InsightOracle {
    async fn query_activity(&self, addresses: &[String]) -> Result<u64, DiscoveryError> {
        if addresses.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/api/addrs/txs", self.base_url);
        let joined = addresses.join(",");
        // from=0&to=0 asks only for the total, not the transactions themselves
        let params = [("addrs", joined.as_str()), ("from", "0"), ("to", "0")];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| DiscoveryError::OracleUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::OracleUnavailable(format!(
                "{} returned {}",
                url, status
            )));
        }

        let body: AddrsTxsResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::OracleMalformedResponse(e.to_string()))?;

        let total = body
            .total_items
            .as_ref()
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                DiscoveryError::OracleMalformedResponse(format!(
                    "missing integer totalItems (got {:?})",
                    body.total_items
                ))
            })?;

        log::debug!("Insight: {} addresses -> {} txs", addresses.len(), total);
        Ok(total)
    }
}
