use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Invalid account key: {0}")]
    InvalidAccountKey(String),

    #[error("Address derivation failed: {0}")]
    Derivation(String),

    #[error("Activity oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Malformed oracle response: {0}")]
    OracleMalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiscoveryError {
    /// Whether the error left the account intact so the caller may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DiscoveryError::OracleUnavailable(_) | DiscoveryError::OracleMalformedResponse(_)
        )
    }
}
