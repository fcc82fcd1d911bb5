use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use solana_sdk::commitment_config::CommitmentConfig;
use tracing::warn;

use crate::constants::DEFAULT_COMMITMENT;
use crate::constants::DEFAULT_MIN_CALL_INTERVAL_MS;
use crate::constants::DEFAULT_RPC_TIMEOUT_MS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub commitment: String,
    pub timeout_ms: u64,
    /// Minimum spacing between two calls on one connection.
    pub min_call_interval_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            commitment: DEFAULT_COMMITMENT.to_string(),
            timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            min_call_interval_ms: DEFAULT_MIN_CALL_INTERVAL_MS,
        }
    }
}

impl RpcConfig {
    pub fn commitment_config(&self) -> CommitmentConfig {
        match self.commitment.to_ascii_lowercase().as_str() {
            "processed" => CommitmentConfig::processed(),
            "confirmed" => CommitmentConfig::confirmed(),
            "finalized" => CommitmentConfig::finalized(),
            other => {
                warn!("unknown_commitment::{}::falling_back_to::confirmed", other);
                CommitmentConfig::confirmed()
            },
        }
    }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

    pub fn min_call_interval(&self) -> Duration { Duration::from_millis(self.min_call_interval_ms) }
}
