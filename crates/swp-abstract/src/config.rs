use serde::{Deserialize, Serialize};

/// Channel behaviour between the two stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub loss_rate: f64,
    pub corrupt_rate: f64,
    pub min_latency: u64,
    pub max_latency: u64,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            min_latency: 10,
            max_latency: 100,
            seed: 0,
        }
    }
}

/// Protocol timer settings, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Retransmission timeout for an unacknowledged DATA frame
    pub frame_timeout_ms: u64,
    /// How long to wait for reverse traffic before sending a standalone ACK
    pub ack_timeout_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            frame_timeout_ms: 300,
            ack_timeout_ms: 100,
        }
    }
}
