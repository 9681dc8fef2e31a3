use crate::config::{ProtocolConfig, SimConfig};
use crate::packet::FrameKind;
use crate::seq::SeqNr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two protocol stations attached to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationId {
    A,
    B,
}

impl StationId {
    pub fn peer(&self) -> Self {
        match self {
            StationId::A => StationId::B,
            StationId::B => StationId::A,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            StationId::A => 0,
            StationId::B => 1,
        }
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationId::A => f.write_str("A"),
            StationId::B => f.write_str("B"),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: SimConfigOverride,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimConfigOverride {
    pub loss_rate: Option<f64>,
    pub corrupt_rate: Option<f64>,
    pub min_latency: Option<u64>,
    pub max_latency: Option<u64>,
    pub seed: Option<u64>,
    pub frame_timeout_ms: Option<u64>,
    pub ack_timeout_ms: Option<u64>,
}

impl SimConfigOverride {
    pub fn apply_to(&self, config: &mut SimConfig) {
        if let Some(v) = self.loss_rate {
            config.loss_rate = v;
        }
        if let Some(v) = self.corrupt_rate {
            config.corrupt_rate = v;
        }
        if let Some(v) = self.min_latency {
            config.min_latency = v;
        }
        if let Some(v) = self.max_latency {
            config.max_latency = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
    }

    pub fn apply_to_protocol(&self, config: &mut ProtocolConfig) {
        if let Some(v) = self.frame_timeout_ms {
            config.frame_timeout_ms = v;
        }
        if let Some(v) = self.ack_timeout_ms {
            config.ack_timeout_ms = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAction {
    /// Upper layer of `station` submits data at a specific time
    AppSend {
        time: u64,
        station: StationId,
        data: String,
    },
    /// Drop the first frame of `kind` sent by `from` whose seq matches (ack for ACK/NAK)
    DropNext {
        from: StationId,
        kind: FrameKind,
        seq: SeqNr,
    },
    /// Corrupt the first matching frame so it arrives as a checksum error
    CorruptNext {
        from: StationId,
        kind: FrameKind,
        seq: SeqNr,
    },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// `station` delivered exactly this sequence of payloads, in order
    DeliveredInOrder {
        station: StationId,
        data: Vec<String>,
    },
    /// `station` delivered this payload at some point
    DataDelivered { station: StationId, data: String },
    /// Number of frames of `kind` sent by `from` is within range
    FrameCount {
        from: StationId,
        kind: FrameKind,
        min: u32,
        max: Option<u32>,
    },
    /// Simulation finishes within time
    MaxDuration { ms: u64 },
}
