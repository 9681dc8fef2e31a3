use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use swp_abstract::seq::SeqNr;
use swp_abstract::{FrameKind, Packet, ProtocolConfig, SimConfig, StationId};
use swp_core::{EngineStats, WindowState};

/// One entry of the link timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceRecord {
    Sent {
        time: u64,
        from: StationId,
        kind: FrameKind,
        seq: SeqNr,
        ack: SeqNr,
        latency: u64,
    },
    Dropped {
        time: u64,
        from: StationId,
        kind: FrameKind,
        seq: SeqNr,
        ack: SeqNr,
        deterministic: bool,
    },
    Corrupted {
        time: u64,
        from: StationId,
        kind: FrameKind,
        seq: SeqNr,
        ack: SeqNr,
    },
    Delivered {
        time: u64,
        station: StationId,
        bytes: usize,
    },
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceRecord::Sent {
                time,
                from,
                kind,
                seq,
                ack,
                latency,
            } => write!(
                f,
                "{:>6} [{}->{}] SEND {} seq={} ack={} (latency={}ms)",
                time,
                from,
                from.peer(),
                kind,
                seq,
                ack,
                latency
            ),
            TraceRecord::Dropped {
                time,
                from,
                kind,
                seq,
                ack,
                deterministic,
            } => write!(
                f,
                "{:>6} [{}->{}] DROP {} seq={} ack={}{}",
                time,
                from,
                from.peer(),
                kind,
                seq,
                ack,
                if *deterministic { " (scripted)" } else { "" }
            ),
            TraceRecord::Corrupted {
                time,
                from,
                kind,
                seq,
                ack,
            } => write!(
                f,
                "{:>6} [{}->{}] CORRUPT {} seq={} ack={}",
                time,
                from,
                from.peer(),
                kind,
                seq,
                ack
            ),
            TraceRecord::Delivered {
                time,
                station,
                bytes,
            } => write!(f, "{:>6} [{}] DELIVERED {} bytes", time, station, bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FrameCounts {
    pub data: u32,
    pub ack: u32,
    pub nak: u32,
}

impl FrameCounts {
    pub fn record(&mut self, kind: FrameKind) {
        match kind {
            FrameKind::Data => self.data += 1,
            FrameKind::Ack => self.ack += 1,
            FrameKind::Nak => self.nak += 1,
        }
    }

    pub fn get(&self, kind: FrameKind) -> u32 {
        match kind {
            FrameKind::Data => self.data,
            FrameKind::Ack => self.ack,
            FrameKind::Nak => self.nak,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    pub station: StationId,
    pub delivered: Vec<Packet>,
    pub frames_sent: FrameCounts,
    pub engine: EngineStats,
    pub window: WindowState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub config: SimConfig,
    pub protocol: ProtocolConfig,
    pub duration_ms: u64,
    pub stations: Vec<StationReport>,
    pub metrics: HashMap<String, Vec<(u64, f64)>>,
    pub trace: Vec<TraceRecord>,
}

impl SimulationReport {
    pub fn station(&self, id: StationId) -> &StationReport {
        &self.stations[id.index()]
    }
}
