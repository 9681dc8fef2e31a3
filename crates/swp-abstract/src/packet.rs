use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::seq::SeqNr;

/// One unit of upper-layer data. Opaque to the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Packet {
    pub data: Bytes,
}

impl Packet {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<&'static str> for Packet {
    fn from(s: &'static str) -> Self {
        Self::new(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Packet {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Data,
    Ack,
    Nak,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Data => "DATA",
            FrameKind::Ack => "ACK",
            FrameKind::Nak => "NAK",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transmission unit exchanged between two protocol engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub kind: FrameKind,
    /// Sequence number (meaningful for DATA only)
    pub seq: SeqNr,
    /// Piggybacked cumulative acknowledgment
    pub ack: SeqNr,
    /// Payload, present only for DATA
    pub info: Option<Packet>,
}

impl Frame {
    pub fn data(seq: SeqNr, ack: SeqNr, info: Packet) -> Self {
        Self {
            kind: FrameKind::Data,
            seq,
            ack,
            info: Some(info),
        }
    }

    /// Standalone acknowledgment.
    pub fn ack(ack: SeqNr) -> Self {
        Self {
            kind: FrameKind::Ack,
            seq: 0,
            ack,
            info: None,
        }
    }

    /// Negative acknowledgment requesting retransmission of `ack + 1`.
    pub fn nak(ack: SeqNr) -> Self {
        Self {
            kind: FrameKind::Nak,
            seq: 0,
            ack,
            info: None,
        }
    }

    pub fn payload_len(&self) -> usize {
        self.info.as_ref().map_or(0, Packet::len)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq = {} ack = {} kind = {}", self.seq, self.ack, self.kind)?;
        if let Some(info) = &self.info {
            write!(f, " info = {}", info)?;
        }
        Ok(())
    }
}
