use serde::{Deserialize, Serialize};

use crate::seq::SeqNr;

/// Something the protocol engine must react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The upper layer has a payload ready and credit to send it.
    NetworkLayerReady,
    /// A frame arrived intact; fetch it from the physical layer.
    FrameArrival,
    /// A frame arrived but failed its checksum.
    CksumErr,
    /// Retransmission timer for `seq` expired.
    Timeout { seq: SeqNr, generation: u64 },
    /// Delayed-acknowledgment timer expired.
    AckTimeout { generation: u64 },
    /// Event the source could not classify, by its raw code.
    Undefined { code: u32 },
}
