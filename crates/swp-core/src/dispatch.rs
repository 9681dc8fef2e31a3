//! Frame assembly toward, and retrieval from, the physical layer.

use swp_abstract::seq::{MAX_SEQ, SeqNr};
use swp_abstract::{Frame, FrameKind, Packet, PhysicalLayer};
use tracing::{debug, warn};

/// Cumulative acknowledgment for a receiver expecting `frame_expected`:
/// the sequence number just before it.
#[inline]
pub fn piggyback_ack(frame_expected: SeqNr) -> SeqNr {
    (frame_expected + MAX_SEQ) % (MAX_SEQ + 1)
}

/// Build an outbound frame. `info` is only attached to DATA frames.
pub fn outbound(kind: FrameKind, seq: SeqNr, frame_expected: SeqNr, info: Option<Packet>) -> Frame {
    Frame {
        kind,
        seq,
        ack: piggyback_ack(frame_expected),
        info: if kind == FrameKind::Data { info } else { None },
    }
}

pub fn emit<P: PhysicalLayer + ?Sized>(name: &str, phys: &mut P, frame: Frame) {
    debug!("[{}] Sending frame: {}", name, frame);
    phys.to_physical_layer(frame);
}

/// Fetch the frame behind a FRAME_ARRIVAL. Frames whose `seq` or `ack` lie
/// outside the sequence space are discarded.
pub fn inbound<P: PhysicalLayer + ?Sized>(name: &str, phys: &mut P) -> Option<Frame> {
    let Some(frame) = phys.from_physical_layer() else {
        warn!("[{}] frame arrival signalled but no frame available", name);
        return None;
    };
    if frame.seq > MAX_SEQ || frame.ack > MAX_SEQ {
        warn!("[{}] discarding frame outside sequence space: {}", name, frame);
        return None;
    }
    debug!("[{}] Received frame: {}", name, frame);
    Some(frame)
}
