//! What actually crosses the simulated wire: a frame plus its checksum.

use swp_abstract::{Frame, FrameKind};

/// 16-bit Internet checksum (ones' complement of the ones' complement sum).
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);

    for chunk in &mut chunks {
        let value = u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
        sum = sum.wrapping_add(value);
    }

    if let Some(&byte) = chunks.remainder().first() {
        sum = sum.wrapping_add((byte as u32) << 8);
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

fn kind_byte(kind: FrameKind) -> u8 {
    match kind {
        FrameKind::Data => 0,
        FrameKind::Ack => 1,
        FrameKind::Nak => 2,
    }
}

pub fn frame_checksum(frame: &Frame) -> u16 {
    let mut buf = Vec::with_capacity(9 + frame.payload_len());
    buf.push(kind_byte(frame.kind));
    buf.extend_from_slice(&frame.seq.to_be_bytes());
    buf.extend_from_slice(&frame.ack.to_be_bytes());
    if let Some(info) = &frame.info {
        buf.extend_from_slice(info.as_bytes());
    }
    internet_checksum(&buf)
}

#[derive(Debug, Clone)]
pub struct WireFrame {
    pub frame: Frame,
    pub checksum: u16,
}

impl WireFrame {
    pub fn seal(frame: Frame) -> Self {
        let checksum = frame_checksum(&frame);
        Self { frame, checksum }
    }

    /// Damage the frame in transit.
    pub fn corrupt(&mut self) {
        self.checksum = !self.checksum;
    }

    /// The frame, if it survived the trip intact.
    pub fn open(self) -> Option<Frame> {
        (frame_checksum(&self.frame) == self.checksum).then_some(self.frame)
    }
}
