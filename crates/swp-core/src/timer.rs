//! Retransmission and delayed-acknowledgment timers.
//!
//! The manager never fires anything itself: it records which timers are live and
//! asks a [`TimerService`] to push the expiry event into the engine's event
//! stream. Each arm stamps a fresh generation, so an expiry that was cancelled or
//! superseded (including one for a slot since reused by a newer sequence number)
//! is recognised when it arrives and dropped.

use swp_abstract::seq::{SeqNr, slot};
use swp_abstract::{Event, NR_BUFS, ProtocolConfig, TimerKey, TimerService};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArmedFrame {
    seq: SeqNr,
    generation: u64,
}

#[derive(Debug)]
pub struct TimerManager {
    frame_timeout_ms: u64,
    ack_timeout_ms: u64,
    frames: [Option<ArmedFrame>; NR_BUFS],
    ack: Option<u64>,
    next_generation: u64,
}

impl TimerManager {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            frame_timeout_ms: config.frame_timeout_ms,
            ack_timeout_ms: config.ack_timeout_ms,
            frames: [None; NR_BUFS],
            ack: None,
            next_generation: 1,
        }
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Arm the retransmission timer for `seq`, replacing whatever held its slot.
    pub fn start<S: TimerService + ?Sized>(&mut self, seq: SeqNr, svc: &mut S) {
        self.stop(seq, svc);
        let generation = self.bump();
        let i = slot(seq);
        self.frames[i] = Some(ArmedFrame { seq, generation });
        svc.schedule(
            TimerKey::Frame(i),
            self.frame_timeout_ms,
            Event::Timeout { seq, generation },
        );
    }

    pub fn stop<S: TimerService + ?Sized>(&mut self, seq: SeqNr, svc: &mut S) {
        let i = slot(seq);
        if self.frames[i].take().is_some() {
            svc.cancel(TimerKey::Frame(i));
        }
    }

    pub fn start_ack_timer<S: TimerService + ?Sized>(&mut self, svc: &mut S) {
        self.stop_ack_timer(svc);
        let generation = self.bump();
        self.ack = Some(generation);
        svc.schedule(
            TimerKey::Ack,
            self.ack_timeout_ms,
            Event::AckTimeout { generation },
        );
    }

    pub fn stop_ack_timer<S: TimerService + ?Sized>(&mut self, svc: &mut S) {
        if self.ack.take().is_some() {
            svc.cancel(TimerKey::Ack);
        }
    }

    /// Consume a frame-timer expiry. Returns `true` only if it belongs to the
    /// live timer for `seq`, which is then disarmed.
    pub fn fire_frame(&mut self, seq: SeqNr, generation: u64) -> bool {
        let i = slot(seq);
        let live = matches!(
            self.frames[i],
            Some(armed) if armed.seq == seq && armed.generation == generation
        );
        if live {
            self.frames[i] = None;
            true
        } else {
            debug!(
                "Dropping stale frame timeout seq={} generation={}",
                seq, generation
            );
            false
        }
    }

    pub fn fire_ack(&mut self, generation: u64) -> bool {
        let live = self.ack == Some(generation);
        if live {
            self.ack = None;
            true
        } else {
            debug!("Dropping stale ack timeout generation={}", generation);
            false
        }
    }

    pub fn is_running(&self, seq: SeqNr) -> bool {
        matches!(self.frames[slot(seq)], Some(armed) if armed.seq == seq)
    }

    pub fn ack_timer_running(&self) -> bool {
        self.ack.is_some()
    }

    pub fn running_count(&self) -> usize {
        self.frames.iter().flatten().count()
    }
}
