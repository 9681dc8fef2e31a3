//! Selective-repeat sliding window engine.
//!
//! One [`Swp`] instance runs both directions of a full-duplex link: it assigns
//! sequence numbers to outbound payloads, buffers them until acknowledged, and
//! buffers out-of-order inbound frames until they can be delivered in order.
//! All state is owned here and mutated only from [`Swp::handle_event`].

use serde::Serialize;
use std::array;
use std::convert::Infallible;
use swp_abstract::seq::{NR_BUFS, SeqNr, between, distance, inc, slot};
use swp_abstract::{Environment, Event, EventSource, Frame, FrameKind, Packet, ProtocolConfig};
use tracing::{debug, info, warn};

use crate::dispatch;
use crate::error::Result;
use crate::timer::TimerManager;

/// Snapshot of the window pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowState {
    pub ack_expected: SeqNr,
    pub next_frame_to_send: SeqNr,
    pub frame_expected: SeqNr,
    pub too_far: SeqNr,
    pub no_nak: bool,
}

impl WindowState {
    /// Frames sent but not yet acknowledged.
    pub fn outstanding(&self) -> usize {
        distance(self.ack_expected, self.next_frame_to_send) as usize
    }

    /// Width of the receive window; always `NR_BUFS`.
    pub fn receive_span(&self) -> usize {
        distance(self.frame_expected, self.too_far) as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub data_sent: u64,
    pub retransmissions: u64,
    pub naks_sent: u64,
    pub acks_sent: u64,
    pub delivered: u64,
    pub credit_granted: u64,
    pub stale_timeouts: u64,
    pub rejected_frames: u64,
    pub undefined_events: u64,
}

pub struct Swp {
    name: String,

    // Sender side
    ack_expected: SeqNr,
    next_frame_to_send: SeqNr,
    out_buf: [Option<Packet>; NR_BUFS],

    // Receiver side
    frame_expected: SeqNr,
    too_far: SeqNr,
    in_buf: [Option<Packet>; NR_BUFS],
    arrived: [bool; NR_BUFS],
    no_nak: bool,

    timers: TimerManager,
    stats: EngineStats,
}

impl Swp {
    pub fn new(name: impl Into<String>, config: &ProtocolConfig) -> Self {
        Self {
            name: name.into(),
            ack_expected: 0,
            next_frame_to_send: 0,
            out_buf: array::from_fn(|_| None),
            frame_expected: 0,
            too_far: NR_BUFS as SeqNr,
            in_buf: array::from_fn(|_| None),
            arrived: [false; NR_BUFS],
            no_nak: true,
            timers: TimerManager::new(config),
            stats: EngineStats::default(),
        }
    }

    pub fn window(&self) -> WindowState {
        WindowState {
            ack_expected: self.ack_expected,
            next_frame_to_send: self.next_frame_to_send,
            frame_expected: self.frame_expected,
            too_far: self.too_far,
            no_nak: self.no_nak,
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    /// Open the send window: the upper layer may submit a full window of payloads.
    pub fn start<E: Environment + ?Sized>(&mut self, env: &mut E) {
        info!("[{}] protocol started, window = {}", self.name, NR_BUFS);
        self.enable_network_layer(NR_BUFS, env);
    }

    /// Start, then consume events until the source fails. Never returns `Ok`.
    pub fn run<E: Environment + EventSource + ?Sized>(&mut self, env: &mut E) -> Result<Infallible> {
        self.start(env);
        loop {
            let event = env.wait_for_event()?;
            self.handle_event(event, env);
        }
    }

    /// Process exactly one event to completion.
    pub fn handle_event<E: Environment + ?Sized>(&mut self, event: Event, env: &mut E) {
        debug!("[{}] event {:?}", self.name, event);
        match event {
            Event::NetworkLayerReady => self.on_network_layer_ready(env),
            Event::FrameArrival => match dispatch::inbound(&self.name, env) {
                Some(frame) => self.on_frame(frame, env),
                None => self.stats.rejected_frames += 1,
            },
            Event::CksumErr => {
                if self.no_nak {
                    self.send_frame(FrameKind::Nak, 0, env);
                }
            }
            Event::Timeout { seq, generation } => {
                if self.timers.fire_frame(seq, generation) {
                    debug!("[{}] timeout, retransmitting seq {}", self.name, seq);
                    self.stats.retransmissions += 1;
                    self.send_frame(FrameKind::Data, seq, env);
                } else {
                    self.stats.stale_timeouts += 1;
                }
            }
            Event::AckTimeout { generation } => {
                if self.timers.fire_ack(generation) {
                    self.send_frame(FrameKind::Ack, 0, env);
                } else {
                    self.stats.stale_timeouts += 1;
                }
            }
            Event::Undefined { code } => {
                warn!("[{}] undefined event type = {}", self.name, code);
                self.stats.undefined_events += 1;
            }
        }
    }

    fn enable_network_layer<E: Environment + ?Sized>(&mut self, credit: usize, env: &mut E) {
        self.stats.credit_granted += credit as u64;
        env.grant_credit(credit);
    }

    fn on_network_layer_ready<E: Environment + ?Sized>(&mut self, env: &mut E) {
        if self.window().outstanding() >= NR_BUFS {
            warn!(
                "[{}] network layer ready with a full send window, ignoring",
                self.name
            );
            return;
        }
        let Some(packet) = env.from_network_layer() else {
            warn!("[{}] network layer ready but no payload available", self.name);
            return;
        };
        self.out_buf[slot(self.next_frame_to_send)] = Some(packet);
        self.stats.data_sent += 1;
        self.send_frame(FrameKind::Data, self.next_frame_to_send, env);
        self.next_frame_to_send = inc(self.next_frame_to_send);
    }

    fn on_frame<E: Environment + ?Sized>(&mut self, frame: Frame, env: &mut E) {
        let Frame {
            kind,
            seq,
            ack,
            info,
        } = frame;

        if kind == FrameKind::Data {
            match info {
                Some(info) => self.on_data(seq, info, env),
                // The piggybacked ack below is still honoured.
                None => {
                    warn!("[{}] DATA frame seq {} without payload, dropped", self.name, seq);
                    self.stats.rejected_frames += 1;
                }
            }
        }

        if kind == FrameKind::Nak {
            let wanted = inc(ack);
            if between(self.ack_expected, wanted, self.next_frame_to_send) {
                debug!("[{}] NAK, fast retransmit of seq {}", self.name, wanted);
                self.stats.retransmissions += 1;
                self.send_frame(FrameKind::Data, wanted, env);
            }
        }

        while between(self.ack_expected, ack, self.next_frame_to_send) {
            self.timers.stop(self.ack_expected, env);
            self.out_buf[slot(self.ack_expected)] = None;
            self.ack_expected = inc(self.ack_expected);
            self.enable_network_layer(1, env);
        }
    }

    fn on_data<E: Environment + ?Sized>(&mut self, seq: SeqNr, info: Packet, env: &mut E) {
        let in_window = between(self.frame_expected, seq, self.too_far);

        // Only a gap inside the receive window is worth a NAK; duplicates and
        // frames beyond the window just get the delayed ACK.
        if in_window && seq != self.frame_expected && self.no_nak {
            self.send_frame(FrameKind::Nak, 0, env);
        } else {
            self.timers.start_ack_timer(env);
        }

        let i = slot(seq);
        if !in_window || self.arrived[i] {
            debug!(
                "[{}] discarding seq {} (expecting {}..{})",
                self.name, seq, self.frame_expected, self.too_far
            );
            self.stats.rejected_frames += 1;
            return;
        }

        self.arrived[i] = true;
        self.in_buf[i] = Some(info);

        while self.arrived[slot(self.frame_expected)] {
            let i = slot(self.frame_expected);
            if let Some(packet) = self.in_buf[i].take() {
                info!(
                    "[{}] delivering seq {} ({} bytes)",
                    self.name,
                    self.frame_expected,
                    packet.len()
                );
                self.stats.delivered += 1;
                env.to_network_layer(packet);
            }
            self.no_nak = true;
            self.arrived[i] = false;
            self.frame_expected = inc(self.frame_expected);
            self.too_far = inc(self.too_far);
            self.timers.start_ack_timer(env);
        }
    }

    fn send_frame<E: Environment + ?Sized>(&mut self, kind: FrameKind, frame_nr: SeqNr, env: &mut E) {
        let info = match kind {
            FrameKind::Data => match &self.out_buf[slot(frame_nr)] {
                Some(packet) => Some(packet.clone()),
                None => {
                    warn!("[{}] no buffered payload for seq {}", self.name, frame_nr);
                    return;
                }
            },
            FrameKind::Ack | FrameKind::Nak => None,
        };

        let frame = dispatch::outbound(kind, frame_nr, self.frame_expected, info);
        match kind {
            FrameKind::Nak => {
                self.no_nak = false;
                self.stats.naks_sent += 1;
            }
            FrameKind::Ack => self.stats.acks_sent += 1,
            FrameKind::Data => {}
        }
        dispatch::emit(&self.name, env, frame);

        if kind == FrameKind::Data {
            self.timers.start(frame_nr, env);
        }
        // Every frame carries the cumulative ack.
        self.timers.stop_ack_timer(env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use swp_abstract::{MAX_SEQ, NetworkLayer, PhysicalLayer, TimerKey, TimerService};

    #[derive(Default)]
    struct ScriptedEnv {
        outbox: VecDeque<Packet>,
        arrivals: VecDeque<Frame>,
        sent: Vec<Frame>,
        delivered: Vec<Packet>,
        credit: usize,
        scheduled: Vec<(TimerKey, u64, Event)>,
        cancelled: Vec<TimerKey>,
    }

    impl NetworkLayer for ScriptedEnv {
        fn from_network_layer(&mut self) -> Option<Packet> {
            self.outbox.pop_front()
        }

        fn to_network_layer(&mut self, packet: Packet) {
            self.delivered.push(packet);
        }

        fn grant_credit(&mut self, credit: usize) {
            self.credit += credit;
        }
    }

    impl PhysicalLayer for ScriptedEnv {
        fn to_physical_layer(&mut self, frame: Frame) {
            self.sent.push(frame);
        }

        fn from_physical_layer(&mut self) -> Option<Frame> {
            self.arrivals.pop_front()
        }
    }

    impl TimerService for ScriptedEnv {
        fn schedule(&mut self, key: TimerKey, delay_ms: u64, expiry: Event) {
            self.scheduled.push((key, delay_ms, expiry));
        }

        fn cancel(&mut self, key: TimerKey) {
            self.cancelled.push(key);
        }
    }

    impl ScriptedEnv {
        fn take_sent(&mut self) -> Vec<Frame> {
            std::mem::take(&mut self.sent)
        }

        fn last_timeout_for(&self, seq: SeqNr) -> Event {
            self.scheduled
                .iter()
                .rev()
                .find_map(|(_, _, e)| match e {
                    Event::Timeout { seq: s, .. } if *s == seq => Some(*e),
                    _ => None,
                })
                .expect("no timeout scheduled for seq")
        }

        fn last_ack_timeout(&self) -> Event {
            self.scheduled
                .iter()
                .rev()
                .find_map(|(_, _, e)| match e {
                    Event::AckTimeout { .. } => Some(*e),
                    _ => None,
                })
                .expect("no ack timeout scheduled")
        }
    }

    fn p(s: &'static str) -> Packet {
        Packet::from(s)
    }

    fn started() -> (Swp, ScriptedEnv) {
        let mut swp = Swp::new("test", &ProtocolConfig::default());
        let mut env = ScriptedEnv::default();
        swp.start(&mut env);
        (swp, env)
    }

    fn check_invariants(swp: &Swp) {
        let w = swp.window();
        assert!(w.outstanding() <= NR_BUFS, "send window overflow: {:?}", w);
        assert_eq!(w.receive_span(), NR_BUFS, "receive window drift: {:?}", w);
    }

    fn submit(swp: &mut Swp, env: &mut ScriptedEnv, payloads: &[&'static str]) {
        for payload in payloads {
            env.outbox.push_back(p(payload));
            swp.handle_event(Event::NetworkLayerReady, env);
            check_invariants(swp);
        }
    }

    fn arrive(swp: &mut Swp, env: &mut ScriptedEnv, frame: Frame) {
        env.arrivals.push_back(frame);
        swp.handle_event(Event::FrameArrival, env);
        check_invariants(swp);
    }

    #[test]
    fn start_grants_full_window() {
        let (swp, env) = started();
        assert_eq!(env.credit, NR_BUFS);
        assert_eq!(swp.stats().credit_granted, NR_BUFS as u64);
        check_invariants(&swp);
    }

    #[test]
    fn ready_sends_data_with_piggybacked_ack() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0"]);

        let sent = env.take_sent();
        assert_eq!(sent, vec![Frame::data(0, MAX_SEQ, p("P0"))]);
        assert!(swp.timers().is_running(0));
        assert_eq!(swp.window().next_frame_to_send, 1);
    }

    #[test]
    fn full_send_window_refuses_more() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0", "P1", "P2", "P3"]);
        assert_eq!(swp.window().outstanding(), NR_BUFS);

        env.outbox.push_back(p("P4"));
        swp.handle_event(Event::NetworkLayerReady, &mut env);
        assert_eq!(env.sent.len(), NR_BUFS);
        assert_eq!(env.outbox.len(), 1, "payload must stay with the upper layer");
        check_invariants(&swp);
    }

    #[test]
    fn ready_without_payload_is_ignored() {
        let (mut swp, mut env) = started();
        swp.handle_event(Event::NetworkLayerReady, &mut env);
        assert!(env.sent.is_empty());
        assert_eq!(swp.window().next_frame_to_send, 0);
    }

    #[test]
    fn in_order_data_is_delivered_and_acked_later() {
        let (mut swp, mut env) = started();
        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));

        assert_eq!(env.delivered, vec![p("P0")]);
        assert!(env.sent.is_empty(), "ack should be delayed");
        assert!(swp.timers().ack_timer_running());
        assert_eq!(swp.window().frame_expected, 1);
    }

    #[test]
    fn gap_triggers_single_nak_then_drains_in_order() {
        let (mut swp, mut env) = started();
        arrive(&mut swp, &mut env, Frame::data(1, MAX_SEQ, p("P1")));
        assert_eq!(env.take_sent(), vec![Frame::nak(MAX_SEQ)]);
        assert!(!swp.window().no_nak);

        arrive(&mut swp, &mut env, Frame::data(2, MAX_SEQ, p("P2")));
        assert!(env.take_sent().is_empty(), "second NAK in the same episode");
        assert!(swp.timers().ack_timer_running());
        assert!(env.delivered.is_empty());

        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));
        assert_eq!(env.delivered, vec![p("P0"), p("P1"), p("P2")]);
        assert!(swp.window().no_nak);
        assert_eq!(swp.window().frame_expected, 3);
    }

    #[test]
    fn duplicate_is_dropped_without_nak() {
        let (mut swp, mut env) = started();
        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));
        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));

        assert_eq!(env.delivered, vec![p("P0")]);
        assert!(env.sent.is_empty());
        assert_eq!(swp.stats().rejected_frames, 1);
        assert!(swp.timers().ack_timer_running());
    }

    #[test]
    fn duplicate_never_naks_whether_or_not_a_nak_is_pending() {
        let (mut swp, mut env) = started();
        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));
        arrive(&mut swp, &mut env, Frame::data(2, MAX_SEQ, p("P2")));
        assert_eq!(env.take_sent(), vec![Frame::nak(0)]);
        assert!(!swp.window().no_nak);

        // NAK outstanding: the stale copy only re-arms the delayed ack.
        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));
        assert!(env.take_sent().is_empty());
        assert!(swp.timers().ack_timer_running());

        arrive(&mut swp, &mut env, Frame::data(1, MAX_SEQ, p("P1")));
        assert!(swp.window().no_nak);
        assert_eq!(swp.window().frame_expected, 3);

        // Episode over: duplicates still get no NAK and leave the permit intact.
        arrive(&mut swp, &mut env, Frame::data(2, MAX_SEQ, p("P2")));
        arrive(&mut swp, &mut env, Frame::data(1, MAX_SEQ, p("P1")));
        assert!(env.take_sent().is_empty());
        assert!(swp.window().no_nak);
        assert!(swp.timers().ack_timer_running());
        assert_eq!(env.delivered, vec![p("P0"), p("P1"), p("P2")]);
        assert_eq!(swp.stats().naks_sent, 1);
    }

    #[test]
    fn buffered_duplicate_is_not_stored_twice() {
        let (mut swp, mut env) = started();
        arrive(&mut swp, &mut env, Frame::data(2, MAX_SEQ, p("P2")));
        arrive(&mut swp, &mut env, Frame::data(2, MAX_SEQ, p("P2-dup")));
        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));
        arrive(&mut swp, &mut env, Frame::data(1, MAX_SEQ, p("P1")));
        assert_eq!(env.delivered, vec![p("P0"), p("P1"), p("P2")]);
    }

    #[test]
    fn frame_beyond_receive_window_is_dropped() {
        let (mut swp, mut env) = started();
        arrive(&mut swp, &mut env, Frame::data(NR_BUFS as SeqNr, MAX_SEQ, p("far")));
        assert!(env.delivered.is_empty());
        assert!(env.sent.is_empty());
        assert_eq!(swp.stats().rejected_frames, 1);
    }

    #[test]
    fn data_without_payload_still_carries_its_ack() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0", "P1"]);
        env.credit = 0;

        arrive(
            &mut swp,
            &mut env,
            Frame {
                kind: FrameKind::Data,
                seq: 0,
                ack: 1,
                info: None,
            },
        );
        assert!(env.delivered.is_empty());
        assert_eq!(swp.window().frame_expected, 0);
        assert_eq!(swp.stats().rejected_frames, 1);
        assert_eq!(swp.window().ack_expected, 2);
        assert_eq!(env.credit, 2);
    }

    #[test]
    fn frame_outside_sequence_space_is_discarded() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0"]);
        env.take_sent();
        let before = swp.window();

        arrive(&mut swp, &mut env, Frame::data(MAX_SEQ + 2, 0, p("bogus")));
        arrive(&mut swp, &mut env, Frame::ack(MAX_SEQ + 1));
        assert_eq!(swp.window(), before);
        assert!(env.delivered.is_empty());
        assert!(env.sent.is_empty());
        assert_eq!(swp.stats().rejected_frames, 2);
    }

    #[test]
    fn cumulative_ack_advances_and_grants_credit() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0", "P1", "P2"]);
        env.credit = 0;

        arrive(&mut swp, &mut env, Frame::ack(1));
        assert_eq!(swp.window().ack_expected, 2);
        assert_eq!(env.credit, 2);
        assert!(!swp.timers().is_running(0));
        assert!(!swp.timers().is_running(1));
        assert!(swp.timers().is_running(2));
    }

    #[test]
    fn repeated_ack_is_idempotent() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0", "P1"]);
        env.credit = 0;

        arrive(&mut swp, &mut env, Frame::ack(0));
        arrive(&mut swp, &mut env, Frame::ack(0));
        assert_eq!(swp.window().ack_expected, 1);
        assert_eq!(env.credit, 1);
    }

    #[test]
    fn piggybacked_ack_on_data_releases_sender_window() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0"]);
        env.credit = 0;

        arrive(&mut swp, &mut env, Frame::data(0, 0, p("reply")));
        assert_eq!(swp.window().ack_expected, 1);
        assert_eq!(env.credit, 1);
        assert_eq!(env.delivered, vec![p("reply")]);
    }

    #[test]
    fn nak_retransmits_requested_frame_and_acks_once() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0", "P1", "P2"]);
        env.take_sent();
        env.credit = 0;

        // Peer got P0, is missing P1.
        arrive(&mut swp, &mut env, Frame::nak(0));
        assert_eq!(env.take_sent(), vec![Frame::data(1, MAX_SEQ, p("P1"))]);
        assert_eq!(swp.window().ack_expected, 1);
        assert_eq!(env.credit, 1, "NAK ack field must not be counted twice");
        assert_eq!(swp.stats().retransmissions, 1);
    }

    #[test]
    fn nak_outside_send_window_is_ignored() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0"]);
        env.take_sent();

        arrive(&mut swp, &mut env, Frame::nak(4));
        assert!(env.sent.is_empty());
        assert_eq!(swp.window().ack_expected, 0);
    }

    #[test]
    fn checksum_error_naks_once_per_episode() {
        let (mut swp, mut env) = started();
        swp.handle_event(Event::CksumErr, &mut env);
        swp.handle_event(Event::CksumErr, &mut env);
        assert_eq!(env.take_sent(), vec![Frame::nak(MAX_SEQ)]);

        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));
        swp.handle_event(Event::CksumErr, &mut env);
        assert_eq!(env.take_sent(), vec![Frame::nak(0)]);
    }

    #[test]
    fn timeout_retransmits_true_sequence_number() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0", "P1"]);
        env.take_sent();

        let expiry = env.last_timeout_for(1);
        swp.handle_event(expiry, &mut env);
        assert_eq!(env.take_sent(), vec![Frame::data(1, MAX_SEQ, p("P1"))]);
        assert!(swp.timers().is_running(1));

        // The replaced timer's expiry is stale now.
        swp.handle_event(expiry, &mut env);
        assert!(env.sent.is_empty());
        assert_eq!(swp.stats().stale_timeouts, 1);
    }

    #[test]
    fn timeout_after_ack_is_stale() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0"]);
        let expiry = env.last_timeout_for(0);
        arrive(&mut swp, &mut env, Frame::ack(0));
        env.take_sent();

        swp.handle_event(expiry, &mut env);
        assert!(env.sent.is_empty());
    }

    #[test]
    fn reused_slot_timeout_targets_new_occupant() {
        let (mut swp, mut env) = started();
        submit(&mut swp, &mut env, &["P0", "P1", "P2", "P3"]);
        let old = env.last_timeout_for(0);
        arrive(&mut swp, &mut env, Frame::ack(0));
        submit(&mut swp, &mut env, &["P4"]);
        env.take_sent();

        swp.handle_event(old, &mut env);
        assert!(env.sent.is_empty());

        let fresh = env.last_timeout_for(4);
        swp.handle_event(fresh, &mut env);
        assert_eq!(env.take_sent(), vec![Frame::data(4, MAX_SEQ, p("P4"))]);
    }

    #[test]
    fn ack_timeout_sends_standalone_ack() {
        let (mut swp, mut env) = started();
        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));
        arrive(&mut swp, &mut env, Frame::data(1, MAX_SEQ, p("P1")));

        let expiry = env.last_ack_timeout();
        swp.handle_event(expiry, &mut env);
        assert_eq!(env.take_sent(), vec![Frame::ack(1)]);

        swp.handle_event(expiry, &mut env);
        assert!(env.sent.is_empty());
    }

    #[test]
    fn outbound_data_cancels_pending_ack_timer() {
        let (mut swp, mut env) = started();
        arrive(&mut swp, &mut env, Frame::data(0, MAX_SEQ, p("P0")));
        let expiry = env.last_ack_timeout();

        submit(&mut swp, &mut env, &["reply"]);
        assert_eq!(env.take_sent(), vec![Frame::data(0, 0, p("reply"))]);
        assert!(!swp.timers().ack_timer_running());

        swp.handle_event(expiry, &mut env);
        assert!(env.sent.is_empty());
    }

    #[test]
    fn undefined_event_changes_nothing() {
        let (mut swp, mut env) = started();
        let before = swp.window();
        swp.handle_event(Event::Undefined { code: 99 }, &mut env);
        assert_eq!(swp.window(), before);
        assert!(env.sent.is_empty());
        assert_eq!(swp.stats().undefined_events, 1);
    }

    #[test]
    fn windows_wrap_around_sequence_space() {
        let (mut swp, mut env) = started();
        for round in 0..5 {
            let base = (round * 3) as SeqNr;
            for k in 0..3 {
                let seq = (base + k) % (MAX_SEQ + 1);
                env.outbox.push_back(Packet::from(format!("out-{}-{}", round, k).into_bytes()));
                swp.handle_event(Event::NetworkLayerReady, &mut env);
                arrive(
                    &mut swp,
                    &mut env,
                    Frame::data(seq, seq, Packet::from(format!("in-{}-{}", round, k).into_bytes())),
                );
            }
        }
        assert_eq!(env.delivered.len(), 15);
        assert_eq!(swp.window().outstanding(), 0);
        assert_eq!(swp.window().frame_expected, 15 % (MAX_SEQ + 1));
    }
}
