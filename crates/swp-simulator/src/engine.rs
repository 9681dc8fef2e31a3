use crate::channel::WireFrame;
use crate::trace::{FrameCounts, SimulationReport, StationReport, TraceRecord};
use rand::Rng;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use swp_abstract::seq::SeqNr;
use swp_abstract::{
    Event as ProtocolEvent, Frame, FrameKind, NetworkLayer, Packet, PhysicalLayer, ProtocolConfig,
    SimConfig, StationId, TimerKey, TimerService,
};
use swp_core::Swp;
use tracing::{debug, info};

#[derive(Debug)]
pub enum EventType {
    FrameArrival {
        to: StationId,
        wire: WireFrame,
    },
    /// An event for a station's engine (timer expiry, network layer ready).
    Protocol {
        station: StationId,
        event: ProtocolEvent,
    },
    AppSend {
        station: StationId,
        data: Packet,
    },
}

#[derive(Debug)]
struct Event {
    time: u64,
    event_type: EventType,
    id: u64, // Unique ID to differentiate events at same time
}

// Custom Ord for Min-Heap (smallest time pops first)
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse comparison for time: smallest time is Greater in BinaryHeap
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// One-shot fault matching the first frame of `kind` from `from` whose
/// sequence number (DATA) or ack number (ACK/NAK) equals `seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRule {
    pub from: StationId,
    pub kind: FrameKind,
    pub seq: SeqNr,
}

impl FrameRule {
    fn matches(&self, from: StationId, frame: &Frame) -> bool {
        if self.from != from || self.kind != frame.kind {
            return false;
        }
        match frame.kind {
            FrameKind::Data => frame.seq == self.seq,
            FrameKind::Ack | FrameKind::Nak => frame.ack == self.seq,
        }
    }
}

/// Actions buffered while an engine handles one event
#[derive(Default)]
struct ActionBuffer {
    outgoing_frames: Vec<Frame>,
    timers_start: Vec<(u64, ProtocolEvent)>,
    delivered: Vec<Packet>,
    credit: usize,
    pulled: usize,
}

/// Context handed to an engine for the duration of one event
struct ScopedContext<'a> {
    buffer: &'a mut ActionBuffer,
    outbox: &'a mut VecDeque<Packet>,
    arrival: Option<Frame>,
}

impl NetworkLayer for ScopedContext<'_> {
    fn from_network_layer(&mut self) -> Option<Packet> {
        let packet = self.outbox.pop_front()?;
        self.buffer.pulled += 1;
        Some(packet)
    }

    fn to_network_layer(&mut self, packet: Packet) {
        self.buffer.delivered.push(packet);
    }

    fn grant_credit(&mut self, credit: usize) {
        self.buffer.credit += credit;
    }
}

impl PhysicalLayer for ScopedContext<'_> {
    fn to_physical_layer(&mut self, frame: Frame) {
        self.buffer.outgoing_frames.push(frame);
    }

    fn from_physical_layer(&mut self) -> Option<Frame> {
        self.arrival.take()
    }
}

impl TimerService for ScopedContext<'_> {
    // Cancelled timers still pop from the queue; the engine recognises them
    // as stale by generation.
    fn schedule(&mut self, _key: TimerKey, delay_ms: u64, expiry: ProtocolEvent) {
        self.buffer.timers_start.push((delay_ms, expiry));
    }
}

struct StationState {
    id: StationId,
    engine: Swp,
    /// Payloads submitted by the upper layer, not yet pulled by the engine
    outbox: VecDeque<Packet>,
    credit: usize,
    /// NETWORK_LAYER_READY events queued but not yet consumed
    announced: usize,
    delivered: Vec<Packet>,
    frames_sent: FrameCounts,
}

impl StationState {
    fn new(id: StationId, protocol: &ProtocolConfig) -> Self {
        Self {
            id,
            engine: Swp::new(id.to_string(), protocol),
            outbox: VecDeque::new(),
            credit: 0,
            announced: 0,
            delivered: Vec::new(),
            frames_sent: FrameCounts::default(),
        }
    }
}

pub struct Simulator {
    time: u64,
    event_queue: BinaryHeap<Event>,
    event_id_counter: u64,

    config: SimConfig,
    protocol: ProtocolConfig,
    rng: rand::rngs::StdRng,

    stations: [StationState; 2],

    /// Latest scheduled arrival per destination station. The link is FIFO:
    /// a frame never overtakes one sent before it in the same direction.
    last_arrival: [u64; 2],

    drop_once: Vec<FrameRule>,
    corrupt_once: Vec<FrameRule>,

    /// Arbitrary time-series metrics, keyed by name (e.g. "A.outstanding")
    pub metrics: HashMap<String, Vec<(u64, f64)>>,

    /// Timeline of link events (sends, drops, corruptions, deliveries).
    pub trace: Vec<TraceRecord>,
}

impl Simulator {
    pub fn new(config: SimConfig, protocol: ProtocolConfig) -> Self {
        use rand::SeedableRng;
        let rng = rand::rngs::StdRng::seed_from_u64(config.seed);

        Self {
            time: 0,
            event_queue: BinaryHeap::new(),
            event_id_counter: 0,
            stations: [
                StationState::new(StationId::A, &protocol),
                StationState::new(StationId::B, &protocol),
            ],
            config,
            protocol,
            rng,
            last_arrival: [0; 2],
            drop_once: Vec::new(),
            corrupt_once: Vec::new(),
            metrics: HashMap::new(),
            trace: Vec::new(),
        }
    }

    /// Register a deterministic fault: drop the first frame matching `rule`.
    pub fn add_drop_next(&mut self, rule: FrameRule) {
        self.drop_once.push(rule);
    }

    /// Register a deterministic fault: corrupt the first frame matching `rule`.
    pub fn add_corrupt_next(&mut self, rule: FrameRule) {
        self.corrupt_once.push(rule);
    }

    pub fn engine(&self, station: StationId) -> &Swp {
        &self.stations[station.index()].engine
    }

    pub fn delivered(&self, station: StationId) -> &[Packet] {
        &self.stations[station.index()].delivered
    }

    pub fn frames_sent(&self, station: StationId) -> FrameCounts {
        self.stations[station.index()].frames_sent
    }

    pub fn metric_series(&self, name: &str) -> Option<&[(u64, f64)]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    fn push_event(&mut self, time: u64, event_type: EventType) {
        self.event_queue.push(Event {
            time,
            event_type,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    pub fn schedule_app_send(&mut self, time: u64, station: StationId, data: impl Into<Packet>) {
        self.push_event(
            time,
            EventType::AppSend {
                station,
                data: data.into(),
            },
        );
    }

    /// Start both engines: each grants its upper layer a full window of credit.
    pub fn init(&mut self) {
        for id in [StationId::A, StationId::B] {
            let mut buffer = ActionBuffer::default();
            {
                let state = &mut self.stations[id.index()];
                let mut ctx = ScopedContext {
                    buffer: &mut buffer,
                    outbox: &mut state.outbox,
                    arrival: None,
                };
                state.engine.start(&mut ctx);
            }
            self.process_actions(id, buffer);
        }
    }

    pub fn peek_next_event_time(&self) -> Option<u64> {
        self.event_queue.peek().map(|e| e.time)
    }

    pub fn current_time(&self) -> u64 {
        self.time
    }

    /// Process the next event. Returns true if an event was processed, false if queue is empty.
    pub fn step(&mut self) -> bool {
        let event = match self.event_queue.pop() {
            Some(e) => e,
            None => return false,
        };

        self.time = event.time;
        debug!("Processing event at {}: {:?}", self.time, event.event_type);

        match event.event_type {
            EventType::FrameArrival { to, wire } => match wire.open() {
                Some(frame) => self.dispatch(to, ProtocolEvent::FrameArrival, Some(frame)),
                None => self.dispatch(to, ProtocolEvent::CksumErr, None),
            },
            EventType::Protocol { station, event } => {
                if event == ProtocolEvent::NetworkLayerReady {
                    let state = &mut self.stations[station.index()];
                    state.announced = state.announced.saturating_sub(1);
                }
                self.dispatch(station, event, None);
            }
            EventType::AppSend { station, data } => {
                self.stations[station.index()].outbox.push_back(data);
                self.announce(station);
            }
        }
        true
    }

    fn dispatch(&mut self, station: StationId, event: ProtocolEvent, arrival: Option<Frame>) {
        let mut buffer = ActionBuffer::default();
        {
            let state = &mut self.stations[station.index()];
            let mut ctx = ScopedContext {
                buffer: &mut buffer,
                outbox: &mut state.outbox,
                arrival,
            };
            state.engine.handle_event(event, &mut ctx);
        }
        self.process_actions(station, buffer);
    }

    /// Raise NETWORK_LAYER_READY once per credit unit per waiting payload.
    fn announce(&mut self, station: StationId) {
        let now = self.time;
        let mut ready = 0;
        {
            let state = &mut self.stations[station.index()];
            while state.credit > 0 && state.announced < state.outbox.len() {
                state.credit -= 1;
                state.announced += 1;
                ready += 1;
            }
        }
        for _ in 0..ready {
            self.push_event(
                now,
                EventType::Protocol {
                    station,
                    event: ProtocolEvent::NetworkLayerReady,
                },
            );
        }
    }

    /// Produce a serializable snapshot of the current simulation state.
    pub fn export_report(&self) -> SimulationReport {
        SimulationReport {
            config: self.config.clone(),
            protocol: self.protocol.clone(),
            duration_ms: self.time,
            stations: self
                .stations
                .iter()
                .map(|s| StationReport {
                    station: s.id,
                    delivered: s.delivered.clone(),
                    frames_sent: s.frames_sent,
                    engine: s.engine.stats().clone(),
                    window: s.engine.window(),
                })
                .collect(),
            metrics: self.metrics.clone(),
            trace: self.trace.clone(),
        }
    }

    pub fn run_until_complete(&mut self) {
        self.init();
        while self.step() {}
    }

    /// Start and run until the queue drains or virtual time passes `max_time`.
    /// Returns `true` if the queue drained.
    pub fn run_until(&mut self, max_time: u64) -> bool {
        self.init();
        while let Some(next) = self.peek_next_event_time() {
            if next > max_time {
                return false;
            }
            self.step();
        }
        true
    }

    fn process_actions(&mut self, source: StationId, buffer: ActionBuffer) {
        let now = self.time;
        let outstanding = self.stations[source.index()].engine.window().outstanding();
        self.metrics
            .entry(format!("{}.outstanding", source))
            .or_default()
            .push((now, outstanding as f64));

        for data in buffer.delivered {
            info!("[{}] DELIVERED DATA: {} bytes", source, data.len());
            self.trace.push(TraceRecord::Delivered {
                time: now,
                station: source,
                bytes: data.len(),
            });
            self.stations[source.index()].delivered.push(data);
        }

        {
            let state = &mut self.stations[source.index()];
            state.credit += buffer.credit;
        }
        self.announce(source);

        for (delay, expiry) in buffer.timers_start {
            self.push_event(
                now + delay,
                EventType::Protocol {
                    station: source,
                    event: expiry,
                },
            );
        }

        // Channel
        for frame in buffer.outgoing_frames {
            self.stations[source.index()].frames_sent.record(frame.kind);

            if let Some(pos) = self
                .drop_once
                .iter()
                .position(|rule| rule.matches(source, &frame))
            {
                debug!("Deterministically dropping {} from {}", frame, source);
                self.drop_once.remove(pos);
                self.trace.push(TraceRecord::Dropped {
                    time: now,
                    from: source,
                    kind: frame.kind,
                    seq: frame.seq,
                    ack: frame.ack,
                    deterministic: true,
                });
                continue;
            }

            // 1. Check Loss
            if self.rng.random::<f64>() < self.config.loss_rate {
                debug!("Frame lost in channel");
                self.trace.push(TraceRecord::Dropped {
                    time: now,
                    from: source,
                    kind: frame.kind,
                    seq: frame.seq,
                    ack: frame.ack,
                    deterministic: false,
                });
                continue;
            }

            let kind = frame.kind;
            let (seq, ack) = (frame.seq, frame.ack);
            let scripted_corruption = self
                .corrupt_once
                .iter()
                .position(|rule| rule.matches(source, &frame));
            let mut wire = WireFrame::seal(frame);

            // 2. Check Corruption
            let corrupt = match scripted_corruption {
                Some(pos) => {
                    self.corrupt_once.remove(pos);
                    true
                }
                None => self.rng.random::<f64>() < self.config.corrupt_rate,
            };
            if corrupt {
                debug!("Frame corrupted in channel");
                wire.corrupt();
                self.trace.push(TraceRecord::Corrupted {
                    time: now,
                    from: source,
                    kind,
                    seq,
                    ack,
                });
            }

            // 3. Calculate Latency, queued behind earlier frames to the same peer
            let to = source.peer();
            let max_latency = self.config.max_latency.max(self.config.min_latency);
            let sampled = self.rng.random_range(self.config.min_latency..=max_latency);
            let arrival = (now + sampled).max(self.last_arrival[to.index()]);
            self.last_arrival[to.index()] = arrival;
            let latency = arrival - now;

            self.trace.push(TraceRecord::Sent {
                time: now,
                from: source,
                kind,
                seq,
                ack,
                latency,
            });

            self.push_event(arrival, EventType::FrameArrival { to, wire });
        }
    }
}
