//! Real-time station: one engine on its own thread, fed by a tokio channel.
//!
//! Timers and the link run as tasks on a tokio runtime. They never touch the
//! engine; they only push events into the station's queue, which the engine
//! thread drains one at a time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use swp_abstract::{
    Event, EventSource, Frame, NetworkLayer, Packet, PhysicalLayer, ProtocolConfig, SimConfig,
    SourceError, TimerKey, TimerService,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::engine::{EngineStats, Swp};
use crate::error::EngineError;

#[derive(Debug)]
enum Signal {
    Event(Event),
    Halt,
}

/// Cloneable handle for pushing events into a station's queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: UnboundedSender<Signal>,
}

impl EventSender {
    /// Returns `false` once the consuming side is gone.
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(Signal::Event(event)).is_ok()
    }

    /// Make the station's event source fail with `SourceError::Halted`.
    pub fn halt(&self) {
        let _ = self.tx.send(Signal::Halt);
    }
}

/// Consuming side of a station's event stream.
#[derive(Debug)]
pub struct EventQueue {
    rx: UnboundedReceiver<Signal>,
}

impl EventQueue {
    pub fn new() -> (EventSender, EventQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSender { tx }, EventQueue { rx })
    }
}

impl EventSource for EventQueue {
    fn wait_for_event(&mut self) -> Result<Event, SourceError> {
        match self.rx.blocking_recv() {
            Some(Signal::Event(event)) => Ok(event),
            Some(Signal::Halt) => Err(SourceError::Halted),
            None => Err(SourceError::Closed),
        }
    }
}

/// Timer service backed by sleeping tokio tasks.
pub struct TokioTimers {
    handle: Handle,
    events: EventSender,
    pending: HashMap<TimerKey, JoinHandle<()>>,
}

impl TokioTimers {
    pub fn new(handle: Handle, events: EventSender) -> Self {
        Self {
            handle,
            events,
            pending: HashMap::new(),
        }
    }
}

impl TimerService for TokioTimers {
    fn schedule(&mut self, key: TimerKey, delay_ms: u64, expiry: Event) {
        let events = self.events.clone();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            events.send(expiry);
        });
        if let Some(previous) = self.pending.insert(key, task) {
            previous.abort();
        }
    }

    fn cancel(&mut self, key: TimerKey) {
        if let Some(task) = self.pending.remove(&key) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }
}

/// Sending half of a lossy, delaying link toward the peer station.
pub struct LinkEnd {
    handle: Handle,
    config: SimConfig,
    rng: StdRng,
    peer_events: EventSender,
    peer_frames: UnboundedSender<Frame>,
    /// Deadline of the last frame put on the wire; later frames land after it.
    last_arrival: Option<Instant>,
    pub frames_sent: u64,
    pub frames_lost: u64,
}

impl LinkEnd {
    pub fn new(
        handle: Handle,
        config: SimConfig,
        seed: u64,
        peer_events: EventSender,
        peer_frames: UnboundedSender<Frame>,
    ) -> Self {
        Self {
            handle,
            config,
            rng: StdRng::seed_from_u64(seed),
            peer_events,
            peer_frames,
            last_arrival: None,
            frames_sent: 0,
            frames_lost: 0,
        }
    }

    fn transmit(&mut self, frame: Frame) {
        self.frames_sent += 1;
        if self.rng.random::<f64>() < self.config.loss_rate {
            debug!("link: lost {}", frame);
            self.frames_lost += 1;
            return;
        }
        let corrupted = self.rng.random::<f64>() < self.config.corrupt_rate;
        let latency = self
            .rng
            .random_range(self.config.min_latency..=self.config.max_latency.max(self.config.min_latency));

        let mut deadline = Instant::now() + Duration::from_millis(latency);
        if let Some(last) = self.last_arrival {
            deadline = deadline.max(last + Duration::from_millis(1));
        }
        self.last_arrival = Some(deadline);

        let events = self.peer_events.clone();
        let frames = self.peer_frames.clone();
        self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if corrupted {
                events.send(Event::CksumErr);
            } else if frames.send(frame).is_ok() {
                events.send(Event::FrameArrival);
            }
        });
    }
}

/// Everything one engine needs from the outside world, in real time.
pub struct Station {
    name: String,
    events: EventQueue,
    self_events: EventSender,
    timers: TokioTimers,
    arrivals: UnboundedReceiver<Frame>,
    link: LinkEnd,
    outbox: VecDeque<Packet>,
    credit: usize,
    announced: usize,
    deliveries: UnboundedSender<Packet>,
}

impl Station {
    /// Queue payloads for sending. Call before [`Station::run`].
    pub fn submit(&mut self, packets: impl IntoIterator<Item = Packet>) {
        self.outbox.extend(packets);
    }

    /// Run an engine on this station until halted. Returns the engine's final stats.
    pub fn run(mut self, config: &ProtocolConfig) -> (EngineStats, EngineError) {
        let mut swp = Swp::new(self.name.clone(), config);
        let err = match swp.run(&mut self) {
            Ok(never) => match never {},
            Err(err) => err,
        };
        info!(
            "[{}] stopped: {} (link sent {}, lost {})",
            self.name, err, self.link.frames_sent, self.link.frames_lost
        );
        (swp.stats().clone(), err)
    }

    /// One NETWORK_LAYER_READY per credit unit per waiting payload.
    fn announce(&mut self) {
        while self.credit > 0 && self.announced < self.outbox.len() {
            self.credit -= 1;
            self.announced += 1;
            self.self_events.send(Event::NetworkLayerReady);
        }
    }
}

impl NetworkLayer for Station {
    fn from_network_layer(&mut self) -> Option<Packet> {
        let packet = self.outbox.pop_front()?;
        self.announced = self.announced.saturating_sub(1);
        Some(packet)
    }

    fn to_network_layer(&mut self, packet: Packet) {
        let _ = self.deliveries.send(packet);
    }

    fn grant_credit(&mut self, credit: usize) {
        self.credit += credit;
        self.announce();
    }
}

impl PhysicalLayer for Station {
    fn to_physical_layer(&mut self, frame: Frame) {
        self.link.transmit(frame);
    }

    fn from_physical_layer(&mut self) -> Option<Frame> {
        self.arrivals.try_recv().ok()
    }
}

impl TimerService for Station {
    fn schedule(&mut self, key: TimerKey, delay_ms: u64, expiry: Event) {
        self.timers.schedule(key, delay_ms, expiry);
    }

    fn cancel(&mut self, key: TimerKey) {
        self.timers.cancel(key);
    }
}

impl EventSource for Station {
    fn wait_for_event(&mut self) -> Result<Event, SourceError> {
        self.events.wait_for_event()
    }
}

/// Control handles for a station running on another thread.
pub struct StationHandle {
    pub events: EventSender,
    pub deliveries: UnboundedReceiver<Packet>,
}

/// Two stations wired back to back over a lossy link.
pub fn station_pair(config: &SimConfig, handle: &Handle) -> ((Station, StationHandle), (Station, StationHandle)) {
    let (a_events_tx, a_events) = EventQueue::new();
    let (b_events_tx, b_events) = EventQueue::new();
    let (a_frames_tx, a_frames) = mpsc::unbounded_channel();
    let (b_frames_tx, b_frames) = mpsc::unbounded_channel();
    let (a_deliver_tx, a_deliver) = mpsc::unbounded_channel();
    let (b_deliver_tx, b_deliver) = mpsc::unbounded_channel();

    let a = Station {
        name: "A".to_string(),
        events: a_events,
        self_events: a_events_tx.clone(),
        timers: TokioTimers::new(handle.clone(), a_events_tx.clone()),
        arrivals: a_frames,
        link: LinkEnd::new(
            handle.clone(),
            config.clone(),
            config.seed,
            b_events_tx.clone(),
            b_frames_tx,
        ),
        outbox: VecDeque::new(),
        credit: 0,
        announced: 0,
        deliveries: a_deliver_tx,
    };
    let b = Station {
        name: "B".to_string(),
        events: b_events,
        self_events: b_events_tx.clone(),
        timers: TokioTimers::new(handle.clone(), b_events_tx.clone()),
        arrivals: b_frames,
        link: LinkEnd::new(
            handle.clone(),
            config.clone(),
            config.seed.wrapping_add(1),
            a_events_tx.clone(),
            a_frames_tx,
        ),
        outbox: VecDeque::new(),
        credit: 0,
        announced: 0,
        deliveries: b_deliver_tx,
    };

    (
        (
            a,
            StationHandle {
                events: a_events_tx,
                deliveries: a_deliver,
            },
        ),
        (
            b,
            StationHandle {
                events: b_events_tx,
                deliveries: b_deliver,
            },
        ),
    )
}
