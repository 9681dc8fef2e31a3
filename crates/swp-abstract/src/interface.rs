use thiserror::Error;

use crate::event::Event;
use crate::packet::{Frame, Packet};

/// The upper layer as seen by the protocol engine.
pub trait NetworkLayer {
    /// Take the next payload the upper layer wants sent.
    /// Only called after credit was granted, at most once per credit unit.
    /// `None` means the upper layer broke that contract.
    fn from_network_layer(&mut self) -> Option<Packet>;

    /// Hand a payload to the upper layer. Called exactly once per payload, in order.
    fn to_network_layer(&mut self, packet: Packet);

    /// Allow the upper layer to submit up to `credit` further payloads.
    fn grant_credit(&mut self, credit: usize);
}

/// Best-effort frame transport with checksum verification done by the implementor.
pub trait PhysicalLayer {
    fn to_physical_layer(&mut self, frame: Frame);

    /// Fetch the frame whose arrival was signalled by `Event::FrameArrival`.
    fn from_physical_layer(&mut self) -> Option<Frame>;
}

/// Identifies a timer slot. Frame timers are keyed by buffer slot, not by sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Frame(usize),
    Ack,
}

/// Delivers timer expiries back into the engine's event stream.
pub trait TimerService {
    /// Deliver `expiry` after `delay_ms`. A previous timer under the same key
    /// may be replaced.
    fn schedule(&mut self, key: TimerKey, delay_ms: u64, expiry: Event);

    /// Cancel a pending timer. Cancelling an idle key is a no-op.
    fn cancel(&mut self, _key: TimerKey) {}
}

/// Everything the engine touches while handling one event.
pub trait Environment: NetworkLayer + PhysicalLayer + TimerService {}

impl<T: NetworkLayer + PhysicalLayer + TimerService + ?Sized> Environment for T {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("event source closed")]
    Closed,
    #[error("event source halted")]
    Halted,
}

/// Blocking supplier of the engine's next event.
pub trait EventSource {
    fn wait_for_event(&mut self) -> Result<Event, SourceError>;
}
