pub mod config;
pub mod event;
pub mod interface;
pub mod packet;
pub mod scenario;
pub mod seq;

pub use config::{ProtocolConfig, SimConfig};
pub use event::Event;
pub use interface::{
    Environment, EventSource, NetworkLayer, PhysicalLayer, SourceError, TimerKey, TimerService,
};
pub use packet::{Frame, FrameKind, Packet};
pub use scenario::{SimConfigOverride, StationId, TestAction, TestAssertion, TestScenario};
pub use seq::{MAX_SEQ, NR_BUFS, SeqNr};
