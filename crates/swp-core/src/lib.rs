//! Selective-repeat sliding window protocol engine.
//!
//! - [`engine`]: the window state machine ([`Swp`])
//! - [`timer`]: retransmission and delayed-ack timer bookkeeping
//! - [`dispatch`]: frame assembly and retrieval
//! - [`station`]: threaded real-time harness over tokio channels and timers
//! - [`error`]: run-loop failure type

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod station;
pub mod timer;

pub use engine::{EngineStats, Swp, WindowState};
pub use error::{EngineError, Result};
pub use station::{EventQueue, EventSender, Station, StationHandle, TokioTimers, station_pair};
pub use timer::TimerManager;
