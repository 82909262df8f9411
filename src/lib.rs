//! Frequency-hop tracking receiver core for Davis Instruments
//! weather-station telemetry.
//!
//! Demodulates a streaming I/Q sample block into candidate packets,
//! validates and decodes them, and drives a multi-transmitter hop
//! scheduler that predicts retune timing and recovers from packet loss.

pub mod cli;
pub mod config;
pub mod dsp;
pub mod error;
pub mod event_loop;
pub mod hop;
pub mod logging;
pub mod packet;
pub mod scheduler;
pub mod sdr;

pub use config::RuntimeConfig;
pub use error::{DeviceError, RxError};
pub use event_loop::EventLoop;
pub use scheduler::Scheduler;
