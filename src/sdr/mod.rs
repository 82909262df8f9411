//! SDR device boundary: the trait the core calls through to read samples
//! and retune, and a mock implementation for tests.

pub mod null;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DeviceError;

/// Abstraction over a tunable SDR receiver. The bit-exact USB/ioctl layer
/// that implements this for a real device is out of scope; this crate only
/// calls through the trait.
#[async_trait]
pub trait SdrDevice: Send {
    async fn set_center_freq(&mut self, hz: i64) -> Result<(), DeviceError>;
    async fn set_sample_rate(&mut self, hz: u32) -> Result<(), DeviceError>;
    async fn set_tuner_gain(&mut self, tenths_db: Option<i32>) -> Result<(), DeviceError>;
    async fn set_freq_correction_ppm(&mut self, ppm: i32) -> Result<(), DeviceError>;
    /// Starts (or continues) streaming sample blocks, returning a receiver
    /// the caller drains. Called once per device lifetime.
    fn read_async(&mut self, block_size: usize) -> mpsc::Receiver<Vec<u8>>;
    async fn close(&mut self) -> Result<(), DeviceError>;
}

pub use null::NullSdr;
