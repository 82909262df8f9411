//! A no-hardware [`SdrDevice`] used by scenario tests: feeds pre-programmed
//! sample blocks and records every retune/gain/correction call so tests can
//! assert on what the event loop asked for.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DeviceError;
use crate::sdr::SdrDevice;

/// One retune request observed by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetuneCall {
    pub center_freq_hz: i64,
}

#[derive(Clone, Default)]
pub struct NullSdr {
    blocks: Arc<Mutex<VecDeque<Vec<u8>>>>,
    retunes: Arc<Mutex<Vec<RetuneCall>>>,
    sample_rate_hz: Arc<Mutex<u32>>,
    closed: Arc<Mutex<bool>>,
}

impl NullSdr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a block to be yielded by the next `read_async` receiver poll.
    pub fn queue_block(&self, block: Vec<u8>) {
        self.blocks.lock().unwrap().push_back(block);
    }

    /// All retunes observed so far, in issue order.
    pub fn retunes(&self) -> Vec<RetuneCall> {
        self.retunes.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait]
impl SdrDevice for NullSdr {
    async fn set_center_freq(&mut self, hz: i64) -> Result<(), DeviceError> {
        self.retunes.lock().unwrap().push(RetuneCall { center_freq_hz: hz });
        Ok(())
    }

    async fn set_sample_rate(&mut self, hz: u32) -> Result<(), DeviceError> {
        *self.sample_rate_hz.lock().unwrap() = hz;
        Ok(())
    }

    async fn set_tuner_gain(&mut self, _tenths_db: Option<i32>) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn set_freq_correction_ppm(&mut self, _ppm: i32) -> Result<(), DeviceError> {
        Ok(())
    }

    fn read_async(&mut self, _block_size: usize) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(8);
        let blocks = self.blocks.clone();
        tokio::spawn(async move {
            loop {
                let next = blocks.lock().unwrap().pop_front();
                match next {
                    Some(block) => {
                        if tx.send(block).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        });
        rx
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_blocks_are_delivered_in_order() {
        let mut sdr = NullSdr::new();
        sdr.queue_block(vec![1, 2, 3]);
        sdr.queue_block(vec![4, 5, 6]);
        let mut rx = sdr.read_async(3);
        assert_eq!(rx.recv().await, Some(vec![1, 2, 3]));
        assert_eq!(rx.recv().await, Some(vec![4, 5, 6]));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn retunes_are_recorded() {
        let mut sdr = NullSdr::new();
        sdr.set_center_freq(868_077_250).await.unwrap();
        sdr.set_center_freq(868_317_250).await.unwrap();
        assert_eq!(
            sdr.retunes(),
            vec![
                RetuneCall { center_freq_hz: 868_077_250 },
                RetuneCall { center_freq_hz: 868_317_250 },
            ]
        );
    }

    #[tokio::test]
    async fn close_marks_device_closed() {
        let mut sdr = NullSdr::new();
        sdr.close().await.unwrap();
        assert!(sdr.is_closed());
    }
}
