//! Event Loop / Retune Coordinator
//!
//! A single-threaded loop owns the scheduler, discriminator, preamble
//! searcher, and packet parser, and selects among three event sources:
//! a sample block arriving, the armed timeout firing, or a shutdown
//! signal. Retunes are handed off to a dedicated worker over a
//! single-slot [`watch`] channel so the SDR's (potentially slow)
//! synchronous retune never blocks the sample path.
//!
//! Before the loop starts, `run` configures the device's sample rate,
//! tuner gain, and crystal PPM correction once; only the center frequency
//! changes per hop thereafter.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};
use tokio::time::{sleep_until, Duration, Instant};

use crate::dsp::{Discriminator, PacketConfig, PreambleSearcher};
use crate::error::RxError;
use crate::hop::Hop;
use crate::logging::LogThrottle;
use crate::packet::{Message, PacketParser};
use crate::scheduler::{MessageEvent, Scheduler, TimeoutEvent};
use crate::sdr::SdrDevice;

/// Runs the event loop to completion (shutdown signal or sample-stream end).
pub struct EventLoop<D: SdrDevice + 'static> {
    device: Arc<AsyncMutex<D>>,
    scheduler: Scheduler,
    disc: Discriminator,
    searcher: PreambleSearcher,
    parser: PacketParser,
    sample_rate_hz: u32,
    freq_offset_hz: i64,
    ppm_correction: i32,
    gain_tenths_db: Option<i32>,
    afc_enabled: bool,
    log_undefined: bool,
    current_channel_idx: usize,
    duplicate_throttle: LogThrottle,
}

impl<D: SdrDevice + 'static> EventLoop<D> {
    pub fn new(
        device: D,
        scheduler: Scheduler,
        packet_cfg: PacketConfig,
        freq_offset_hz: i64,
        ppm_correction: i32,
        gain_tenths_db: Option<i32>,
        afc_enabled: bool,
        log_undefined: bool,
    ) -> Self {
        Self {
            device: Arc::new(AsyncMutex::new(device)),
            scheduler,
            disc: Discriminator::new(packet_cfg),
            searcher: PreambleSearcher::new(packet_cfg),
            parser: PacketParser::new(packet_cfg),
            sample_rate_hz: packet_cfg.sample_rate,
            freq_offset_hz,
            ppm_correction,
            gain_tenths_db,
            afc_enabled,
            log_undefined,
            current_channel_idx: 0,
            duplicate_throttle: LogThrottle::new(1_000, 5),
        }
    }

    /// Runs until `shutdown` fires or the sample stream ends.
    pub async fn run(
        mut self,
        block_size: usize,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), RxError> {
        let epoch = Instant::now();

        {
            let mut dev = self.device.lock().await;
            dev.set_sample_rate(self.sample_rate_hz).await.map_err(RxError::Device)?;
            dev.set_tuner_gain(self.gain_tenths_db).await.map_err(RxError::Device)?;
            dev.set_freq_correction_ppm(self.ppm_correction).await.map_err(RxError::Device)?;
        }

        let (retune_tx, retune_rx) = watch::channel::<Option<Hop>>(None);
        let worker_device = self.device.clone();
        let worker_offset = self.freq_offset_hz;
        let retune_handle = tokio::spawn(retune_worker(worker_device, retune_rx, worker_offset));

        let (park_hop, deadline_us) = self.scheduler.start(now_us(epoch));
        self.current_channel_idx = park_hop.channel_idx;
        let _ = retune_tx.send(Some(park_hop));
        let mut deadline = epoch + Duration::from_micros(deadline_us);

        let mut samples_rx = {
            let mut dev = self.device.lock().await;
            dev.read_async(block_size)
        };

        loop {
            tokio::select! {
                maybe_block = samples_rx.recv() => {
                    match maybe_block {
                        Some(mut block) => {
                            // Overwrite-tail: if more blocks queued up while we
                            // were busy, keep only the most recent one.
                            while let Ok(newer) = samples_rx.try_recv() {
                                block = newer;
                            }
                            self.handle_block(&block, epoch, &retune_tx, &mut deadline);
                        }
                        None => {
                            info!("sample stream ended");
                            break;
                        }
                    }
                }
                _ = sleep_until(deadline) => {
                    self.handle_timeout(epoch, &retune_tx, &mut deadline);
                }
                _ = shutdown.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        drop(retune_tx);
        let _ = retune_handle.await;
        let mut dev = self.device.lock().await;
        dev.close().await.map_err(RxError::Device)
    }

    fn handle_block(
        &mut self,
        block: &[u8],
        epoch: Instant,
        retune_tx: &watch::Sender<Option<Hop>>,
        deadline: &mut Instant,
    ) {
        self.disc.process_block(block);
        let candidates = self.searcher.search(&self.disc);
        if candidates.is_empty() {
            return;
        }
        let messages = self.parser.parse(
            &candidates,
            &self.disc,
            self.current_channel_idx,
            self.scheduler.afc_mut(),
            self.afc_enabled,
        );

        for message in &messages {
            let now = now_us(epoch);
            match self.scheduler.on_message(message, self.current_channel_idx, now) {
                MessageEvent::StillInitializing => {}
                MessageEvent::InitComplete { hop, deadline: next } | MessageEvent::Replanned { hop, deadline: next } => {
                    self.log_accepted(message);
                    self.apply_plan(hop, next, epoch, retune_tx, deadline);
                }
                MessageEvent::Undefined => {
                    if self.log_undefined {
                        warn!("undefined transmitter id {}", message.id);
                    }
                }
                MessageEvent::Duplicate => {
                    if self.duplicate_throttle.allow() {
                        debug!("duplicate packet from id {} dropped", message.id);
                    }
                }
            }
        }
    }

    /// Logs an accepted packet: raw hex payload, message counters for
    /// transmitters 0..3, total re-inits, and the message ID.
    fn log_accepted(&self, message: &Message) {
        let hex: String = message.data.iter().map(|b| format!("{b:02X}")).collect();
        info!(
            "{hex} {} {} {} {} {} msg.ID={}",
            self.scheduler.transmitter(0).total_messages,
            self.scheduler.transmitter(1).total_messages,
            self.scheduler.transmitter(2).total_messages,
            self.scheduler.transmitter(3).total_messages,
            self.scheduler.reinit_count(),
            message.id,
        );
    }

    fn handle_timeout(
        &mut self,
        epoch: Instant,
        retune_tx: &watch::Sender<Option<Hop>>,
        deadline: &mut Instant,
    ) {
        let now = now_us(epoch);
        match self.scheduler.on_timeout(now) {
            TimeoutEvent::Replanned { hop, deadline: next } => {
                self.apply_plan(hop, next, epoch, retune_tx, deadline);
            }
            TimeoutEvent::ReInitialized { hop, deadline: next } => {
                warn!("re-synchronizing (re-init #{})", self.scheduler.reinit_count());
                self.apply_plan(hop, next, epoch, retune_tx, deadline);
            }
        }
    }

    fn apply_plan(
        &mut self,
        hop: Hop,
        deadline_us: u64,
        epoch: Instant,
        retune_tx: &watch::Sender<Option<Hop>>,
        deadline: &mut Instant,
    ) {
        self.current_channel_idx = hop.channel_idx;
        let _ = retune_tx.send(Some(hop));
        *deadline = epoch + Duration::from_micros(deadline_us);
    }
}

fn now_us(epoch: Instant) -> u64 {
    epoch.elapsed().as_micros() as u64
}

/// Drains the single-slot retune channel and applies each hop to the
/// device, with AFC precompensation and the global frequency offset folded
/// in. A failed retune is logged and the loop continues; the next arrival
/// will attempt another retune (spec §7).
async fn retune_worker<D: SdrDevice>(
    device: Arc<AsyncMutex<D>>,
    mut rx: watch::Receiver<Option<Hop>>,
    freq_offset_hz: i64,
) {
    loop {
        if rx.changed().await.is_err() {
            break;
        }
        let hop = *rx.borrow();
        if let Some(hop) = hop {
            let target_hz = hop.channel_freq + freq_offset_hz + hop.freq_error as i64;
            let mut dev = device.lock().await;
            if let Err(e) = dev.set_center_freq(target_hz).await {
                warn!("retune to {target_hz} Hz failed: {e}");
            }
        }
    }
}
