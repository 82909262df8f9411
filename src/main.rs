//! Binary entry point: parses CLI flags, builds runtime configuration and
//! the scheduler, and drives the event loop until a shutdown signal.
//!
//! The bit-exact USB/ioctl layer for a real SDR device is out of scope for
//! this crate (see [`davis_hop_rx::sdr::SdrDevice`]); this binary runs
//! against [`davis_hop_rx::sdr::NullSdr`], the same test double used by the
//! scenario tests. Wiring a real device means implementing `SdrDevice` and
//! substituting it here.

use clap::Parser;
use tokio::sync::broadcast;

use davis_hop_rx::cli::Args;
use davis_hop_rx::config::RuntimeConfig;
use davis_hop_rx::dsp::DAVIS;
use davis_hop_rx::event_loop::EventLoop;
use davis_hop_rx::logging::init_logger;
use davis_hop_rx::scheduler::Scheduler;
use davis_hop_rx::sdr::NullSdr;

const BLOCK_SIZE: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();
    let config = RuntimeConfig::from_args(&args)?;

    let plan = config.frequency_plan.plan();
    let scheduler = Scheduler::new(
        plan,
        config.transmitters_mask,
        config.max_missed,
        config.extra_slack_us,
        config.afc_mode,
    );

    let device = NullSdr::new();
    let event_loop = EventLoop::new(
        device,
        scheduler,
        DAVIS,
        config.freq_offset_hz,
        config.ppm_correction,
        config.gain_tenths_db,
        config.afc_enabled,
        config.log_undefined,
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    event_loop.run(BLOCK_SIZE, shutdown_rx).await?;
    Ok(())
}
