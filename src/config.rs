//! Runtime configuration assembled from parsed CLI [`Args`]. This is where
//! invalid flag combinations become [`RxError::Config`], before any device
//! or scheduler state is created.

use crate::cli::Args;
use crate::error::RxError;
use crate::hop::{AfcMode, Region};

/// Sweep-test mode parameters: tune across a fixed range instead of
/// tracking transmitters. All three of `start`, `end`, `step` must be
/// supplied together or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepTest {
    pub start_freq_hz: i64,
    pub end_freq_hz: i64,
    pub step_freq_hz: i64,
}

/// Fully resolved configuration the event loop runs with.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub frequency_plan: Region,
    pub transmitters_mask: u8,
    pub extra_slack_us: u64,
    pub freq_offset_hz: i64,
    pub ppm_correction: i32,
    pub gain_tenths_db: Option<i32>,
    pub max_missed: u32,
    pub log_undefined: bool,
    pub afc_enabled: bool,
    pub afc_mode: AfcMode,
    pub device: String,
    pub sweep_test: Option<SweepTest>,
}

impl RuntimeConfig {
    pub fn from_args(args: &Args) -> Result<Self, RxError> {
        let frequency_plan: Region = args
            .frequency_plan
            .parse()
            .map_err(RxError::Config)?;

        if args.transmitters == 0 {
            return Err(RxError::Config("-tr must enable at least one transmitter".into()));
        }

        let sweep_fields = [
            args.sweep_start_freq_hz,
            args.sweep_end_freq_hz,
            args.sweep_step_freq_hz,
        ];
        let sweep_set = sweep_fields.iter().filter(|&&v| v != 0).count();
        let sweep_test = match sweep_set {
            0 => None,
            3 => Some(SweepTest {
                start_freq_hz: args.sweep_start_freq_hz,
                end_freq_hz: args.sweep_end_freq_hz,
                step_freq_hz: args.sweep_step_freq_hz,
            }),
            _ => {
                return Err(RxError::Config(
                    "-startfreq/-endfreq/-stepfreq must all be set together".into(),
                ))
            }
        };

        let afc_mode = if args.afc_window > 0 {
            AfcMode::Windowed(args.afc_window)
        } else {
            AfcMode::RunningSum
        };

        Ok(Self {
            frequency_plan,
            transmitters_mask: args.transmitters,
            extra_slack_us: args.extra_slack_ms * 1_000,
            freq_offset_hz: args.freq_offset_hz,
            ppm_correction: args.ppm_correction,
            gain_tenths_db: if args.gain_tenths_db == 0 {
                None
            } else {
                Some(args.gain_tenths_db)
            },
            max_missed: args.max_missed,
            log_undefined: args.log_undefined,
            afc_enabled: !args.no_afc,
            afc_mode,
            device: args.device.clone(),
            sweep_test,
        })
    }
}
