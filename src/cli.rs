//! Command-line flag schema. `clap`'s derive macros supply the parsing
//! mechanics; this module only defines the flags and their defaults.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "davis-hop-rx")]
#[command(about = "Frequency-hop tracking receiver for Davis Instruments weather stations")]
pub struct Args {
    /// Bitmask of enabled transmitters: bit i enables id i.
    #[arg(long = "tr", default_value_t = 1)]
    pub transmitters: u8,

    /// Frequency plan: EU or US.
    #[arg(long = "tf", default_value = "EU")]
    pub frequency_plan: String,

    /// Extra slack added to each loop timeout, in milliseconds.
    #[arg(long = "ex", default_value_t = 0)]
    pub extra_slack_ms: u64,

    /// Global frequency offset applied to every tune, in Hz.
    #[arg(long = "fc", default_value_t = 0)]
    pub freq_offset_hz: i64,

    /// SDR crystal PPM correction.
    #[arg(long = "ppm", default_value_t = 0)]
    pub ppm_correction: i32,

    /// Tuner gain, tenths of dB; 0 means automatic.
    #[arg(long = "gain", default_value_t = 0)]
    pub gain_tenths_db: i32,

    /// Misses-in-a-row per transmitter that trigger re-init.
    #[arg(long = "maxmissed", default_value_t = 51)]
    pub max_missed: u32,

    /// Log undefined-ID packets.
    #[arg(short = 'u', default_value_t = false)]
    pub log_undefined: bool,

    /// Disable AFC feedback.
    #[arg(long = "noafc", default_value_t = false)]
    pub no_afc: bool,

    /// SDR serial number or index.
    #[arg(short = 'd', default_value = "0")]
    pub device: String,

    /// Sweep-test mode: start frequency, Hz.
    #[arg(long = "startfreq", default_value_t = 0)]
    pub sweep_start_freq_hz: i64,

    /// Sweep-test mode: end frequency, Hz.
    #[arg(long = "endfreq", default_value_t = 0)]
    pub sweep_end_freq_hz: i64,

    /// Sweep-test mode: frequency step, Hz.
    #[arg(long = "stepfreq", default_value_t = 0)]
    pub sweep_step_freq_hz: i64,

    /// Use an N-entry rolling-window AFC instead of the default divide-by-8
    /// running sum. 0 disables the windowed form.
    #[arg(long = "afc-window", default_value_t = 0)]
    pub afc_window: usize,
}
