//! # Error Handling
//!
//! Defines the error types that can occur in the davis-hop-rx crate.
//! Signal-processing failures (CRC mismatch, duplicate, truncated candidate,
//! undefined transmitter ID) are never represented here: per the receiver's
//! error-handling policy they are silently dropped and counted, not
//! propagated as errors.

use thiserror::Error;

/// Errors surfaced by the SDR device boundary.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open device {0}")]
    OpenFailed(String),

    #[error("failed to set center frequency to {hz} Hz: {reason}")]
    SetCenterFreqFailed { hz: i64, reason: String },

    #[error("failed to set sample rate to {hz} Hz: {reason}")]
    SetSampleRateFailed { hz: u32, reason: String },

    #[error("failed to set tuner gain: {0}")]
    SetGainFailed(String),

    #[error("failed to set frequency correction: {0}")]
    SetFreqCorrectionFailed(String),

    #[error("sample read failed: {0}")]
    ReadFailed(String),

    #[error("device close failed: {0}")]
    CloseFailed(String),
}

/// Top-level error type for the receiver core.
///
/// Only two domains are represented: device failures and invalid
/// configuration. Timing failures (missed packets) are handled internally
/// by the scheduler's state machine and never reach this type.
#[derive(Debug, Error)]
pub enum RxError {
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
