//! Frequency Discriminator
//!
//! Converts a block of interleaved unsigned 8-bit I/Q samples into a stream
//! of per-sample instantaneous-frequency estimates (radians/sample), using
//! `angle(z[n] * conj(z[n-1]))`. The discriminator owns a contiguous,
//! absolutely-indexed window spanning at least one packet's worth of
//! history plus the current block, so a packet located near the tail of one
//! block can still be addressed once the next block arrives.

use super::config::PacketConfig;

/// A single complex sample, DC-centered around zero.
#[derive(Debug, Clone, Copy, Default)]
struct Iq {
    i: f32,
    q: f32,
}

/// Fast arctangent approximation (max error well under a degree), avoiding
/// a transcendental call on the per-sample hot path.
fn atan_approx(z: f32) -> f32 {
    const PI_4: f32 = std::f32::consts::FRAC_PI_4;
    let az = z.abs();
    (PI_4 * z) - z * (az - 1.0) * (0.2447 + 0.0663 * az)
}

/// Four-quadrant arctangent built from [`atan_approx`].
fn atan2_approx(y: f32, x: f32) -> f32 {
    use std::f32::consts::PI;
    if x == 0.0 && y == 0.0 {
        return 0.0;
    }
    if x.abs() > y.abs() {
        let z = y / x;
        if x > 0.0 {
            atan_approx(z)
        } else if y >= 0.0 {
            atan_approx(z) + PI
        } else {
            atan_approx(z) - PI
        }
    } else {
        let z = x / y;
        if y > 0.0 {
            -atan_approx(z) + PI / 2.0
        } else {
            -atan_approx(z) - PI / 2.0
        }
    }
}

/// Demodulates raw I/Q blocks into instantaneous-frequency samples and
/// retains enough history for the preamble searcher and packet parser to
/// address a packet that straddles two blocks.
pub struct Discriminator {
    cfg: PacketConfig,
    window: Vec<f64>,
    /// Absolute sample index of `window[0]`.
    base_index: u64,
    last_iq: Option<Iq>,
}

impl Discriminator {
    /// Creates a discriminator for the given packet framing configuration.
    pub fn new(cfg: PacketConfig) -> Self {
        Self {
            cfg,
            window: Vec::new(),
            base_index: 0,
            last_iq: None,
        }
    }

    /// Samples of history retained behind the live edge of the window: one
    /// packet's worth, so a candidate starting at the very first scannable
    /// position can still look back for continuity.
    fn retained_tail(&self) -> usize {
        self.cfg.packet_samples()
    }

    /// Demodulates one block of interleaved unsigned I/Q bytes, appending
    /// the resulting instantaneous-frequency samples to the rolling window
    /// and trimming history beyond one packet length.
    pub fn process_block(&mut self, iq: &[u8]) {
        let n = iq.len() / 2;
        let mut produced = Vec::with_capacity(n);

        for k in 0..n {
            let sample = Iq {
                i: iq[2 * k] as f32 - 127.5,
                q: iq[2 * k + 1] as f32 - 127.5,
            };
            let freq = match self.last_iq {
                Some(prev) => {
                    // z[n] * conj(z[n-1])
                    let real = sample.i * prev.i + sample.q * prev.q;
                    let imag = sample.q * prev.i - sample.i * prev.q;
                    atan2_approx(imag, real) as f64
                }
                None => 0.0,
            };
            produced.push(freq);
            self.last_iq = Some(sample);
        }

        self.window.extend(produced);

        let keep_from = self
            .window
            .len()
            .saturating_sub(self.retained_tail() + n.max(1));
        if keep_from > 0 {
            self.window.drain(0..keep_from);
            self.base_index += keep_from as u64;
        }
    }

    /// The absolute sample index of the first element of [`Self::window`].
    pub fn base_index(&self) -> u64 {
        self.base_index
    }

    /// The absolute sample index one past the last valid sample.
    pub fn end_index(&self) -> u64 {
        self.base_index + self.window.len() as u64
    }

    /// The full retained window, for diagnostics and tests.
    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// Reads a slice of the discriminated stream addressed by absolute
    /// sample indices `[start, end)`, or `None` if any part has already
    /// been dropped or has not arrived yet.
    pub fn slice_abs(&self, start: u64, end: u64) -> Option<&[f64]> {
        if start < self.base_index || end > self.end_index() || start > end {
            return None;
        }
        let lo = (start - self.base_index) as usize;
        let hi = (end - self.base_index) as usize;
        Some(&self.window[lo..hi])
    }
}
