//! Preamble Searcher
//!
//! Locates occurrences of the 16-bit preamble in the discriminated stream
//! by integrating over `symbol_length` samples per bit and thresholding on
//! sign, then slices the following `packet_length` data bits symbol-aligned
//! from the same buffer.

use super::config::PacketConfig;
use super::discriminator::Discriminator;

/// A packet candidate located in the discriminated stream.
#[derive(Debug, Clone)]
pub struct PacketCandidate {
    /// Absolute sample index where the preamble begins.
    pub sample_index: u64,
    /// Raw data bytes following the preamble, MSB-first per the over-the-air
    /// bit order (bit reversal happens later, in the parser).
    pub data_bits: Vec<u8>,
}

/// Scans a [`Discriminator`]'s window for preamble matches, tracking how far
/// it has already scanned so a given start position is only ever evaluated
/// once, even across many calls as the window slides forward.
pub struct PreambleSearcher {
    cfg: PacketConfig,
    /// Absolute sample index of the next bit-start candidate to test.
    next_scan_index: u64,
}

fn integrate_symbol(samples: &[f64]) -> bool {
    samples.iter().sum::<f64>() > 0.0
}

impl PreambleSearcher {
    pub fn new(cfg: PacketConfig) -> Self {
        Self {
            cfg,
            next_scan_index: 0,
        }
    }

    /// Returns the bits of the preamble pattern, MSB-first.
    fn preamble_bits(&self) -> Vec<bool> {
        (0..self.cfg.preamble_len)
            .map(|i| (self.cfg.preamble_bits >> (self.cfg.preamble_len - 1 - i)) & 1 == 1)
            .collect()
    }

    /// Scans all newly-available start positions in `disc`'s window,
    /// emitting a candidate for each preamble match whose trailing data bits
    /// are fully available. Positions whose packet would extend beyond the
    /// window are left for the next call (edge policy: drop, don't buffer).
    pub fn search(&mut self, disc: &Discriminator) -> Vec<PacketCandidate> {
        let sym = self.cfg.symbol_length as u64;
        let preamble_bits = self.preamble_bits();
        let data_bit_count = self.cfg.data_bits();
        let packet_samples = self.cfg.packet_samples() as u64;

        let mut out = Vec::new();
        let mut idx = self.next_scan_index.max(disc.base_index());
        let window_end = disc.end_index();

        while idx + preamble_bits.len() as u64 * sym <= window_end {
            if self.matches_preamble(disc, idx, &preamble_bits) {
                let total_end = idx + packet_samples;
                if total_end > window_end {
                    // Can't complete this candidate yet; retry once more
                    // data arrives.
                    break;
                }
                let data_start = idx + preamble_bits.len() as u64 * sym;
                let data_bits = self.slice_data_bits(disc, data_start, data_bit_count);
                if let Some(data_bits) = data_bits {
                    out.push(PacketCandidate {
                        sample_index: idx,
                        data_bits,
                    });
                }
                idx += packet_samples;
                continue;
            }
            idx += 1;
        }

        self.next_scan_index = idx;
        out
    }

    fn matches_preamble(&self, disc: &Discriminator, start: u64, preamble_bits: &[bool]) -> bool {
        let sym = self.cfg.symbol_length as u64;
        for (i, &expected) in preamble_bits.iter().enumerate() {
            let lo = start + i as u64 * sym;
            let hi = lo + sym;
            let Some(samples) = disc.slice_abs(lo, hi) else {
                return false;
            };
            if integrate_symbol(samples) != expected {
                return false;
            }
        }
        true
    }

    /// Packs `bit_count` symbol-integrated bits starting at `start` into
    /// MSB-first bytes.
    fn slice_data_bits(&self, disc: &Discriminator, start: u64, bit_count: usize) -> Option<Vec<u8>> {
        let sym = self.cfg.symbol_length as u64;
        let mut bytes = vec![0u8; bit_count / 8];
        for i in 0..bit_count {
            let lo = start + i as u64 * sym;
            let hi = lo + sym;
            let samples = disc.slice_abs(lo, hi)?;
            if integrate_symbol(samples) {
                bytes[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::config::DAVIS;

    /// Builds a discriminated window directly (bypassing I/Q demodulation)
    /// by pushing a constant positive or negative value per symbol.
    fn synth_window(cfg: PacketConfig, bits: &[bool]) -> Discriminator {
        let mut disc = Discriminator::new(cfg);
        let mut iq = Vec::new();
        for &bit in bits {
            for _ in 0..cfg.symbol_length {
                if bit {
                    iq.push(255u8);
                    iq.push(128u8);
                } else {
                    iq.push(0u8);
                    iq.push(128u8);
                }
            }
        }
        disc.process_block(&iq);
        disc
    }

    fn preamble_pattern() -> Vec<bool> {
        "1100101110001001".chars().map(|c| c == '1').collect()
    }

    #[test]
    fn finds_preamble_and_slices_data() {
        let mut bits = preamble_pattern();
        let data_bits: Vec<bool> = (0..80).map(|i| i % 3 == 0).collect();
        bits.extend(&data_bits);
        let disc = synth_window(DAVIS, &bits);

        let mut searcher = PreambleSearcher::new(DAVIS);
        let found = searcher.search(&disc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data_bits.len(), 10);
    }

    #[test]
    fn truncated_candidate_is_dropped_not_buffered() {
        // Preamble present but not enough trailing data yet.
        let bits = preamble_pattern();
        let disc = synth_window(DAVIS, &bits);
        let mut searcher = PreambleSearcher::new(DAVIS);
        let found = searcher.search(&disc);
        assert!(found.is_empty());
    }

    #[test]
    fn same_start_position_is_not_rescanned() {
        let mut bits = preamble_pattern();
        bits.extend((0..80).map(|i| i % 2 == 0));
        let disc = synth_window(DAVIS, &bits);
        let mut searcher = PreambleSearcher::new(DAVIS);
        let first = searcher.search(&disc);
        assert_eq!(first.len(), 1);
        let second = searcher.search(&disc);
        assert!(second.is_empty());
    }
}
