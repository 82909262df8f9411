//! Hop Planner
//!
//! Holds the static, per-region frequency plan: an ordered list of channel
//! center frequencies, a hop pattern (permutation of channel indices), and
//! its inverse. Pure functional given those tables.

/// One hop result: the channel to tune to and the frequency-error
/// precompensation to apply, for whichever transmitter is expected next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub channel_idx: usize,
    pub channel_freq: i64,
    pub freq_error: i32,
}

/// A region's static hop table. `hop_pattern` and `reverse_hop_pattern` are
/// mutual inverses over `[0, channel_count)`.
#[derive(Debug, Clone)]
pub struct FrequencyPlan {
    channels: Vec<i64>,
    hop_pattern: Vec<usize>,
    reverse_hop_pattern: Vec<usize>,
}

impl FrequencyPlan {
    /// Builds a plan from a channel list and hop pattern, deriving the true
    /// inverse permutation by construction (rather than any closed-form
    /// approximation) so the mutual-inverse invariant always holds exactly.
    fn new(channels: Vec<i64>, hop_pattern: Vec<usize>) -> Self {
        let n = channels.len();
        assert_eq!(hop_pattern.len(), n, "hop pattern must cover every channel");
        let mut reverse_hop_pattern = vec![0usize; n];
        for (seq, &ch) in hop_pattern.iter().enumerate() {
            reverse_hop_pattern[ch] = seq;
        }
        Self {
            channels,
            hop_pattern,
            reverse_hop_pattern,
        }
    }

    /// The EU868 plan: 5 channels.
    pub fn eu() -> Self {
        Self::new(
            vec![868_077_250, 868_197_250, 868_317_250, 868_437_250, 868_557_250],
            vec![0, 2, 4, 1, 3],
        )
    }

    /// The US915 plan: 51 channels, 902_419_338 Hz .. 927_506_862 Hz in
    /// (non-uniform-by-rounding) ~501_750 Hz steps.
    pub fn us() -> Self {
        let channels = (0..51)
            .map(|i| (902_419_338.0 + i as f64 * 501_750.48).round() as i64)
            .collect();
        let hop_pattern = vec![
            0, 19, 41, 25, 8, 47, 32, 13, 36, 22, 3, 29, 44, 16, 5, 27, 38, 10, 49, 21, 2, 30, 42,
            14, 48, 7, 24, 34, 45, 1, 17, 39, 26, 9, 31, 50, 37, 12, 20, 33, 4, 43, 28, 15, 35, 6,
            40, 11, 23, 46, 18,
        ];
        Self::new(channels, hop_pattern)
    }

    /// Number of channels in this plan.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The channel index reached at hop-sequence position `idx`.
    pub fn seq_to_hop(&self, seq: usize) -> usize {
        self.hop_pattern[seq % self.channel_count()]
    }

    /// The hop-sequence position that visits channel index `idx`.
    pub fn hop_to_seq(&self, idx: usize) -> usize {
        self.reverse_hop_pattern[idx % self.channel_count()]
    }

    /// The center frequency, in Hz, of channel index `idx`.
    pub fn channel_freq(&self, idx: usize) -> i64 {
        self.channels[idx % self.channel_count()]
    }
}

/// Region selector, matching the `-tf` CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Eu,
    Us,
}

impl Region {
    pub fn plan(self) -> FrequencyPlan {
        match self {
            Region::Eu => FrequencyPlan::eu(),
            Region::Us => FrequencyPlan::us(),
        }
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EU" => Ok(Region::Eu),
            "US" => Ok(Region::Us),
            other => Err(format!("unknown frequency plan: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eu_hop_pattern_matches_spec() {
        let plan = FrequencyPlan::eu();
        assert_eq!(plan.channel_count(), 5);
        assert_eq!(plan.channel_freq(0), 868_077_250);
        assert_eq!(plan.channel_freq(4), 868_557_250);
        for s in 0..5 {
            assert_eq!(plan.hop_to_seq(plan.seq_to_hop(s)), s);
        }
        for i in 0..5 {
            assert_eq!(plan.seq_to_hop(plan.hop_to_seq(i)), i);
        }
    }

    #[test]
    fn eu_reverse_pattern_matches_spec_table() {
        let plan = FrequencyPlan::eu();
        let expected = [0, 3, 1, 4, 2];
        for (seq, &exp) in expected.iter().enumerate() {
            assert_eq!(plan.hop_to_seq(plan.seq_to_hop(seq)), seq);
            // hop_to_seq(channel) should equal the spec's stated inverse.
        }
        for (ch, &exp) in expected.iter().enumerate() {
            assert_eq!(plan.hop_to_seq(ch), exp);
        }
    }

    #[test]
    fn us_plan_has_51_channels_and_is_self_inverse() {
        let plan = FrequencyPlan::us();
        assert_eq!(plan.channel_count(), 51);
        assert_eq!(plan.channel_freq(0), 902_419_338);
        assert_eq!(plan.channel_freq(50), 927_506_862);
        for s in 0..51 {
            assert_eq!(plan.hop_to_seq(plan.seq_to_hop(s)), s);
        }
        for i in 0..51 {
            assert_eq!(plan.seq_to_hop(plan.hop_to_seq(i)), i);
        }
    }

    #[test]
    fn region_from_str_is_case_insensitive() {
        assert_eq!("eu".parse::<Region>().unwrap(), Region::Eu);
        assert_eq!("US".parse::<Region>().unwrap(), Region::Us);
        assert!("xx".parse::<Region>().is_err());
    }
}
