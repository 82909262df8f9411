//! Packet Config — sample-rate, symbol length, preamble, and packet-length
//! constants shared by the discriminator, preamble searcher, and parser.

/// Fixed-point configuration describing the demodulator's framing.
#[derive(Debug, Clone, Copy)]
pub struct PacketConfig {
    /// I/Q sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per symbol at the configured baud rate.
    pub symbol_length: usize,
    /// Preamble bit pattern, MSB-first.
    pub preamble_bits: u32,
    /// Width of `preamble_bits`, in bits.
    pub preamble_len: usize,
    /// Number of data bits following the preamble (header + payload + CRC).
    pub packet_length: usize,
}

/// Davis Instruments packets: 2.4 MHz sampling, 19200 baud (14
/// samples/symbol), 16-bit preamble `1100101110001001`, followed by an
/// 80-bit (10-byte) data packet.
pub const DAVIS: PacketConfig = PacketConfig {
    sample_rate: 2_400_000,
    symbol_length: 14,
    preamble_bits: 0b1100_1011_1000_1001,
    preamble_len: 16,
    packet_length: 80,
};

impl PacketConfig {
    /// Number of data bits following the preamble.
    pub fn data_bits(&self) -> usize {
        self.packet_length
    }

    /// Number of data bytes following the preamble (packet_length is a
    /// whole number of bytes by construction).
    pub fn data_bytes(&self) -> usize {
        self.data_bits() / 8
    }

    /// Samples spanned by the full packet, preamble plus data.
    pub fn packet_samples(&self) -> usize {
        (self.preamble_len + self.packet_length) * self.symbol_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn davis_config_matches_spec_constants() {
        assert_eq!(DAVIS.sample_rate, 2_400_000);
        assert_eq!(DAVIS.symbol_length, 14);
        assert_eq!(DAVIS.preamble_len, 16);
        assert_eq!(DAVIS.packet_length, 80);
        assert_eq!(DAVIS.data_bytes(), 10);
    }
}
