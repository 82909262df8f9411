//! CRC-16/CCITT-FALSE (`poly=0x1021, init=0, xorout=0`) as used to validate
//! packet framing. The bit-level primitive itself is out of scope for this
//! crate (spec §1) and is supplied by the `crc` crate; this module only
//! pins the parameters the wire format requires.

use crc::{Algorithm, Crc};

/// CRC-16/CCITT-FALSE with the receiver's parameters: poly 0x1021, init 0,
/// no input/output reflection, xorout 0. This differs from the commonly
/// named "CRC-16/CCITT-FALSE" registered algorithm (which initializes to
/// 0xFFFF); the wire format here zero-initializes instead.
const ALGORITHM: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0x0000,
    refin: false,
    refout: false,
    xorout: 0x0000,
    check: 0x31C3,
    residue: 0x0000,
};

static CRC16: Crc<u16> = Crc::<u16>::new(&ALGORITHM);

/// Computes the CRC residue over `data`. A valid frame's residue is zero.
pub fn residue(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_give_zero_residue() {
        assert_eq!(residue(&[]), 0);
    }

    #[test]
    fn flipping_a_bit_changes_the_residue() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let r1 = residue(&data);
        let mut flipped = data;
        flipped[2] ^= 0x01;
        let r2 = residue(&flipped);
        assert_ne!(r1, r2);
    }
}
