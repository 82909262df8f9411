//! Packet Parser: framing, CRC, message construction, and frequency-error
//! measurement feeding the AFC table.

pub mod crc;
pub mod parser;

pub use parser::{Message, PacketParser};
