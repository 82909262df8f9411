//! DSP pipeline: frequency discrimination and preamble search.

pub mod config;
pub mod discriminator;
pub mod preamble;

pub use config::{PacketConfig, DAVIS};
pub use discriminator::Discriminator;
pub use preamble::{PacketCandidate, PreambleSearcher};
