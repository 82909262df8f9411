//! Hop planning: static frequency plans and the AFC correction table.

pub mod afc;
pub mod plan;

pub use afc::{AfcMode, AfcTable, MAX_CHANNELS, MAX_TRANSMITTERS};
pub use plan::{FrequencyPlan, Hop, Region};
