//! Normalization of raw counts.
//!
//! - **Frequency**: each population's share of its sample's total count, in percent

pub mod frequency;

pub use frequency::{summarize_frequencies, FrequencyRow, FrequencySummary};
