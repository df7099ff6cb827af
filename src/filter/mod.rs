//! Cohort and frequency filtering.

pub mod selection;

pub use selection::{filter_frequencies, filter_samples, FrequencyFilter, SampleFilter};
