//! Data structures for cell frequency analysis.

mod cell_counts;
mod result;
mod sample;

pub use cell_counts::{CellCount, CountTable};
pub use result::{
    ComparisonSummary, PopulationComparison, TestMethod, TestOutcome, DEFAULT_ALPHA,
};
pub use sample::{Response, Sample, SampleTable};

#[cfg(test)]
pub(crate) use sample::sample as test_sample;
