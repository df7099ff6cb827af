//! Descriptive summaries of the study data.

pub mod distribution;
mod options;
mod subset;

pub use distribution::{
    median, quantile_sorted, summarize_distributions, FiveNumber, GroupDistribution,
};
pub use options::FilterOptions;
pub use subset::{describe_subset, SubsetDescription};
