//! Immune Cell Frequency Analysis Library
//!
//! This library turns raw per-sample immune cell counts into population
//! frequencies and compares them between treatment responders and
//! non-responders.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (SampleTable, CountTable, comparison results)
//! - **io**: CSV import and the SQLite study database
//! - **normalize**: Frequency summarization (percentage of sample total)
//! - **filter**: Cohort selection by condition, treatment, sample type and timepoint
//! - **model**: Random-intercept linear mixed model
//! - **test**: Mann-Whitney U, mixed-model Wald test, response group comparison
//! - **profile**: Subset description, distribution summaries, filter options
//! - **config**: Dashboard configuration
//! - **report**: Text, JSON and YAML rendering
//!
//! # Example
//!
//! ```no_run
//! use cell_frequency::prelude::*;
//!
//! let store = Store::open_or_import("database.db", "cell-count.csv").unwrap();
//! let samples = store.load_samples().unwrap();
//! let frequencies = summarize_frequencies(&store.load_counts().unwrap());
//!
//! let filter = SampleFilter::new()
//!     .with_conditions(["melanoma"])
//!     .with_treatments(["miraclib"])
//!     .with_sample_types(["PBMC"]);
//! let report = compare_response_groups(
//!     &frequencies,
//!     &samples,
//!     &filter,
//!     DEFAULT_ALPHA,
//!     &LmmConfig::default(),
//! )
//! .unwrap();
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod io;
pub mod model;
pub mod normalize;
pub mod profile;
pub mod report;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::config::DashboardConfig;
    pub use crate::data::{
        CellCount, ComparisonSummary, CountTable, PopulationComparison, Response, Sample,
        SampleTable, TestMethod, TestOutcome, DEFAULT_ALPHA,
    };
    pub use crate::error::{CellFreqError, Result};
    pub use crate::filter::{filter_frequencies, filter_samples, FrequencyFilter, SampleFilter};
    pub use crate::io::{read_csv, ImportedData, Store};
    pub use crate::model::{model_lmm, LmmConfig, LmmFit, RandomIntercept};
    pub use crate::normalize::{summarize_frequencies, FrequencyRow, FrequencySummary};
    pub use crate::profile::{
        describe_subset, summarize_distributions, FilterOptions, FiveNumber, GroupDistribution,
        SubsetDescription,
    };
    pub use crate::report::{render, OutputFormat, TextReport};
    pub use crate::test::{
        compare_response_groups, mann_whitney_u, test_mixed_response, ComparisonReport,
        MannWhitneyResult, MixedModelResult,
    };
}
