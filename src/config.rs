//! Dashboard configuration.
//!
//! Every field has a default, so a YAML file only needs to name what it
//! changes. Command-line flags override values read from the file.

use crate::data::DEFAULT_ALPHA;
use crate::error::{CellFreqError, Result};
use crate::filter::SampleFilter;
use crate::model::lmm::LmmConfig;
use crate::profile::FilterOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for the command-line dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// SQLite database file.
    pub database: PathBuf,
    /// CSV imported when the database does not exist yet.
    pub csv: PathBuf,
    /// Significance threshold.
    pub alpha: f64,
    /// Mixed model settings.
    pub lmm: LmmConfig,
    /// Cohort selected by the subset view when no filter flag is given.
    pub subset_defaults: SampleFilter,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("database.db"),
            csv: PathBuf::from("cell-count.csv"),
            alpha: DEFAULT_ALPHA,
            lmm: LmmConfig::default(),
            subset_defaults: SampleFilter::new()
                .with_conditions(["melanoma"])
                .with_treatments(["miraclib"])
                .with_sample_types(["PBMC"])
                .with_timepoints([0]),
        }
    }
}

impl DashboardConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CellFreqError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Filter for the subset view.
    ///
    /// An explicit selection is used as given. With no selection, the
    /// configured defaults apply, minus any value absent from the data.
    pub fn subset_filter(&self, selected: &SampleFilter, options: &FilterOptions) -> SampleFilter {
        if selected.is_unconstrained() {
            options.restrict(&self.subset_defaults)
        } else {
            selected.clone()
        }
    }

    /// Check that values are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(CellFreqError::InvalidParameter(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        let (lo, hi) = self.lmm.log_ratio_bounds;
        if lo >= hi || self.lmm.grid_points < 3 {
            return Err(CellFreqError::InvalidParameter(
                "lmm.log_ratio_bounds must be increasing and lmm.grid_points at least 3"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
