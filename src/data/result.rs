//! Result types for responder vs non-responder comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default significance threshold.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Statistical test used for a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMethod {
    /// Two-sided Mann-Whitney U (rank-sum) test on independent samples.
    MannWhitney,
    /// Linear mixed model with a random intercept per subject.
    MixedModel,
}

impl TestMethod {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MannWhitney => "Mann-Whitney U",
            Self::MixedModel => "linear mixed model",
        }
    }
}

impl fmt::Display for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of testing one population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    /// The test ran.
    Tested {
        statistic: f64,
        p_value: f64,
        significant: bool,
    },
    /// Not enough observations for the chosen test.
    InsufficientData,
    /// The mixed model could not be fitted.
    ModelFitError,
}

impl TestOutcome {
    /// Build a tested outcome, flagging significance at `alpha`.
    pub fn tested(statistic: f64, p_value: f64, alpha: f64) -> Self {
        Self::Tested {
            statistic,
            p_value,
            significant: p_value < alpha,
        }
    }

    /// P-value, if the test ran.
    pub fn p_value(&self) -> Option<f64> {
        match self {
            Self::Tested { p_value, .. } => Some(*p_value),
            _ => None,
        }
    }

    /// Check if the population was flagged significant.
    pub fn is_significant(&self) -> bool {
        matches!(self, Self::Tested { significant: true, .. })
    }

    /// Short label used in reports.
    pub fn label(&self) -> String {
        match self {
            Self::Tested {
                p_value,
                significant,
                ..
            } => {
                if *significant {
                    format!("{:.4} (significant)", p_value)
                } else {
                    format!("{:.4}", p_value)
                }
            }
            Self::InsufficientData => "insufficient data".to_string(),
            Self::ModelFitError => "error in model fitting".to_string(),
        }
    }
}

/// Comparison of one cell population between responders and non-responders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationComparison {
    /// Cell population name.
    pub population: String,
    /// Test that was (or would have been) applied.
    pub method: TestMethod,
    /// Observations from responders.
    pub n_responders: usize,
    /// Observations from non-responders.
    pub n_non_responders: usize,
    /// Median percentage among responders (NaN when empty).
    pub median_responders: f64,
    /// Median percentage among non-responders (NaN when empty).
    pub median_non_responders: f64,
    /// Test outcome.
    pub outcome: TestOutcome,
}

impl PopulationComparison {
    /// P-value, if the test ran.
    pub fn p_value(&self) -> Option<f64> {
        self.outcome.p_value()
    }

    /// Check if flagged significant.
    pub fn is_significant(&self) -> bool {
        self.outcome.is_significant()
    }
}

/// Counts of outcomes across populations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total: usize,
    pub tested: usize,
    pub significant: usize,
    pub insufficient_data: usize,
    pub fit_errors: usize,
}

impl ComparisonSummary {
    /// Tally outcomes.
    pub fn from_results(results: &[PopulationComparison]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };
        for r in results {
            match &r.outcome {
                TestOutcome::Tested { significant, .. } => {
                    summary.tested += 1;
                    if *significant {
                        summary.significant += 1;
                    }
                }
                TestOutcome::InsufficientData => summary.insufficient_data += 1,
                TestOutcome::ModelFitError => summary.fit_errors += 1,
            }
        }
        summary
    }
}

impl fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Populations:        {}", self.total)?;
        writeln!(f, "Tested:             {}", self.tested)?;
        writeln!(f, "Significant:        {}", self.significant)?;
        writeln!(f, "Insufficient data:  {}", self.insufficient_data)?;
        writeln!(f, "Model fit errors:   {}", self.fit_errors)?;
        Ok(())
    }
}
