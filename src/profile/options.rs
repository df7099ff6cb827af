//! Distinct filter values present in the data.

use crate::data::{CountTable, SampleTable};
use crate::filter::SampleFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Values available for each filter dimension, sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub conditions: Vec<String>,
    pub treatments: Vec<String>,
    pub sample_types: Vec<String>,
    pub timepoints: Vec<i64>,
    pub samples: Vec<String>,
    pub populations: Vec<String>,
}

impl FilterOptions {
    /// Collect options from the stored tables.
    pub fn collect(samples: &SampleTable, counts: &CountTable) -> Self {
        Self {
            conditions: sorted_distinct(samples.iter().map(|s| s.condition.as_str())),
            treatments: sorted_distinct(samples.iter().map(|s| s.treatment.as_str())),
            sample_types: sorted_distinct(samples.iter().map(|s| s.sample_type.as_str())),
            timepoints: samples
                .iter()
                .filter_map(|s| s.time_from_treatment_start)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            samples: sorted_distinct(samples.iter().map(|s| s.sample_id.as_str())),
            populations: sorted_distinct(counts.populations().iter().map(String::as_str)),
        }
    }

    /// Keep only the candidates that occur in `available`.
    ///
    /// Used to fall back to no constraint when a default value is absent.
    pub fn present<T: PartialEq + Clone>(candidates: &[T], available: &[T]) -> Vec<T> {
        candidates
            .iter()
            .filter(|c| available.contains(c))
            .cloned()
            .collect()
    }

    /// Drop filter values that do not occur in the data.
    ///
    /// A dimension left with no values places no constraint.
    pub fn restrict(&self, filter: &SampleFilter) -> SampleFilter {
        let keep = |wanted: &Option<Vec<String>>, available: &[String]| {
            Self::present(wanted.as_deref().unwrap_or(&[]), available)
        };
        SampleFilter::new()
            .with_conditions(keep(&filter.conditions, &self.conditions))
            .with_treatments(keep(&filter.treatments, &self.treatments))
            .with_sample_types(keep(&filter.sample_types, &self.sample_types))
            .with_timepoints(Self::present(
                filter.timepoints.as_deref().unwrap_or(&[]),
                &self.timepoints,
            ))
    }
}

fn sorted_distinct<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl std::fmt::Display for FilterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let timepoints: Vec<String> = self.timepoints.iter().map(|t| t.to_string()).collect();
        writeln!(f, "Filter Options")?;
        writeln!(f, "  Conditions:   {}", self.conditions.join(", "))?;
        writeln!(f, "  Treatments:   {}", self.treatments.join(", "))?;
        writeln!(f, "  Sample types: {}", self.sample_types.join(", "))?;
        writeln!(f, "  Timepoints:   {}", timepoints.join(", "))?;
        writeln!(f, "  Populations:  {}", self.populations.join(", "))?;
        writeln!(f, "  Samples:      {}", self.samples.len())?;
        Ok(())
    }
}
