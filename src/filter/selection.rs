//! Set-membership filters over sample metadata and frequency rows.
//!
//! Every dimension is optional. A dimension that is absent, or present with an
//! empty set, places no constraint; the remaining dimensions are combined by
//! conjunction.

use crate::data::{Sample, SampleTable};
use crate::normalize::FrequencySummary;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Filter over study metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_types: Option<Vec<String>>,
    /// Days from treatment start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timepoints: Option<Vec<i64>>,
}

fn constraint<T, I>(values: I) -> Option<Vec<T>>
where
    I: IntoIterator<Item = T>,
{
    let values: Vec<T> = values.into_iter().collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn admits<T: PartialEq>(allowed: &Option<Vec<T>>, value: &T) -> bool {
    match allowed {
        Some(set) if !set.is_empty() => set.contains(value),
        _ => true,
    }
}

impl SampleFilter {
    /// A filter with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conditions<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = constraint(values.into_iter().map(Into::into));
        self
    }

    pub fn with_treatments<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.treatments = constraint(values.into_iter().map(Into::into));
        self
    }

    pub fn with_sample_types<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sample_types = constraint(values.into_iter().map(Into::into));
        self
    }

    pub fn with_timepoints<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        self.timepoints = constraint(values);
        self
    }

    /// Check whether a sample satisfies every constraint.
    ///
    /// A sample without a timepoint never satisfies a timepoint constraint.
    pub fn matches(&self, sample: &Sample) -> bool {
        admits(&self.conditions, &sample.condition)
            && admits(&self.treatments, &sample.treatment)
            && admits(&self.sample_types, &sample.sample_type)
            && match (&self.timepoints, sample.time_from_treatment_start) {
                (Some(set), Some(t)) if !set.is_empty() => set.contains(&t),
                (Some(set), None) if !set.is_empty() => false,
                _ => true,
            }
    }

    /// The selected timepoint, when exactly one distinct timepoint is selected.
    pub fn single_timepoint(&self) -> Option<i64> {
        let set: HashSet<i64> = self.timepoints.iter().flatten().copied().collect();
        if set.len() == 1 {
            set.into_iter().next()
        } else {
            None
        }
    }

    /// Check if no dimension is constrained.
    pub fn is_unconstrained(&self) -> bool {
        let empty = |o: &Option<Vec<String>>| o.as_ref().map_or(true, Vec::is_empty);
        empty(&self.conditions)
            && empty(&self.treatments)
            && empty(&self.sample_types)
            && self.timepoints.as_ref().map_or(true, Vec::is_empty)
    }
}

/// Filter over frequency rows by sample and population (Overview view).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub populations: Option<Vec<String>>,
}

impl FrequencyFilter {
    /// A filter with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.samples = constraint(values.into_iter().map(Into::into));
        self
    }

    pub fn with_populations<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populations = constraint(values.into_iter().map(Into::into));
        self
    }

    /// Apply the filter to a frequency summary.
    pub fn apply(&self, summary: &FrequencySummary) -> FrequencySummary {
        summary.retain_where(|r| {
            admits(&self.samples, &r.sample) && admits(&self.populations, &r.population)
        })
    }
}

/// Keep the samples matching a filter.
pub fn filter_samples(samples: &SampleTable, filter: &SampleFilter) -> SampleTable {
    let kept = samples.retain_where(|s| filter.matches(s));
    debug!(before = samples.len(), after = kept.len(), "filtered samples");
    kept
}

/// Join frequencies with metadata and keep rows whose sample matches a filter.
///
/// Rows whose sample has no metadata are dropped (inner join).
pub fn filter_frequencies(
    summary: &FrequencySummary,
    samples: &SampleTable,
    filter: &SampleFilter,
) -> FrequencySummary {
    let kept = summary.retain_where(|r| samples.get(&r.sample).is_some_and(|s| filter.matches(s)));
    debug!(before = summary.len(), after = kept.len(), "filtered frequency rows");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{test_sample, CountTable, Response};
    use crate::normalize::summarize_frequencies;

    fn create_test_samples() -> SampleTable {
        let mut s2 = test_sample("S2", "A", Response::Responder, Some(7));
        s2.sample_type = "WB".to_string();
        let mut s3 = test_sample("S3", "B", Response::NonResponder, Some(0));
        s3.condition = "carcinoma".to_string();
        let mut s4 = test_sample("S4", "C", Response::NonResponder, None);
        s4.treatment = "phauximab".to_string();

        SampleTable::from_samples(vec![
            test_sample("S1", "A", Response::Responder, Some(0)),
            s2,
            s3,
            s4,
        ])
        .unwrap()
    }

    fn create_test_summary() -> FrequencySummary {
        let mut counts = CountTable::new();
        for id in ["S1", "S2", "S3", "S4", "S5"] {
            counts.push(id, "b_cell", 10);
            counts.push(id, "nk_cell", 30);
        }
        summarize_frequencies(&counts)
    }

    #[test]
    fn test_unconstrained_keeps_everything() {
        let samples = create_test_samples();
        let filter = SampleFilter::new();
        assert!(filter.is_unconstrained());
        assert_eq!(filter_samples(&samples, &filter).len(), 4);
    }

    #[test]
    fn test_empty_set_is_no_constraint() {
        let samples = create_test_samples();
        let filter = SampleFilter::new().with_conditions(Vec::<String>::new());
        assert!(filter.conditions.is_none());
        assert_eq!(filter_samples(&samples, &filter).len(), 4);

        let explicit = SampleFilter {
            conditions: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(filter_samples(&samples, &explicit).len(), 4);
    }

    #[test]
    fn test_conjunction() {
        let samples = create_test_samples();
        let filter = SampleFilter::new()
            .with_conditions(["melanoma"])
            .with_treatments(["miraclib"])
            .with_sample_types(["PBMC"]);

        let kept = filter_samples(&samples, &filter);
        assert_eq!(kept.sample_ids(), vec!["S1"]);
    }

    #[test]
    fn test_missing_timepoint_never_matches() {
        let samples = create_test_samples();
        let filter = SampleFilter::new().with_timepoints([0, 7]);
        let kept = filter_samples(&samples, &filter);
        assert_eq!(kept.sample_ids(), vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn test_single_timepoint() {
        assert_eq!(SampleFilter::new().single_timepoint(), None);
        assert_eq!(SampleFilter::new().with_timepoints([0]).single_timepoint(), Some(0));
        assert_eq!(SampleFilter::new().with_timepoints([7, 7]).single_timepoint(), Some(7));
        assert_eq!(SampleFilter::new().with_timepoints([0, 7]).single_timepoint(), None);
    }

    #[test]
    fn test_filter_is_subset_and_idempotent() {
        let samples = create_test_samples();
        let summary = create_test_summary();
        let filter = SampleFilter::new().with_conditions(["melanoma"]).with_timepoints([0, 7]);

        let once = filter_frequencies(&summary, &samples, &filter);
        let twice = filter_frequencies(&once, &samples, &filter);

        assert!(once.iter().all(|r| summary.rows().contains(r)));
        assert_eq!(once.rows(), twice.rows());
        assert_eq!(once.sample_ids(), vec!["S1", "S2"]);
    }

    #[test]
    fn test_rows_without_metadata_are_dropped() {
        let samples = create_test_samples();
        let summary = create_test_summary();
        let kept = filter_frequencies(&summary, &samples, &SampleFilter::new());
        assert!(!kept.sample_ids().contains(&"S5"));
        assert_eq!(kept.len(), 8);
    }

    #[test]
    fn test_frequency_filter() {
        let summary = create_test_summary();
        let filter = FrequencyFilter::new()
            .with_samples(["S1", "S3"])
            .with_populations(["nk_cell"]);

        let kept = filter.apply(&summary);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.population == "nk_cell"));

        let again = filter.apply(&kept);
        assert_eq!(kept.rows(), again.rows());
    }

    #[test]
    fn test_filter_yaml() {
        let yaml = "conditions: [melanoma]\ntimepoints: [0]\n";
        let filter: SampleFilter = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(filter.conditions, Some(vec!["melanoma".to_string()]));
        assert_eq!(filter.treatments, None);
        assert_eq!(filter.single_timepoint(), Some(0));
    }
}
