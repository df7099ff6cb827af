//! Description of a filtered cohort.

use crate::data::SampleTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sample and subject counts of a metadata subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsetDescription {
    /// Total samples in the subset.
    pub n_samples: usize,
    /// Distinct subjects in the subset.
    pub n_subjects: usize,
    /// Samples per project.
    pub samples_per_project: BTreeMap<String, usize>,
    /// Distinct subjects per response (`yes` / `no`); missing responses are not counted.
    pub subjects_per_response: BTreeMap<String, usize>,
    /// Distinct subjects per sex.
    pub subjects_per_sex: BTreeMap<String, usize>,
}

impl SubsetDescription {
    /// Check if the subset has no samples.
    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }

    /// Subjects classified as responders.
    pub fn responders(&self) -> usize {
        self.subjects_per_response.get("yes").copied().unwrap_or(0)
    }

    /// Subjects classified as non-responders.
    pub fn non_responders(&self) -> usize {
        self.subjects_per_response.get("no").copied().unwrap_or(0)
    }
}

impl std::fmt::Display for SubsetDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Subset Summary")?;
        writeln!(f, "  Samples:  {}", self.n_samples)?;
        writeln!(f, "  Subjects: {}", self.n_subjects)?;
        writeln!(f, "  Samples per project:")?;
        for (k, v) in &self.samples_per_project {
            writeln!(f, "    {:<16} {}", k, v)?;
        }
        writeln!(f, "  Subjects per response:")?;
        for (k, v) in &self.subjects_per_response {
            writeln!(f, "    {:<16} {}", k, v)?;
        }
        writeln!(f, "  Subjects per sex:")?;
        for (k, v) in &self.subjects_per_sex {
            writeln!(f, "    {:<16} {}", k, v)?;
        }
        Ok(())
    }
}

/// Count samples per project and distinct subjects per response and sex.
///
/// A subject that appears with more than one value (e.g. a sex recorded
/// inconsistently across samples) is counted once under each value.
pub fn describe_subset(samples: &SampleTable) -> SubsetDescription {
    let mut samples_per_project: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_response: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    let mut by_sex: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    let mut subjects: BTreeSet<&str> = BTreeSet::new();

    for s in samples.iter() {
        *samples_per_project.entry(s.project.clone()).or_default() += 1;
        subjects.insert(&s.subject);
        if let Some(response) = s.response.as_stored() {
            by_response
                .entry(response.to_string())
                .or_default()
                .insert(&s.subject);
        }
        by_sex.entry(s.sex.clone()).or_default().insert(&s.subject);
    }

    let sizes = |m: BTreeMap<String, BTreeSet<&str>>| -> BTreeMap<String, usize> {
        m.into_iter().map(|(k, v)| (k, v.len())).collect()
    };

    SubsetDescription {
        n_samples: samples.len(),
        n_subjects: subjects.len(),
        samples_per_project,
        subjects_per_response: sizes(by_response),
        subjects_per_sex: sizes(by_sex),
    }
}
