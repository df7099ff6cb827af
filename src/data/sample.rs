//! Sample metadata: one row per sample, keyed by sample ID.

use crate::error::{CellFreqError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Treatment outcome of the subject a sample was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Responder,
    NonResponder,
    Missing,
}

impl Response {
    /// Parse a raw response value.
    ///
    /// Accepts `yes`/`y`/`true`/`1` and `no`/`n`/`false`/`0` in any case.
    /// Everything else (including empty and `NA`) is missing.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => Self::Responder,
            "no" | "n" | "false" | "0" => Self::NonResponder,
            _ => Self::Missing,
        }
    }

    /// Storage encoding: `yes`, `no`, or `None` for missing.
    pub fn as_stored(&self) -> Option<&'static str> {
        match self {
            Self::Responder => Some("yes"),
            Self::NonResponder => Some("no"),
            Self::Missing => None,
        }
    }

    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Responder => "yes",
            Self::NonResponder => "no",
            Self::Missing => "missing",
        }
    }

    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Metadata for a single sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub sample_id: String,
    pub project: String,
    pub subject: String,
    pub condition: String,
    pub age: Option<i64>,
    pub sex: String,
    pub treatment: String,
    pub response: Response,
    pub sample_type: String,
    /// Days since treatment start.
    pub time_from_treatment_start: Option<i64>,
}

/// All samples of a study, in import order.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    samples: Vec<Sample>,
    index: HashMap<String, usize>,
}

impl SampleTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from samples, rejecting duplicate IDs.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        let mut table = Self::new();
        for sample in samples {
            table.insert(sample)?;
        }
        Ok(table)
    }

    /// Add a sample. Sample IDs are the primary key.
    pub fn insert(&mut self, sample: Sample) -> Result<()> {
        if self.index.contains_key(&sample.sample_id) {
            return Err(CellFreqError::DuplicateSample(sample.sample_id));
        }
        self.index.insert(sample.sample_id.clone(), self.samples.len());
        self.samples.push(sample);
        Ok(())
    }

    /// Look up a sample by ID.
    pub fn get(&self, sample_id: &str) -> Option<&Sample> {
        self.index.get(sample_id).map(|&i| &self.samples[i])
    }

    /// Check if a sample exists.
    pub fn contains(&self, sample_id: &str) -> bool {
        self.index.contains_key(sample_id)
    }

    /// All samples in order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterate over samples.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.sample_id.as_str()).collect()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Keep only samples matching a predicate, preserving order.
    pub fn retain_where<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Sample) -> bool,
    {
        let samples: Vec<Sample> = self.samples.iter().filter(|s| keep(s)).cloned().collect();
        let index = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.sample_id.clone(), i))
            .collect();
        Self { samples, index }
    }
}

#[cfg(test)]
pub(crate) fn sample(
    id: &str,
    subject: &str,
    response: Response,
    timepoint: Option<i64>,
) -> Sample {
    Sample {
        sample_id: id.to_string(),
        project: "prj1".to_string(),
        subject: subject.to_string(),
        condition: "melanoma".to_string(),
        age: Some(50),
        sex: "F".to_string(),
        treatment: "miraclib".to_string(),
        response,
        sample_type: "PBMC".to_string(),
        time_from_treatment_start: timepoint,
    }
}
