//! Relative frequency of each cell population within its sample.
//!
//! Each count is divided by the total count of its sample and expressed as a
//! percentage, so the populations of one sample sum to 100. Frequencies are
//! derived on every read and never stored.

use crate::data::{CellCount, CountTable};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Frequency of one population in one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRow {
    pub sample: String,
    pub total_count: u64,
    pub population: String,
    pub count: u64,
    /// `count / total_count * 100`; NaN when the sample total is zero.
    pub percentage: f64,
}

/// Frequencies for every (sample, population) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrequencySummary {
    rows: Vec<FrequencyRow>,
    populations: Vec<String>,
}

impl FrequencySummary {
    /// Build a summary from rows. Population order follows first appearance.
    pub fn from_rows(rows: Vec<FrequencyRow>) -> Self {
        let mut populations: Vec<String> = Vec::new();
        for r in &rows {
            if !populations.contains(&r.population) {
                populations.push(r.population.clone());
            }
        }
        Self { rows, populations }
    }

    /// All rows, ordered by sample then population.
    pub fn rows(&self) -> &[FrequencyRow] {
        &self.rows
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &FrequencyRow> {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Population names.
    pub fn populations(&self) -> &[String] {
        &self.populations
    }

    /// Sample IDs in row order.
    pub fn sample_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(r.sample.as_str()))
            .map(|r| r.sample.as_str())
            .collect()
    }

    /// Rows belonging to one sample.
    pub fn for_sample<'a>(&'a self, sample: &'a str) -> impl Iterator<Item = &'a FrequencyRow> + 'a {
        self.rows.iter().filter(move |r| r.sample == sample)
    }

    /// Rows belonging to one population.
    pub fn for_population<'a>(
        &'a self,
        population: &'a str,
    ) -> impl Iterator<Item = &'a FrequencyRow> + 'a {
        self.rows.iter().filter(move |r| r.population == population)
    }

    /// Samples whose total count is zero, and whose percentages are undefined.
    pub fn undefined_samples(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| r.total_count == 0 && seen.insert(r.sample.as_str()))
            .map(|r| r.sample.as_str())
            .collect()
    }

    /// Sum of percentages per sample.
    pub fn percentage_sums(&self) -> Vec<(String, f64)> {
        let mut sums: HashMap<&str, f64> = HashMap::new();
        for r in &self.rows {
            *sums.entry(r.sample.as_str()).or_insert(0.0) += r.percentage;
        }
        self.sample_ids()
            .into_iter()
            .map(|id| (id.to_string(), sums[id]))
            .collect()
    }

    /// Keep only rows matching a predicate.
    pub fn retain_where<F>(&self, keep: F) -> Self
    where
        F: FnMut(&&FrequencyRow) -> bool,
    {
        let rows: Vec<FrequencyRow> = self.rows.iter().filter(keep).cloned().collect();
        Self {
            rows,
            populations: self.populations.clone(),
        }
    }

    /// Write rows as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for r in &self.rows {
            wtr.serialize(r)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write rows to a CSV file.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(File::create(path)?)
    }
}

/// Compute per-(sample, population) percentages from raw counts.
///
/// # Formula
/// For sample j and population i: `pct(i, j) = count(i, j) / sum_i count(i, j) * 100`
///
/// A sample with zero total count gets NaN percentages; it is reported by
/// [`FrequencySummary::undefined_samples`] rather than rejected.
pub fn summarize_frequencies(counts: &CountTable) -> FrequencySummary {
    let totals = counts.sample_totals();
    let population_rank: HashMap<&str, usize> = counts
        .populations()
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();

    let mut by_sample: HashMap<&str, Vec<&CellCount>> = HashMap::new();
    for r in counts.records() {
        by_sample.entry(r.sample_id.as_str()).or_default().push(r);
    }

    let mut rows = Vec::with_capacity(counts.len());
    for sample_id in counts.sample_ids() {
        let total = totals.get(sample_id).copied().unwrap_or(0);
        if total == 0 {
            warn!(sample = sample_id, "sample has zero total count; percentages are undefined");
        }
        let mut records = by_sample.remove(sample_id).unwrap_or_default();
        records.sort_by_key(|r| population_rank.get(r.cell_type.as_str()).copied());

        for r in records {
            rows.push(FrequencyRow {
                sample: sample_id.to_string(),
                total_count: total,
                population: r.cell_type.clone(),
                count: r.count,
                percentage: r.count as f64 / total as f64 * 100.0,
            });
        }
    }

    debug!(rows = rows.len(), "computed frequency summary");
    FrequencySummary {
        rows,
        populations: counts.populations().to_vec(),
    }
}
