//! Raw cell counts in long format: one record per (sample, population).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Count of one cell population in one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCount {
    pub sample_id: String,
    pub cell_type: String,
    pub count: u64,
}

/// A table of cell counts.
///
/// Records keep insertion order. Population names are tracked in first-seen
/// order so downstream output follows the column order of the input.
#[derive(Debug, Clone, Default)]
pub struct CountTable {
    records: Vec<CellCount>,
    populations: Vec<String>,
}

impl CountTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from existing records.
    pub fn from_records(records: Vec<CellCount>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.push_record(record);
        }
        table
    }

    /// Add a count for a (sample, population) pair.
    pub fn push(&mut self, sample_id: &str, cell_type: &str, count: u64) {
        self.push_record(CellCount {
            sample_id: sample_id.to_string(),
            cell_type: cell_type.to_string(),
            count,
        });
    }

    fn push_record(&mut self, record: CellCount) {
        if !self.populations.iter().any(|p| p == &record.cell_type) {
            self.populations.push(record.cell_type.clone());
        }
        self.records.push(record);
    }

    /// All records.
    pub fn records(&self) -> &[CellCount] {
        &self.records
    }

    /// Population names in first-seen order.
    pub fn populations(&self) -> &[String] {
        &self.populations
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sample IDs in first-seen order.
    pub fn sample_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for r in &self.records {
            if seen.insert(r.sample_id.as_str()) {
                ids.push(r.sample_id.as_str());
            }
        }
        ids
    }

    /// Total count per sample (sum across populations), saturating at `u64::MAX`.
    pub fn sample_totals(&self) -> HashMap<&str, u64> {
        let mut totals: HashMap<&str, u64> = HashMap::new();
        for r in &self.records {
            let total = totals.entry(r.sample_id.as_str()).or_insert(0);
            *total = total.saturating_add(r.count);
        }
        totals
    }

    /// Get the count for a specific sample and population.
    pub fn get(&self, sample_id: &str, cell_type: &str) -> Option<u64> {
        self.records
            .iter()
            .find(|r| r.sample_id == sample_id && r.cell_type == cell_type)
            .map(|r| r.count)
    }
}
