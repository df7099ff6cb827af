//! Import of the wide cell-count CSV.
//!
//! One row per sample. The ten metadata columns are fixed; every other
//! column is a cell population holding that sample's raw count.

use crate::data::{CountTable, Response, Sample, SampleTable};
use crate::error::{CellFreqError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Metadata columns every input file must carry.
pub const METADATA_COLUMNS: [&str; 10] = [
    "sample",
    "project",
    "subject",
    "condition",
    "age",
    "sex",
    "treatment",
    "response",
    "sample_type",
    "time_from_treatment_start",
];

/// Samples and counts read from one input file.
#[derive(Debug, Clone)]
pub struct ImportedData {
    pub samples: SampleTable,
    pub counts: CountTable,
}

impl ImportedData {
    /// Population names in column order.
    pub fn populations(&self) -> &[String] {
        self.counts.populations()
    }
}

/// Read a cell-count CSV file.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<ImportedData> {
    let path = path.as_ref();
    info!(path = %path.display(), "reading cell-count CSV");
    read_csv_from(File::open(path)?)
}

/// Read cell-count CSV data from any reader.
pub fn read_csv_from<R: Read>(reader: R) -> Result<ImportedData> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column_index: HashMap<&str, usize> =
        headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

    let mut meta_idx = [0usize; METADATA_COLUMNS.len()];
    for (slot, name) in meta_idx.iter_mut().zip(METADATA_COLUMNS) {
        *slot = *column_index
            .get(name)
            .ok_or_else(|| CellFreqError::MissingColumn(name.to_string()))?;
    }

    let population_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !METADATA_COLUMNS.contains(h))
        .map(|(i, h)| (i, h.to_string()))
        .collect();
    if population_columns.is_empty() {
        return Err(CellFreqError::EmptyData(
            "Input has no cell population columns".to_string(),
        ));
    }

    let mut samples = SampleTable::new();
    let mut counts = CountTable::new();

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let field = |k: usize| record.get(meta_idx[k]).unwrap_or("");
        let optional_int = |k: usize| {
            let raw = field(k);
            parse_optional_int(raw).unwrap_or_else(|| {
                warn!(
                    line,
                    column = METADATA_COLUMNS[k],
                    value = raw,
                    "not an integer; treating as missing"
                );
                None
            })
        };

        let sample = Sample {
            sample_id: field(0).to_string(),
            project: field(1).to_string(),
            subject: field(2).to_string(),
            condition: field(3).to_string(),
            age: optional_int(4),
            sex: field(5).to_string(),
            treatment: field(6).to_string(),
            response: Response::parse(field(7)),
            sample_type: field(8).to_string(),
            time_from_treatment_start: optional_int(9),
        };
        if sample.sample_id.is_empty() {
            return Err(CellFreqError::InvalidParameter(format!(
                "Empty sample ID at line {}",
                line
            )));
        }

        for (col, name) in &population_columns {
            let raw = record.get(*col).unwrap_or("");
            let count = parse_count(raw).ok_or_else(|| CellFreqError::InvalidCount {
                value: raw.to_string(),
                row: line,
                column: name.clone(),
            })?;
            counts.push(&sample.sample_id, name, count);
        }
        samples.insert(sample)?;
    }

    if samples.is_empty() {
        return Err(CellFreqError::EmptyData("No samples in input".to_string()));
    }

    debug!(
        samples = samples.len(),
        populations = population_columns.len(),
        "parsed cell-count CSV"
    );
    Ok(ImportedData { samples, counts })
}

/// Parse an optional integer, tolerating float renderings such as `7.0`.
///
/// Empty and `NA` give `Some(None)`; a value that is not an integer gives `None`.
fn parse_optional_int(raw: &str) -> Option<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
        return Some(None);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Some(Some(v));
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(Some(v as i64)),
        _ => None,
    }
}

fn parse_count(raw: &str) -> Option<u64> {
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}
