//! Rendering of dashboard views as text, JSON or YAML.

use crate::error::{CellFreqError, Result};
use crate::normalize::FrequencySummary;
use crate::profile::{FilterOptions, SubsetDescription};
use crate::test::ComparisonReport;
use serde::Serialize;
use std::fmt::Write;
use std::str::FromStr;

/// Output format for rendered views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = CellFreqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(CellFreqError::InvalidParameter(format!(
                "Unknown output format '{}'. Expected text, json or yaml",
                other
            ))),
        }
    }
}

/// Human-readable rendering of a view.
pub trait TextReport {
    fn to_text(&self) -> String;
}

/// Render a view in the requested format.
pub fn render<T: Serialize + TextReport>(view: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(view.to_text()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(view)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(view)?),
    }
}

fn fmt_pct(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}", v)
    } else {
        "NA".to_string()
    }
}

impl TextReport for FrequencySummary {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<12} {:>12} {:<16} {:>10} {:>10}",
            "sample", "total_count", "population", "count", "percentage"
        );
        for r in self.iter() {
            let _ = writeln!(
                out,
                "{:<12} {:>12} {:<16} {:>10} {:>10}",
                r.sample,
                r.total_count,
                r.population,
                r.count,
                fmt_pct(r.percentage)
            );
        }
        let _ = writeln!(
            out,
            "\n{} rows, {} samples, {} populations",
            self.len(),
            self.sample_ids().len(),
            self.populations().len()
        );
        out
    }
}

impl TextReport for ComparisonReport {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Responders vs Non-responders ({})", self.method);
        let _ = writeln!(
            out,
            "  {} samples from {} subjects, alpha = {}\n",
            self.n_samples, self.n_subjects, self.alpha
        );
        let _ = writeln!(
            out,
            "{:<16} {:>6} {:>6} {:>10} {:>10}  {}",
            "population", "n_yes", "n_no", "med_yes", "med_no", "p-value"
        );
        for r in &self.results {
            let _ = writeln!(
                out,
                "{:<16} {:>6} {:>6} {:>10} {:>10}  {}",
                r.population,
                r.n_responders,
                r.n_non_responders,
                fmt_pct(r.median_responders),
                fmt_pct(r.median_non_responders),
                r.outcome.label()
            );
        }

        if !self.distributions.is_empty() {
            let _ = writeln!(out, "\nDistribution (percentage)");
            let _ = writeln!(
                out,
                "{:<16} {:<9} {:>4} {:>8} {:>8} {:>8} {:>8} {:>8}",
                "population", "response", "n", "min", "q1", "median", "q3", "max"
            );
            for d in &self.distributions {
                let s = &d.summary;
                let _ = writeln!(
                    out,
                    "{:<16} {:<9} {:>4} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
                    d.population, d.response, s.n, s.min, s.q1, s.median, s.q3, s.max
                );
            }
        }

        let _ = writeln!(out);
        let _ = write!(out, "{}", self.summary);
        out
    }
}

impl TextReport for SubsetDescription {
    fn to_text(&self) -> String {
        self.to_string()
    }
}

impl TextReport for FilterOptions {
    fn to_text(&self) -> String {
        self.to_string()
    }
}
