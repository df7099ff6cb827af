//! Five-number summaries of population frequencies per response group.
//!
//! These are the numbers a boxplot of responder vs non-responder frequencies
//! is drawn from.

use crate::data::{Response, SampleTable};
use crate::normalize::FrequencySummary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Five-number summary of a set of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiveNumber {
    pub n: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumber {
    /// Summarize a set of values; `None` when no finite value is present.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            n: sorted.len(),
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }

    /// Interquartile range.
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Quantile of sorted values, interpolating linearly between order statistics.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Median of unsorted values, NaN when empty.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, 0.5)
}

/// Distribution of one population within one response group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDistribution {
    pub population: String,
    pub response: Response,
    pub summary: FiveNumber,
}

/// Summarize frequencies per population and response group.
///
/// Output is ordered by population, responders before non-responders. Samples
/// with a missing response, missing metadata or an undefined percentage are
/// skipped; a group with no values is omitted.
pub fn summarize_distributions(
    summary: &FrequencySummary,
    samples: &SampleTable,
) -> Vec<GroupDistribution> {
    let mut groups: HashMap<(&str, Response), Vec<f64>> = HashMap::new();
    for row in summary.iter() {
        let Some(sample) = samples.get(&row.sample) else {
            continue;
        };
        if sample.response.is_missing() || !row.percentage.is_finite() {
            continue;
        }
        groups
            .entry((row.population.as_str(), sample.response))
            .or_default()
            .push(row.percentage);
    }

    let mut out = Vec::new();
    for population in summary.populations() {
        for response in [Response::Responder, Response::NonResponder] {
            let summary = groups
                .get(&(population.as_str(), response))
                .and_then(|v| FiveNumber::from_values(v));
            if let Some(summary) = summary {
                out.push(GroupDistribution {
                    population: population.clone(),
                    response,
                    summary,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{test_sample, CountTable};
    use crate::normalize::summarize_frequencies;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantiles_interpolate() {
        let s = FiveNumber::from_values(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.n, 4);
        assert_eq!(s.min, 1.0);
        assert_relative_eq!(s.q1, 1.75);
        assert_relative_eq!(s.median, 2.5);
        assert_relative_eq!(s.q3, 3.25);
        assert_eq!(s.max, 4.0);
        assert_relative_eq!(s.iqr(), 1.5);
    }

    #[test]
    fn test_single_value_and_empty() {
        let s = FiveNumber::from_values(&[7.0]).unwrap();
        assert_eq!(s.q1, 7.0);
        assert_eq!(s.q3, 7.0);
        assert!(FiveNumber::from_values(&[]).is_none());
        assert!(FiveNumber::from_values(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_grouped_by_response() {
        let samples = SampleTable::from_samples(vec![
            test_sample("S1", "A", Response::Responder, Some(0)),
            test_sample("S2", "B", Response::Responder, Some(0)),
            test_sample("S3", "C", Response::NonResponder, Some(0)),
            test_sample("S4", "D", Response::Missing, Some(0)),
        ])
        .unwrap();
        let mut counts = CountTable::new();
        for (id, b) in [("S1", 10), ("S2", 30), ("S3", 50), ("S4", 70)] {
            counts.push(id, "b_cell", b);
            counts.push(id, "nk_cell", 100 - b);
        }
        let freq = summarize_frequencies(&counts);

        let dists = summarize_distributions(&freq, &samples);
        assert_eq!(dists.len(), 4);
        assert_eq!(dists[0].population, "b_cell");
        assert_eq!(dists[0].response, Response::Responder);
        assert_eq!(dists[0].summary.n, 2);
        assert_relative_eq!(dists[0].summary.median, 20.0);
        assert_eq!(dists[1].response, Response::NonResponder);
        assert_eq!(dists[1].summary.n, 1);
        assert_relative_eq!(dists[3].summary.max, 50.0);
    }
}
