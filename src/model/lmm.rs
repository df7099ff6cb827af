//! Linear Mixed Models (LMM) with a random intercept per group.
//!
//! Fits `y = Xβ + Zu + ε` where `u ~ N(0, τ²I)` and `ε ~ N(0, σ²I)` and `Z`
//! assigns each observation to one group (e.g. the subject it was drawn from).
//!
//! Variance components are estimated by REML. With `γ = τ²/σ²` the covariance
//! is `σ²H`, `H = I + γZZ'`, which is block diagonal with one
//! `I + γJ` block per group. `σ²` and `β` have closed forms given `γ`, so the
//! REML criterion is profiled down to a one-dimensional search over `ln γ`.
//! Every quantity is assembled from per-group sums; the n×n covariance is never
//! formed.
//!
//! # Example
//! ```ignore
//! use cell_frequency::model::lmm::{model_lmm, LmmConfig, RandomIntercept};
//!
//! let groups = RandomIntercept::from_labels(&subjects);
//! let fit = model_lmm(&y, &x, &names, &groups, &LmmConfig::default())?;
//! ```

use crate::error::{CellFreqError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for LMM fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmmConfig {
    /// Maximum golden-section iterations when refining `ln γ`.
    pub max_iter: usize,
    /// Convergence tolerance on the width of the `ln γ` bracket.
    pub tol: f64,
    /// Search range for `ln γ = ln(τ²/σ²)`.
    pub log_ratio_bounds: (f64, f64),
    /// Number of grid points used to bracket the optimum before refinement.
    pub grid_points: usize,
}

impl Default for LmmConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 1e-8,
            log_ratio_bounds: (-20.0, 10.0),
            grid_points: 41,
        }
    }
}

/// Random-intercept grouping: which group each observation belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomIntercept {
    /// Group index of each observation.
    group_of: Vec<usize>,
    /// Group labels in first-seen order.
    labels: Vec<String>,
}

impl RandomIntercept {
    /// Build from one label per observation.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut names = Vec::new();
        let group_of = labels
            .iter()
            .map(|l| {
                let l = l.as_ref();
                *index.entry(l.to_string()).or_insert_with(|| {
                    names.push(l.to_string());
                    names.len() - 1
                })
            })
            .collect();
        Self {
            group_of,
            labels: names,
        }
    }

    /// Number of observations.
    pub fn n_samples(&self) -> usize {
        self.group_of.len()
    }

    /// Number of distinct groups.
    pub fn n_groups(&self) -> usize {
        self.labels.len()
    }

    /// Group labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Results from fitting an LMM to one response vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmmFit {
    /// Fixed effect coefficient names.
    pub coefficient_names: Vec<String>,
    /// Estimated fixed effects coefficients.
    pub coefficients: Vec<f64>,
    /// Standard errors of fixed effects.
    pub std_errors: Vec<f64>,
    /// Variance components: [tau2 (random effect variance), sigma2 (residual variance)].
    pub variance_components: Vec<f64>,
    /// BLUPs for the random intercepts, one per group.
    #[serde(skip)]
    pub random_effects: Vec<f64>,
    /// Profiled REML log-likelihood (up to a constant) at the optimum.
    pub log_reml: f64,
    /// Residual degrees of freedom (n - p).
    pub df_residual: f64,
    /// Number of observations.
    pub n_samples: usize,
    /// Number of groups.
    pub n_groups: usize,
    /// Golden-section iterations used.
    pub iterations: usize,
    /// Whether the search bracket shrank below tolerance.
    pub converged: bool,
    /// Intraclass correlation coefficient: tau2 / (tau2 + sigma2).
    pub icc: f64,
}

impl LmmFit {
    /// Get coefficient index by name.
    pub fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }

    /// Get coefficient by index.
    pub fn get_coefficient(&self, index: usize) -> Option<f64> {
        self.coefficients.get(index).copied()
    }

    /// Get standard error by index.
    pub fn get_std_error(&self, index: usize) -> Option<f64> {
        self.std_errors.get(index).copied()
    }

    /// Calculate the Wald statistic for a coefficient.
    pub fn t_statistic(&self, index: usize) -> Option<f64> {
        let coef = self.coefficients.get(index)?;
        let se = self.std_errors.get(index)?;
        if *se > 0.0 {
            Some(coef / se)
        } else {
            None
        }
    }

    /// Get the random effect variance (tau²).
    pub fn tau_squared(&self) -> f64 {
        self.variance_components.first().copied().unwrap_or(0.0)
    }

    /// Get the residual variance (σ²).
    pub fn sigma_squared(&self) -> f64 {
        self.variance_components.get(1).copied().unwrap_or(0.0)
    }
}

/// Sufficient statistics for the random-intercept model.
struct GroupedSums {
    n: usize,
    p: usize,
    xtx: DMatrix<f64>,
    xty: DVector<f64>,
    yty: f64,
    /// Per group: size, column sums of X, sum of y.
    groups: Vec<(f64, DVector<f64>, f64)>,
}

impl GroupedSums {
    fn new(y: &DVector<f64>, x: &DMatrix<f64>, groups: &RandomIntercept) -> Self {
        let p = x.ncols();
        let mut per_group: Vec<(f64, DVector<f64>, f64)> =
            vec![(0.0, DVector::zeros(p), 0.0); groups.n_groups()];
        for (i, &g) in groups.group_of.iter().enumerate() {
            let entry = &mut per_group[g];
            entry.0 += 1.0;
            for j in 0..p {
                entry.1[j] += x[(i, j)];
            }
            entry.2 += y[i];
        }
        Self {
            n: y.len(),
            p,
            xtx: x.transpose() * x,
            xty: x.transpose() * y,
            yty: y.dot(y),
            groups: per_group,
        }
    }
}

/// Profiled quantities at one value of γ.
struct Profile {
    gamma: f64,
    log_reml: f64,
    beta: DVector<f64>,
    a_inv: DMatrix<f64>,
    sigma2: f64,
}

/// Evaluate the profiled REML criterion at `gamma = tau2 / sigma2`.
fn profile_at(sums: &GroupedSums, gamma: f64) -> Option<Profile> {
    let p = sums.p;
    let df = (sums.n - p) as f64;

    let mut a = sums.xtx.clone();
    let mut b = sums.xty.clone();
    let mut log_det_h = 0.0;
    for (n_g, s_g, t_g) in &sums.groups {
        let w = gamma / (1.0 + n_g * gamma);
        a -= s_g * s_g.transpose() * w;
        b -= s_g * (w * t_g);
        log_det_h += (1.0 + n_g * gamma).ln();
    }

    let chol = a.cholesky()?;
    let beta = chol.solve(&b);
    let a_inv = chol.inverse();
    let log_det_a = 2.0 * chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();

    // r'H^-1 r = sum r_i^2 - sum_g w_g (sum_{i in g} r_i)^2
    let rss = sums.yty - 2.0 * beta.dot(&sums.xty) + (beta.transpose() * &sums.xtx * &beta)[(0, 0)];
    let mut quad = rss;
    for (n_g, s_g, t_g) in &sums.groups {
        let w = gamma / (1.0 + n_g * gamma);
        let r_sum = t_g - s_g.dot(&beta);
        quad -= w * r_sum * r_sum;
    }

    // Residual variance at rounding level means the fixed effects fit exactly.
    let sigma2 = quad / df;
    let floor = 1e-12 * (1.0 + sums.yty / sums.n as f64);
    if !(sigma2.is_finite() && sigma2 > floor) {
        return None;
    }

    let log_reml = -0.5 * (df * sigma2.ln() + log_det_h + log_det_a);
    if !log_reml.is_finite() {
        return None;
    }

    Some(Profile {
        gamma,
        log_reml,
        beta,
        a_inv,
        sigma2,
    })
}

/// Fit a random-intercept linear mixed model by REML.
///
/// # Arguments
/// * `y` - Response, one value per observation
/// * `x` - Fixed effects design matrix (n × p), including the intercept column
/// * `coefficient_names` - Names of the columns of `x`
/// * `groups` - Random intercept grouping
/// * `config` - LMM configuration
///
/// # Errors
/// `InvalidParameter` for inconsistent input dimensions. `Numerical` when the
/// model is saturated, the fixed effects are not identifiable, or the
/// residual variance collapses to zero.
pub fn model_lmm(
    y: &[f64],
    x: &DMatrix<f64>,
    coefficient_names: &[String],
    groups: &RandomIntercept,
    config: &LmmConfig,
) -> Result<LmmFit> {
    let n = y.len();
    let p = x.ncols();

    if x.nrows() != n || groups.n_samples() != n {
        return Err(CellFreqError::InvalidParameter(format!(
            "Dimension mismatch: {} responses, {} design rows, {} group labels",
            n,
            x.nrows(),
            groups.n_samples()
        )));
    }
    if coefficient_names.len() != p {
        return Err(CellFreqError::InvalidParameter(format!(
            "Expected {} coefficient names, got {}",
            p,
            coefficient_names.len()
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(CellFreqError::Numerical(
            "Response contains non-finite values".to_string(),
        ));
    }
    if n <= p {
        return Err(CellFreqError::Numerical(
            "Model is saturated (n_samples <= n_fixed_effects)".to_string(),
        ));
    }
    if config.grid_points < 3 || config.log_ratio_bounds.0 >= config.log_ratio_bounds.1 {
        return Err(CellFreqError::InvalidParameter(
            "LMM search needs at least 3 grid points and an increasing range".to_string(),
        ));
    }

    let y_vec = DVector::from_column_slice(y);
    let sums = GroupedSums::new(&y_vec, x, groups);

    // Coarse grid over ln(gamma) to bracket the optimum.
    let (lo, hi) = config.log_ratio_bounds;
    let step = (hi - lo) / (config.grid_points - 1) as f64;
    let grid: Vec<(f64, Option<Profile>)> = (0..config.grid_points)
        .map(|k| {
            let theta = lo + step * k as f64;
            (theta, profile_at(&sums, theta.exp()))
        })
        .collect();

    let best_k = grid
        .iter()
        .enumerate()
        .filter_map(|(k, (_, prof))| prof.as_ref().map(|pr| (k, pr.log_reml)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k)
        .ok_or_else(|| {
            CellFreqError::Numerical(
                "REML criterion is undefined over the whole variance ratio range".to_string(),
            )
        })?;

    // Golden-section refinement within the neighbouring grid cells.
    let mut a = grid[best_k.saturating_sub(1)].0;
    let mut b = grid[(best_k + 1).min(grid.len() - 1)].0;
    let objective = |theta: f64| {
        profile_at(&sums, theta.exp())
            .map(|pr| pr.log_reml)
            .unwrap_or(f64::NEG_INFINITY)
    };
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = objective(c);
    let mut fd = objective(d);
    let mut iterations = 0;
    while (b - a).abs() > config.tol && iterations < config.max_iter {
        iterations += 1;
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = objective(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = objective(d);
        }
    }
    let converged = (b - a).abs() <= config.tol;

    // Best of: refined interior point, best grid point, and the tau2 = 0 boundary.
    let mut candidates: Vec<Profile> = Vec::new();
    if let Some(pr) = profile_at(&sums, (0.5 * (a + b)).exp()) {
        candidates.push(pr);
    }
    if let Some(pr) = profile_at(&sums, grid[best_k].0.exp()) {
        candidates.push(pr);
    }
    if let Some(pr) = profile_at(&sums, 0.0) {
        candidates.push(pr);
    }
    let best = candidates
        .into_iter()
        .max_by(|a, b| a.log_reml.total_cmp(&b.log_reml))
        .ok_or_else(|| CellFreqError::Numerical("REML optimum is undefined".to_string()))?;

    let sigma2 = best.sigma2;
    let tau2 = best.gamma * sigma2;
    let std_errors: Vec<f64> = (0..p)
        .map(|j| (sigma2 * best.a_inv[(j, j)]).max(0.0).sqrt())
        .collect();
    if std_errors.iter().any(|se| !se.is_finite()) {
        return Err(CellFreqError::Numerical(
            "Non-finite standard errors".to_string(),
        ));
    }

    // BLUPs: u_g = gamma / (1 + n_g gamma) * sum_{i in g} r_i
    let random_effects: Vec<f64> = sums
        .groups
        .iter()
        .map(|(n_g, s_g, t_g)| best.gamma / (1.0 + n_g * best.gamma) * (t_g - s_g.dot(&best.beta)))
        .collect();

    Ok(LmmFit {
        coefficient_names: coefficient_names.to_vec(),
        coefficients: best.beta.iter().copied().collect(),
        std_errors,
        variance_components: vec![tau2, sigma2],
        random_effects,
        log_reml: best.log_reml,
        df_residual: (n - p) as f64,
        n_samples: n,
        n_groups: groups.n_groups(),
        iterations,
        converged,
        icc: tau2 / (tau2 + sigma2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // 4 subjects, 2 timepoints each; subjects A and B are in the control
    // group, C and D in the treatment group.
    const SUBJECTS: [&str; 8] = ["A", "A", "B", "B", "C", "C", "D", "D"];

    fn design() -> (DMatrix<f64>, Vec<String>) {
        let x = DMatrix::from_fn(8, 2, |i, j| match j {
            0 => 1.0,
            _ => {
                if i >= 4 {
                    1.0
                } else {
                    0.0
                }
            }
        });
        (x, vec!["(Intercept)".to_string(), "grouptreatment".to_string()])
    }

    fn fit(y: &[f64]) -> LmmFit {
        let (x, names) = design();
        let groups = RandomIntercept::from_labels(&SUBJECTS);
        model_lmm(y, &x, &names, &groups, &LmmConfig::default()).unwrap()
    }

    #[test]
    fn test_lmm_config_default() {
        let config = LmmConfig::default();
        assert_eq!(config.max_iter, 200);
        assert_eq!(config.tol, 1e-8);
    }

    #[test]
    fn test_random_intercept_groups() {
        let groups = RandomIntercept::from_labels(&SUBJECTS);
        assert_eq!(groups.n_samples(), 8);
        assert_eq!(groups.n_groups(), 4);
        assert_eq!(groups.labels(), &["A", "B", "C", "D"]);
        assert_eq!(groups.group_of, vec![0, 0, 1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_model_lmm_basic() {
        let f = fit(&[1.0, 1.1, 0.9, 1.0, 1.1, 0.9, 1.0, 1.1]);
        assert_eq!(f.coefficients.len(), 2);
        assert_eq!(f.n_groups, 4);
        assert_eq!(f.n_samples, 8);
        assert_eq!(f.df_residual, 6.0);
        assert_eq!(f.coefficient_index("grouptreatment"), Some(1));
    }

    #[test]
    fn test_model_lmm_treatment_effect() {
        let f = fit(&[1.0, 1.2, 1.1, 1.3, 3.0, 3.2, 2.9, 3.1]);
        let idx = f.coefficient_index("grouptreatment").unwrap();

        // Group means are 1.15 and 3.05; balanced design makes GLS equal OLS.
        assert_relative_eq!(f.coefficients[idx], 1.9, epsilon = 1e-6);
        assert!(f.t_statistic(idx).unwrap() > 5.0);
    }

    #[test]
    fn test_model_lmm_no_effect() {
        let f = fit(&[1.0, 1.1, 0.9, 1.0, 1.1, 0.9, 1.0, 1.1]);
        let idx = f.coefficient_index("grouptreatment").unwrap();
        assert!(f.coefficients[idx].abs() < 0.5);
    }

    #[test]
    fn test_subject_effect_raises_icc() {
        // Large between-subject spread, little within-subject noise.
        let subject = fit(&[2.5, 2.6, 0.5, 0.6, 1.5, 1.6, 1.4, 1.5]);
        // Within-subject noise only.
        let noise = fit(&[1.0, 1.2, 1.2, 1.0, 1.0, 1.2, 1.2, 1.0]);

        assert!(subject.icc > 0.9, "expected high ICC, got {}", subject.icc);
        assert!(noise.icc < 0.1, "expected low ICC, got {}", noise.icc);
        assert!(subject.tau_squared() > noise.tau_squared());
    }

    #[test]
    fn test_repeated_measures_widen_standard_error() {
        // Subject-level shifts mean the 8 observations carry roughly 4 subjects'
        // worth of information on the group effect.
        let y = [2.5, 2.6, 0.5, 0.6, 3.5, 3.6, 1.4, 1.5];
        let mixed = fit(&y);

        let (x, _) = design();
        let xtx_inv = (x.transpose() * &x).try_inverse().unwrap();
        let beta = &xtx_inv * (x.transpose() * DVector::from_column_slice(&y));
        let resid = DVector::from_column_slice(&y) - &x * &beta;
        let ols_se = (resid.dot(&resid) / 6.0 * xtx_inv[(1, 1)]).sqrt();

        assert!(mixed.std_errors[1] > ols_se);
    }

    #[test]
    fn test_blups_sum_to_zero_for_balanced_groups() {
        let f = fit(&[2.5, 2.6, 0.5, 0.6, 1.5, 1.6, 1.4, 1.5]);
        assert_eq!(f.random_effects.len(), 4);
        let total: f64 = f.random_effects.iter().sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_saturated_model() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let names = vec!["(Intercept)".to_string(), "g".to_string()];
        let groups = RandomIntercept::from_labels(&["A", "B"]);
        let err = model_lmm(&[1.0, 2.0], &x, &names, &groups, &LmmConfig::default()).unwrap_err();
        assert!(matches!(err, CellFreqError::Numerical(_)));
    }

    #[test]
    fn test_constant_response_fails() {
        let (x, names) = design();
        let groups = RandomIntercept::from_labels(&SUBJECTS);
        let result = model_lmm(&[5.0; 8], &x, &names, &groups, &LmmConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let (x, names) = design();
        let groups = RandomIntercept::from_labels(&["A", "B", "C", "D"]);
        let result = model_lmm(&[1.0; 8], &x, &names, &groups, &LmmConfig::default());
        assert!(matches!(result, Err(CellFreqError::InvalidParameter(_))));
    }
}
