//! L2-regularized logistic regression fitted by Newton's method.

use tracing::{debug, instrument, warn};

use crate::dataset::{self, ClassWeight, check_width, sigmoid};
use crate::error::ModelError;

/// Configuration for logistic regression.
///
/// Minimizes `0.5 * ||w||^2 + C * sum_i s_i * logloss_i`, where `s_i` is
/// the class weight of sample `i`. The intercept is not penalized.
///
/// # Defaults
///
/// | Parameter      | Default    |
/// |----------------|------------|
/// | `c`            | 1.0        |
/// | `max_iter`     | 5000       |
/// | `tol`          | 1e-8       |
/// | `class_weight` | `Balanced` |
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegressionConfig {
    c: f64,
    max_iter: usize,
    tol: f64,
    class_weight: ClassWeight,
}

impl LogisticRegressionConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 5000,
            tol: 1e-8,
            class_weight: ClassWeight::Balanced,
        }
    }

    /// Set the inverse regularization strength.
    #[must_use]
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set the Newton iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance on the weight-normalized gradient.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set how samples are weighted by class.
    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Return the inverse regularization strength.
    #[must_use]
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Return the iteration cap.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Fit on row-major features and 0/1 labels.
    ///
    /// Stops when the largest gradient component, divided by the total
    /// sample weight, falls below `tol`, or after `max_iter` iterations
    /// with a warning.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                              |
    /// |-----------------------------------------|-----------------------------------|
    /// | [`ModelError::InvalidRegularization`]   | `c` is not positive and finite    |
    /// | [`ModelError::InvalidIterationLimit`]   | `max_iter` is 0                   |
    /// | training-set validation errors          | see [`crate::DecisionTreeConfig::fit`] |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<LogisticRegression, ModelError> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ModelError::InvalidRegularization { c: self.c });
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidIterationLimit { max_iter: 0 });
        }
        let n_features = dataset::validate(features, labels)?;
        let weights = self.class_weight.sample_weights(labels);
        let total_weight: f64 = weights.iter().sum();
        let targets: Vec<f64> = labels.iter().map(|&l| l as f64).collect();

        let problem = Objective {
            features,
            targets: &targets,
            weights: &weights,
            c: self.c,
            n_features,
        };

        // Last component is the intercept.
        let mut w = vec![0.0; n_features + 1];
        let mut value = problem.value(&w);
        let mut n_iter = 0;
        let mut converged = false;

        while n_iter < self.max_iter {
            n_iter += 1;
            let (gradient, hessian) = problem.gradient_hessian(&w);
            let g_max = gradient.iter().fold(0.0f64, |m, g| m.max(g.abs()));
            if g_max / total_weight <= self.tol {
                converged = true;
                break;
            }

            let Some(direction) = solve(hessian, gradient.clone()) else {
                warn!(n_iter, "singular Hessian, stopping early");
                break;
            };
            let slope: f64 = gradient.iter().zip(&direction).map(|(g, d)| g * d).sum();

            // Backtracking line search along -direction.
            let mut step = 1.0;
            let mut candidate: Vec<f64>;
            loop {
                candidate = w.iter().zip(&direction).map(|(wi, d)| wi - step * d).collect();
                let next = problem.value(&candidate);
                if next <= value - 1e-4 * step * slope || step < 1e-10 {
                    value = next;
                    break;
                }
                step *= 0.5;
            }
            let moved = direction.iter().fold(0.0f64, |m, d| m.max((step * d).abs()));
            w = candidate;
            if moved < 1e-12 {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(n_iter, objective = value, "logistic regression converged");
        } else {
            warn!(
                n_iter,
                max_iter = self.max_iter,
                "logistic regression reached the iteration cap without converging"
            );
        }

        let intercept = w[n_features];
        w.truncate(n_features);
        Ok(LogisticRegression {
            coefficients: w,
            intercept,
            n_iter,
        })
    }
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct Objective<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    weights: &'a [f64],
    c: f64,
    n_features: usize,
}

impl Objective<'_> {
    fn linear(&self, w: &[f64], row: &[f64]) -> f64 {
        row.iter().zip(w).map(|(x, wi)| x * wi).sum::<f64>() + w[self.n_features]
    }

    fn value(&self, w: &[f64]) -> f64 {
        let penalty: f64 = 0.5 * w[..self.n_features].iter().map(|v| v * v).sum::<f64>();
        let loss: f64 = self
            .features
            .iter()
            .zip(self.targets.iter().zip(self.weights))
            .map(|(row, (&y, &s))| {
                let z = self.linear(w, row);
                s * (softplus(z) - y * z)
            })
            .sum();
        penalty + self.c * loss
    }

    fn gradient_hessian(&self, w: &[f64]) -> (Vec<f64>, Vec<Vec<f64>>) {
        let d = self.n_features + 1;
        let mut gradient = vec![0.0; d];
        let mut hessian = vec![vec![0.0; d]; d];

        for (row, (&y, &s)) in self.features.iter().zip(self.targets.iter().zip(self.weights)) {
            let p = sigmoid(self.linear(w, row));
            let residual = self.c * s * (p - y);
            let curvature = self.c * s * p * (1.0 - p);
            for a in 0..d {
                let xa = if a < self.n_features { row[a] } else { 1.0 };
                gradient[a] += residual * xa;
                for b in 0..=a {
                    let xb = if b < self.n_features { row[b] } else { 1.0 };
                    hessian[a][b] += curvature * xa * xb;
                }
            }
        }
        for a in 0..d {
            if a < self.n_features {
                gradient[a] += w[a];
                hessian[a][a] += 1.0;
            }
            for b in 0..a {
                hessian[b][a] = hessian[a][b];
            }
        }
        (gradient, hessian)
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` for a numerically singular matrix.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// A fitted logistic regression model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    n_iter: usize,
}

impl LogisticRegression {
    /// Positive-class probability for one sample.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] when the sample
    /// width differs from the training width.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, ModelError> {
        check_width(sample, self.coefficients.len())?;
        let z: f64 = sample
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.intercept;
        Ok(sigmoid(z))
    }

    /// Fitted coefficients, one per feature.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Fitted intercept.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Number of Newton iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Number of features the model was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlapping() -> (Vec<Vec<f64>>, Vec<usize>) {
        let xs = [-3.0, -2.0, -1.5, -1.0, -0.5, 0.5, 1.0, 1.5, 2.0, 3.0];
        let labels = vec![0, 0, 0, 1, 0, 1, 0, 1, 1, 1];
        (xs.iter().map(|&x| vec![x]).collect(), labels)
    }

    #[test]
    fn solve_small_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn solve_singular_is_none() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve(a, vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn gradient_vanishes_at_optimum() {
        let (features, labels) = overlapping();
        let config = LogisticRegressionConfig::new();
        let model = config.fit(&features, &labels).unwrap();

        let weights = ClassWeight::Balanced.sample_weights(&labels);
        let targets: Vec<f64> = labels.iter().map(|&l| l as f64).collect();
        let objective = Objective {
            features: &features,
            targets: &targets,
            weights: &weights,
            c: 1.0,
            n_features: 1,
        };
        let w = [model.coefficients()[0], model.intercept()];
        let (g, _) = objective.gradient_hessian(&w);
        assert!(g.iter().all(|v| v.abs() < 1e-6), "gradient = {g:?}");
        assert!(model.coefficients()[0] > 0.0);
        assert!(model.n_iter() < 50);
    }

    #[test]
    fn probability_increases_with_signal() {
        let (features, labels) = overlapping();
        let model = LogisticRegressionConfig::new().fit(&features, &labels).unwrap();
        let lo = model.predict_proba(&[-3.0]).unwrap();
        let hi = model.predict_proba(&[3.0]).unwrap();
        assert!(lo < 0.5 && hi > 0.5);
    }

    #[test]
    fn stronger_regularization_shrinks_coefficients() {
        let (features, labels) = overlapping();
        let loose = LogisticRegressionConfig::new().fit(&features, &labels).unwrap();
        let tight = LogisticRegressionConfig::new()
            .with_c(0.01)
            .fit(&features, &labels)
            .unwrap();
        assert!(tight.coefficients()[0].abs() < loose.coefficients()[0].abs());
    }

    #[test]
    fn invalid_regularization_is_rejected() {
        let (features, labels) = overlapping();
        let err = LogisticRegressionConfig::new()
            .with_c(0.0)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidRegularization { .. }));
    }

    #[test]
    fn softplus_is_stable() {
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-15);
        assert!((softplus(800.0) - 800.0).abs() < 1e-9);
        assert!(softplus(-800.0) >= 0.0);
    }
}
