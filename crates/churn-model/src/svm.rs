//! RBF-kernel support vector classifier with Platt-scaled probabilities.
//!
//! The dual is solved by sequential minimal optimization with
//! second-order working-set selection. Platt's sigmoid is then fitted to
//! the training decision values by Newton's method with backtracking.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::dataset::{self, check_width};
use crate::error::ModelError;

const TAU: f64 = 1e-12;

/// RBF kernel width.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Gamma {
    /// `1 / (n_features * Var(X))` over every entry of the training matrix,
    /// or 1 when the matrix is constant.
    Scale,
    /// A fixed value.
    Value(f64),
}

impl Gamma {
    fn resolve(self, features: &[Vec<f64>], n_features: usize) -> f64 {
        match self {
            Gamma::Value(g) => g,
            Gamma::Scale => {
                let count = (features.len() * n_features) as f64;
                let mean = features.iter().flatten().sum::<f64>() / count;
                let var = features
                    .iter()
                    .flatten()
                    .map(|x| (x - mean).powi(2))
                    .sum::<f64>()
                    / count;
                if var > 0.0 { 1.0 / (n_features as f64 * var) } else { 1.0 }
            }
        }
    }
}

/// Configuration for the support vector classifier.
///
/// # Defaults
///
/// | Parameter       | Default      |
/// |-----------------|--------------|
/// | `c`             | 1.0          |
/// | `gamma`         | `Scale`      |
/// | `tol`           | 1e-3         |
/// | `max_iter`      | 10 000 000   |
/// | `cache_size_mb` | 200          |
#[derive(Debug, Clone, PartialEq)]
pub struct SvcConfig {
    c: f64,
    gamma: Gamma,
    tol: f64,
    max_iter: usize,
    cache_size_mb: usize,
}

impl SvcConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            c: 1.0,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_iter: 10_000_000,
            cache_size_mb: 200,
        }
    }

    /// Set the box constraint.
    #[must_use]
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set the kernel width.
    #[must_use]
    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the KKT violation tolerance used as the stopping criterion.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the SMO iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the kernel-row cache budget in megabytes.
    #[must_use]
    pub fn with_cache_size_mb(mut self, cache_size_mb: usize) -> Self {
        self.cache_size_mb = cache_size_mb;
        self
    }

    /// Return the box constraint.
    #[must_use]
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Fit on row-major features and 0/1 labels.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                             |
    /// |-----------------------------------------|----------------------------------|
    /// | [`ModelError::InvalidRegularization`]   | `c` is not positive and finite   |
    /// | [`ModelError::InvalidIterationLimit`]   | `max_iter` is 0                  |
    /// | training-set validation errors          | see [`crate::DecisionTreeConfig::fit`] |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<Svc, ModelError> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ModelError::InvalidRegularization { c: self.c });
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidIterationLimit { max_iter: 0 });
        }
        let n_features = dataset::validate(features, labels)?;
        let gamma = self.gamma.resolve(features, n_features);
        let y: Vec<f64> = labels
            .iter()
            .map(|&l| if l == 1 { 1.0 } else { -1.0 })
            .collect();

        info!(n_samples = features.len(), n_features, gamma, c = self.c, "training SVC");

        let capacity = (self.cache_size_mb * 1024 * 1024 / (features.len() * 8).max(1)).max(2);
        let mut cache = KernelCache::new(features, gamma, capacity);
        let solution = solve_dual(&mut cache, &y, self.c, self.tol, self.max_iter);

        // Training decision values from the final gradient.
        let decision: Vec<f64> = solution
            .gradient
            .iter()
            .zip(&y)
            .map(|(g, yi)| yi * (g + 1.0) - solution.rho)
            .collect();
        let (platt_a, platt_b) = fit_platt(&decision, &y);

        let mut support_vectors = Vec::new();
        let mut dual_coef = Vec::new();
        for ((row, &a), &yi) in features.iter().zip(&solution.alpha).zip(&y) {
            if a > 0.0 {
                support_vectors.push(row.clone());
                dual_coef.push(a * yi);
            }
        }

        debug!(
            n_support = support_vectors.len(),
            n_iter = solution.n_iter,
            rho = solution.rho,
            platt_a,
            platt_b,
            "SVC trained"
        );

        Ok(Svc {
            support_vectors,
            dual_coef,
            rho: solution.rho,
            gamma,
            platt_a,
            platt_b,
            n_features,
        })
    }
}

impl Default for SvcConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let sq: f64 = a.iter().zip(b).map(|(x, z)| (x - z) * (x - z)).sum();
    (-gamma * sq).exp()
}

/// Bounded cache of kernel rows, evicting the least recently computed.
struct KernelCache<'a> {
    features: &'a [Vec<f64>],
    gamma: f64,
    capacity: usize,
    rows: HashMap<usize, Rc<[f64]>>,
    order: VecDeque<usize>,
}

impl<'a> KernelCache<'a> {
    fn new(features: &'a [Vec<f64>], gamma: f64, capacity: usize) -> Self {
        Self {
            features,
            gamma,
            capacity,
            rows: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn len(&self) -> usize {
        self.features.len()
    }

    fn row(&mut self, i: usize) -> Rc<[f64]> {
        if let Some(row) = self.rows.get(&i) {
            return Rc::clone(row);
        }
        let features = self.features;
        let gamma = self.gamma;
        let row: Rc<[f64]> = (0..features.len())
            .into_par_iter()
            .map(|t| rbf(&features[i], &features[t], gamma))
            .collect::<Vec<f64>>()
            .into();
        if self.order.len() >= self.capacity
            && let Some(evicted) = self.order.pop_front()
        {
            self.rows.remove(&evicted);
        }
        self.order.push_back(i);
        self.rows.insert(i, Rc::clone(&row));
        row
    }
}

struct DualSolution {
    alpha: Vec<f64>,
    gradient: Vec<f64>,
    rho: f64,
    n_iter: usize,
}

/// SMO for `min 0.5 a'Qa - e'a` s.t. `0 <= a <= c`, `y'a = 0`,
/// with `Q_ij = y_i y_j K_ij`.
fn solve_dual(
    cache: &mut KernelCache<'_>,
    y: &[f64],
    c: f64,
    tol: f64,
    max_iter: usize,
) -> DualSolution {
    let n = cache.len();
    let mut alpha = vec![0.0; n];
    let mut gradient = vec![-1.0; n];

    let in_up = |a: f64, yt: f64| (yt > 0.0 && a < c) || (yt < 0.0 && a > 0.0);
    let in_low = |a: f64, yt: f64| (yt > 0.0 && a > 0.0) || (yt < 0.0 && a < c);

    let mut n_iter = 0;
    while n_iter < max_iter {
        // First index: maximal violating -y_t G_t over the upper set.
        let mut g_max = f64::NEG_INFINITY;
        let mut first = None;
        for t in 0..n {
            if in_up(alpha[t], y[t]) {
                let v = -y[t] * gradient[t];
                if v >= g_max {
                    g_max = v;
                    first = Some(t);
                }
            }
        }
        let Some(i) = first else { break };
        let k_i = cache.row(i);

        // Second index: largest second-order decrease over the lower set.
        let mut g_max2 = f64::NEG_INFINITY;
        let mut obj_min = f64::INFINITY;
        let mut second = None;
        for t in 0..n {
            if !in_low(alpha[t], y[t]) {
                continue;
            }
            let v = y[t] * gradient[t];
            g_max2 = g_max2.max(v);
            let grad_diff = g_max + v;
            if grad_diff > 0.0 {
                let quad = (2.0 - 2.0 * k_i[t]).max(TAU);
                let obj = -(grad_diff * grad_diff) / quad;
                if obj <= obj_min {
                    obj_min = obj;
                    second = Some(t);
                }
            }
        }
        if g_max + g_max2 < tol {
            break;
        }
        let Some(j) = second else { break };
        let k_j = cache.row(j);
        n_iter += 1;

        let (old_i, old_j) = (alpha[i], alpha[j]);
        let q_ij = y[i] * y[j] * k_i[j];
        if y[i] != y[j] {
            let quad = (2.0 + 2.0 * q_ij).max(TAU);
            let delta = (-gradient[i] - gradient[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let quad = (2.0 - 2.0 * q_ij).max(TAU);
            let delta = (gradient[i] - gradient[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let (d_i, d_j) = (alpha[i] - old_i, alpha[j] - old_j);
        for t in 0..n {
            gradient[t] += y[t] * (y[i] * k_i[t] * d_i + y[j] * k_j[t] * d_j);
        }
    }

    if n_iter >= max_iter {
        warn!(max_iter, "SMO reached the iteration cap without converging");
    }

    let rho = compute_rho(&alpha, &gradient, y, c);
    DualSolution {
        alpha,
        gradient,
        rho,
        n_iter,
    }
}

/// Offset from the free support vectors, or the midpoint of the feasible
/// interval when none is free.
fn compute_rho(alpha: &[f64], gradient: &[f64], y: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut n_free = 0usize;
    let mut sum_free = 0.0;
    for ((&a, &g), &yt) in alpha.iter().zip(gradient).zip(y) {
        let yg = yt * g;
        if a >= c {
            if yt < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if a <= 0.0 {
            if yt > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            n_free += 1;
            sum_free += yg;
        }
    }
    if n_free > 0 {
        sum_free / n_free as f64
    } else {
        (upper + lower) / 2.0
    }
}

/// Fit `P(y = 1 | f) = 1 / (1 + exp(a * f + b))` to decision values.
///
/// Targets are smoothed by the class priors; the negative log-likelihood
/// is minimized by Newton's method with backtracking line search.
fn fit_platt(decision: &[f64], y: &[f64]) -> (f64, f64) {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = y.iter().filter(|&&v| v > 0.0).count() as f64;
    let prior0 = y.len() as f64 - prior1;
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = y
        .iter()
        .map(|&v| if v > 0.0 { hi_target } else { lo_target })
        .collect();

    let nll = |a: f64, b: f64| -> f64 {
        decision
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let z = f * a + b;
                if z >= 0.0 {
                    t * z + (-z).exp().ln_1p()
                } else {
                    (t - 1.0) * z + z.exp().ln_1p()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = nll(a, b);

    for _ in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&f, &t) in decision.iter().zip(&targets) {
            let z = f * a + b;
            let (p, q) = if z >= 0.0 {
                let e = (-z).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = z.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }
        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let (new_a, new_b) = (a + step * da, b + step * db);
            let new_f = nll(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }
        if step < MIN_STEP {
            warn!("Platt scaling line search failed");
            break;
        }
    }
    (a, b)
}

fn platt_probability(decision: f64, a: f64, b: f64) -> f64 {
    let z = decision * a + b;
    if z >= 0.0 {
        let e = (-z).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + z.exp())
    }
}

/// A fitted support vector classifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Svc {
    support_vectors: Vec<Vec<f64>>,
    dual_coef: Vec<f64>,
    rho: f64,
    gamma: f64,
    platt_a: f64,
    platt_b: f64,
    n_features: usize,
}

impl Svc {
    /// Signed distance-like score; positive values lean towards class 1.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64, ModelError> {
        check_width(sample, self.n_features)?;
        let sum: f64 = self
            .support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| coef * rbf(sv, sample, self.gamma))
            .sum();
        Ok(sum - self.rho)
    }

    /// Platt-scaled positive-class probability.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, ModelError> {
        let f = self.decision_function(sample)?;
        Ok(platt_probability(f, self.platt_a, self.platt_b))
    }

    /// Number of support vectors.
    #[must_use]
    pub fn n_support(&self) -> usize {
        self.support_vectors.len()
    }

    /// Resolved kernel width.
    #[must_use]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Number of features the model was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}
