//! Gaussian-process regression with a frozen RBF + white-noise kernel.
//!
//! Inputs are expected to be standardized already. Targets are normalized
//! internally (own mean and std) and de-normalized on the way out.

use nalgebra::{DMatrix, DVector};
use statrs::statistics::Statistics;

use crate::error::{PredictorError, PredictorResult};

/// Target spreads below this are treated as constant targets.
const MIN_TARGET_STD: f64 = 10.0 * f64::EPSILON;

/// Anisotropic squared-exponential kernel plus i.i.d. white noise.
///
/// The white term only contributes on the diagonal of the training
/// covariance and to the prior variance of a query point, never to
/// cross-covariances between distinct inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    pub length_scales: Vec<f64>,
    pub noise_level: f64,
}

impl Kernel {
    pub fn new(length_scales: Vec<f64>, noise_level: f64) -> Self {
        Self {
            length_scales,
            noise_level,
        }
    }

    pub fn dim(&self) -> usize {
        self.length_scales.len()
    }

    /// RBF term only.
    pub fn rbf(&self, a: &[f64], b: &[f64]) -> f64 {
        let sq_dist: f64 = a
            .iter()
            .zip(b.iter())
            .zip(self.length_scales.iter())
            .map(|((x, y), l)| ((x - y) / l).powi(2))
            .sum();
        (-0.5 * sq_dist).exp()
    }

    /// Prior variance at any single point: RBF self-covariance is 1.
    pub fn prior_variance(&self) -> f64 {
        1.0 + self.noise_level
    }
}

#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: Kernel,
    x_train: Vec<Vec<f64>>,
    lower: DMatrix<f64>,
    alpha: DVector<f64>,
    y_mean: f64,
    y_std: f64,
}

impl GaussianProcess {
    /// Build and factorize the training covariance.
    ///
    /// `jitter` is added to the diagonal together with the kernel noise.
    pub fn fit(
        kernel: Kernel,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        jitter: f64,
    ) -> PredictorResult<Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(PredictorError::InsufficientData(
                "cannot fit a Gaussian process on zero samples".to_string(),
            ));
        }
        if x.ncols() != kernel.dim() {
            return Err(PredictorError::DimensionMismatch {
                expected: kernel.dim(),
                actual: x.ncols(),
            });
        }
        if y.len() != n {
            return Err(PredictorError::DimensionMismatch {
                expected: n,
                actual: y.len(),
            });
        }

        let y_mean = y.iter().mean();
        let y_std = match y.iter().population_std_dev() {
            s if s.is_finite() && s > MIN_TARGET_STD => s,
            _ => 1.0,
        };
        let y_norm = y.map(|v| (v - y_mean) / y_std);

        let x_train: Vec<Vec<f64>> = x
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();

        let diagonal = kernel.noise_level + jitter;
        let k = DMatrix::from_fn(n, n, |i, j| {
            let base = kernel.rbf(&x_train[i], &x_train[j]);
            if i == j {
                base + diagonal
            } else {
                base
            }
        });

        let cholesky = k.cholesky().ok_or(PredictorError::NotPositiveDefinite(n))?;
        let alpha = cholesky.solve(&y_norm);
        let lower = cholesky.unpack();

        Ok(Self {
            kernel,
            x_train,
            lower,
            alpha,
            y_mean,
            y_std,
        })
    }

    pub fn n_train(&self) -> usize {
        self.x_train.len()
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Posterior mean and standard deviation at one standardized point.
    pub fn predict(&self, x: &[f64]) -> PredictorResult<(f64, f64)> {
        if x.len() != self.kernel.dim() {
            return Err(PredictorError::DimensionMismatch {
                expected: self.kernel.dim(),
                actual: x.len(),
            });
        }

        let k_star = DVector::from_iterator(
            self.n_train(),
            self.x_train.iter().map(|row| self.kernel.rbf(row, x)),
        );

        let mean = k_star.dot(&self.alpha) * self.y_std + self.y_mean;

        let v = self
            .lower
            .solve_lower_triangular(&k_star)
            .ok_or(PredictorError::NotPositiveDefinite(self.n_train()))?;
        let variance = (self.kernel.prior_variance() - v.dot(&v)).max(0.0);
        let std = variance.sqrt() * self.y_std;

        Ok((mean, std))
    }

    /// Posterior means for every row of `x`.
    pub fn predict_means(&self, x: &DMatrix<f64>) -> PredictorResult<Vec<f64>> {
        x.row_iter()
            .map(|row| {
                let point: Vec<f64> = row.iter().copied().collect();
                self.predict(&point).map(|(mean, _)| mean)
            })
            .collect()
    }
}
