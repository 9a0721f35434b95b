use nalgebra::{DMatrix, DVector};

use crate::config::PredictorConfig;
use crate::error::PredictorResult;
use crate::gp::{GaussianProcess, Kernel};
use crate::scaler::Scaler;

/// Scaler and Gaussian process fitted together on one training snapshot.
///
/// The two are never refit separately, so a query is always standardized
/// with the statistics of the data the GP was trained on.
#[derive(Debug, Clone)]
pub struct FittedModel {
    scaler: Scaler,
    gp: GaussianProcess,
}

impl FittedModel {
    /// Raw (unstandardized) features in, posterior mean and std out.
    pub fn predict(&self, features: &[f64]) -> PredictorResult<(f64, f64)> {
        let scaled = self.scaler.transform_row(features)?;
        self.gp.predict(&scaled)
    }

    /// Posterior means for every row of a raw feature matrix.
    pub fn predict_means(&self, features: &DMatrix<f64>) -> PredictorResult<Vec<f64>> {
        let scaled = self.scaler.transform(features)?;
        self.gp.predict_means(&scaled)
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn gp(&self) -> &GaussianProcess {
        &self.gp
    }
}

/// Produces a [`FittedModel`] from raw training features and targets.
///
/// The predictor only talks to this trait, so the full refit below can be
/// replaced by an incremental factorization update without touching callers.
pub trait ModelFitter: Send + Sync {
    fn fit(&self, features: &DMatrix<f64>, targets: &DVector<f64>) -> PredictorResult<FittedModel>;

    fn name(&self) -> &'static str;
}

/// Rebuilds the scaler and the covariance factorization from scratch.
#[derive(Debug, Clone)]
pub struct FullRefit {
    kernel: Kernel,
    jitter: f64,
}

impl FullRefit {
    pub fn new(config: &PredictorConfig) -> Self {
        Self {
            kernel: Kernel::new(config.length_scales.clone(), config.noise_level),
            jitter: config.jitter,
        }
    }
}

impl ModelFitter for FullRefit {
    fn fit(&self, features: &DMatrix<f64>, targets: &DVector<f64>) -> PredictorResult<FittedModel> {
        let scaler = Scaler::fit(features)?;
        let scaled = scaler.transform(features)?;
        let gp = GaussianProcess::fit(self.kernel.clone(), &scaled, targets, self.jitter)?;
        Ok(FittedModel { scaler, gp })
    }

    fn name(&self) -> &'static str {
        "full-refit"
    }
}
