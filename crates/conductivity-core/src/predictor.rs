use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::calibration::Calibration;
use crate::config::PredictorConfig;
use crate::error::{PredictorError, PredictorResult};
use crate::extrapolation::ExtrapolationDetector;
use crate::features::FeatureVector;
use crate::model::{FittedModel, FullRefit, ModelFitter};
use crate::robustness::{self, RobustnessReport};
use crate::seed::seed_samples;
use crate::training::TrainingSet;
use crate::types::{ComplianceStatus, Fractions, PredictionResult, Sample, SampleAdded};

/// Everything a prediction depends on, built together and never mutated.
#[derive(Debug)]
pub struct ModelSnapshot {
    training: TrainingSet,
    model: FittedModel,
    detector: ExtrapolationDetector,
    robustness: Option<RobustnessReport>,
}

impl ModelSnapshot {
    fn build(fitter: &dyn ModelFitter, training: TrainingSet) -> PredictorResult<Self> {
        let model = fitter.fit(training.features(), training.targets())?;
        let detector = ExtrapolationDetector::fit(training.features())?;
        let robustness = robustness::validate(fitter, &training, &model)?;
        Ok(Self {
            training,
            model,
            detector,
            robustness,
        })
    }

    pub fn training(&self) -> &TrainingSet {
        &self.training
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn detector(&self) -> &ExtrapolationDetector {
        &self.detector
    }

    pub fn robustness(&self) -> Option<RobustnessReport> {
        self.robustness
    }
}

/// Thermal conductivity predictor.
///
/// Readers clone the current [`ModelSnapshot`] handle and work on it without
/// holding any lock. `add_sample` builds the next snapshot off to the side
/// (writers serialized by `write_guard`) and swaps it in at the end, so a
/// prediction never mixes training data, scaler and factorization from two
/// different training sets.
pub struct Predictor {
    config: PredictorConfig,
    calibration: Calibration,
    fitter: Arc<dyn ModelFitter>,
    snapshot: RwLock<Arc<ModelSnapshot>>,
    write_guard: Mutex<()>,
}

impl Predictor {
    pub fn new(config: PredictorConfig, samples: Vec<Sample>) -> PredictorResult<Self> {
        let fitter = Arc::new(FullRefit::new(&config));
        Self::with_fitter(config, samples, fitter)
    }

    /// Predictor trained on the built-in laboratory dataset.
    pub fn with_seed_data(config: PredictorConfig) -> PredictorResult<Self> {
        Self::new(config, seed_samples())
    }

    pub fn with_fitter(
        config: PredictorConfig,
        samples: Vec<Sample>,
        fitter: Arc<dyn ModelFitter>,
    ) -> PredictorResult<Self> {
        config.validate()?;
        if samples.is_empty() {
            return Err(PredictorError::InsufficientData(
                "predictor needs at least one training sample".to_string(),
            ));
        }
        for sample in &samples {
            check_sample(sample)?;
        }

        let snapshot = ModelSnapshot::build(fitter.as_ref(), TrainingSet::from_samples(samples))?;
        log_refit(fitter.name(), &snapshot);

        Ok(Self {
            calibration: Calibration::from_config(&config),
            config,
            fitter,
            snapshot: RwLock::new(Arc::new(snapshot)),
            write_guard: Mutex::new(()),
        })
    }

    /// Predict conductivity for one distribution and classify it against
    /// `threshold` (W/(m·K), inclusive upper bound for `conforme`).
    pub fn predict(&self, fractions: &Fractions, threshold: f64) -> PredictorResult<PredictionResult> {
        fractions.validate()?;

        let snapshot = self.snapshot();
        let features = FeatureVector::from_fractions(fractions);
        let raw = features.to_array();

        let (lambda_predicted, raw_std) = snapshot.model.predict(&raw)?;
        let extrapolation_risk = snapshot.detector.risk(&raw)?;
        let uncertainty = self.calibration.calibrate(raw_std, extrapolation_risk);
        let status = ComplianceStatus::classify(lambda_predicted, threshold);

        tracing::debug!(
            lambda = lambda_predicted,
            half_width = uncertainty.half_width,
            risk = extrapolation_risk,
            status = %status,
            "Prediction over {} samples",
            snapshot.training.len()
        );
        if uncertainty.inflated {
            tracing::debug!(
                "Extrapolation risk {:.2} above {:.2}, interval widened",
                extrapolation_risk,
                self.config.extrapolation_threshold
            );
        }

        Ok(PredictionResult {
            lambda_predicted,
            confidence_interval: uncertainty.half_width,
            status,
            r1p_log: features.r1p_log,
            ee_best: features.ee_best,
            threshold,
            extrapolation_risk,
        })
    }

    /// Add a laboratory measurement and refit everything on the grown set.
    pub fn add_sample(&self, fractions: &Fractions, lambda_value: f64) -> PredictorResult<SampleAdded> {
        let sample = Sample::new(*fractions, lambda_value);
        check_sample(&sample)?;

        let _writer = self.write_guard.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot();
        let training = current.training.with_sample(sample);
        let next = Arc::new(ModelSnapshot::build(self.fitter.as_ref(), training)?);
        log_refit(self.fitter.name(), &next);

        let samples_count = next.training.len();
        let robustness = next.robustness;
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;

        Ok(SampleAdded {
            message: "Sample added and model updated".to_string(),
            samples_count,
            robustness,
        })
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn samples_count(&self) -> usize {
        self.snapshot().training.len()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.snapshot().training.samples().to_vec()
    }

    pub fn robustness(&self) -> Option<RobustnessReport> {
        self.snapshot().robustness
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }
}

fn check_sample(sample: &Sample) -> PredictorResult<()> {
    sample.fractions.validate()?;
    if !sample.lambda.is_finite() {
        return Err(PredictorError::InvalidMeasurement(sample.lambda));
    }
    Ok(())
}

fn log_refit(fitter: &str, snapshot: &ModelSnapshot) {
    match snapshot.robustness {
        Some(report) => tracing::info!(
            "Model refit ({}) on {} samples: rmse_loo={:.6}, rmse_train={:.6}, overfitting_ratio={:.3}",
            fitter,
            snapshot.training.len(),
            report.rmse_loo,
            report.rmse_train,
            report.overfitting_ratio
        ),
        None => tracing::info!(
            "Model refit ({}) on {} samples, too few for leave-one-out",
            fitter,
            snapshot.training.len()
        ),
    }
}
