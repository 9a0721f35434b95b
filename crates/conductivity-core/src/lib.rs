//! Thermal conductivity predictor
//!
//! Predicts the thermal conductivity of a fibrous material from its
//! five-bucket particle-size distribution with a fixed-hyperparameter
//! Gaussian process, reports a calibrated 90% interval, and classifies the
//! result against a caller-supplied conductivity threshold. New laboratory
//! measurements are folded in online with a full refit and leave-one-out
//! validation.

pub mod calibration;
pub mod config;
pub mod error;
pub mod extrapolation;
pub mod features;
pub mod gp;
pub mod model;
pub mod predictor;
pub mod robustness;
pub mod scaler;
pub mod seed;
pub mod training;
pub mod types;

#[cfg(test)]
mod tests;

pub use calibration::{CalibratedUncertainty, Calibration};
pub use config::PredictorConfig;
pub use error::{PredictorError, PredictorResult};
pub use extrapolation::ExtrapolationDetector;
pub use features::{entanglement_indicator, fines_ratio_log, FeatureVector, FEATURE_COUNT};
pub use gp::{GaussianProcess, Kernel};
pub use model::{FittedModel, FullRefit, ModelFitter};
pub use predictor::{ModelSnapshot, Predictor};
pub use robustness::RobustnessReport;
pub use scaler::Scaler;
pub use seed::seed_samples;
pub use training::TrainingSet;
pub use types::{
    ComplianceStatus, Fractions, PredictionResult, Sample, SampleAdded, FRACTION_SUM_MAX,
    FRACTION_SUM_MIN,
};
