//! Uncertainty Calibration
//!
//! Turns the Gaussian process' raw predictive std into the half-width of the
//! reported 90% interval.

use serde::{Deserialize, Serialize};

use crate::config::PredictorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedUncertainty {
    /// Std straight out of the GP
    pub raw_std: f64,
    /// Std after calibration, floor and extrapolation inflation
    pub calibrated_std: f64,
    /// Symmetric half-width around the predicted mean
    pub half_width: f64,
    /// Whether the extrapolation inflation was applied
    pub inflated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    factor: f64,
    floor: f64,
    extrapolation_threshold: f64,
    z_score: f64,
}

impl Calibration {
    pub fn from_config(config: &PredictorConfig) -> Self {
        Self {
            factor: config.calibration_factor,
            floor: config.uncertainty_floor,
            extrapolation_threshold: config.extrapolation_threshold,
            z_score: config.z_score,
        }
    }

    /// Calibrate, then floor, then inflate for extrapolation. The order
    /// matters: the floor is widened too when the query is out of domain.
    pub fn calibrate(&self, raw_std: f64, extrapolation_risk: f64) -> CalibratedUncertainty {
        let mut calibrated_std = (raw_std * self.factor).max(self.floor);

        let inflated = extrapolation_risk > self.extrapolation_threshold;
        if inflated {
            calibrated_std *= 1.0 + extrapolation_risk;
        }

        CalibratedUncertainty {
            raw_std,
            calibrated_std,
            half_width: self.z_score * calibrated_std,
            inflated,
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::from_config(&PredictorConfig::default())
    }
}
