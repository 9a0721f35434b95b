use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, PredictorResult};
use crate::features::FEATURE_COUNT;

/// Frozen model settings.
///
/// Kernel hyperparameters are never fitted to the data: with a dozen
/// samples an optimizer would chase noise, so the length scales and the
/// noise level are fixed here instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// RBF length scale per feature, in standardized units
    pub length_scales: Vec<f64>,
    /// White-noise variance, in normalized target units
    pub noise_level: f64,
    /// Diagonal jitter added on top of the noise for the factorization
    pub jitter: f64,
    /// Multiplier on the raw predictive std (empirical, targets ~90% coverage)
    pub calibration_factor: f64,
    /// Smallest calibrated std ever reported, W/(m·K)
    pub uncertainty_floor: f64,
    /// Extrapolation risk above which the interval is widened
    pub extrapolation_threshold: f64,
    /// z-score turning the calibrated std into a half-width
    pub z_score: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            length_scales: vec![5.0; FEATURE_COUNT],
            noise_level: 1e-1,
            jitter: 1e-6,
            calibration_factor: 1.85,
            uncertainty_floor: 0.0003,
            extrapolation_threshold: 0.3,
            z_score: 1.645,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> PredictorResult<()> {
        if self.length_scales.len() != FEATURE_COUNT {
            return Err(PredictorError::InvalidConfig(format!(
                "expected {} length scales, got {}",
                FEATURE_COUNT,
                self.length_scales.len()
            )));
        }
        if self.length_scales.iter().any(|l| !(l.is_finite() && *l > 0.0)) {
            return Err(PredictorError::InvalidConfig(
                "length scales must be finite and positive".to_string(),
            ));
        }
        if !(self.noise_level.is_finite() && self.noise_level >= 0.0) {
            return Err(PredictorError::InvalidConfig(
                "noise_level must be finite and >= 0".to_string(),
            ));
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(PredictorError::InvalidConfig(
                "jitter must be finite and >= 0".to_string(),
            ));
        }
        if self.noise_level + self.jitter <= 0.0 {
            return Err(PredictorError::InvalidConfig(
                "noise_level + jitter must be positive".to_string(),
            ));
        }
        if !(self.calibration_factor.is_finite() && self.calibration_factor > 0.0) {
            return Err(PredictorError::InvalidConfig(
                "calibration_factor must be positive".to_string(),
            ));
        }
        if !(self.uncertainty_floor.is_finite() && self.uncertainty_floor >= 0.0) {
            return Err(PredictorError::InvalidConfig(
                "uncertainty_floor must be >= 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.extrapolation_threshold) {
            return Err(PredictorError::InvalidConfig(
                "extrapolation_threshold must be between 0 and 1".to_string(),
            ));
        }
        if !(self.z_score.is_finite() && self.z_score > 0.0) {
            return Err(PredictorError::InvalidConfig(
                "z_score must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PredictorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_wrong_length_scale_count() {
        let config = PredictorConfig {
            length_scales: vec![5.0, 5.0],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PredictorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_noise_and_jitter_rejected() {
        let config = PredictorConfig {
            noise_level: 0.0,
            jitter: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
