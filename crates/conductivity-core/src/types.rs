use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, PredictorResult};
use crate::robustness::RobustnessReport;

/// Accepted window for the sum of the five fractions, in percent (inclusive).
pub const FRACTION_SUM_MIN: f64 = 99.0;
pub const FRACTION_SUM_MAX: f64 = 101.0;

/// Granulometric distribution of a material, in percent per size bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fractions {
    /// Particles larger than 2 mm
    pub taux_2mm: f64,
    /// Particles between 1 and 2 mm
    pub taux_1mm: f64,
    /// Particles between 500 µm and 1 mm
    pub taux_500um: f64,
    /// Particles between 250 and 500 µm
    pub taux_250um: f64,
    /// Particles below 250 µm
    pub taux_0: f64,
}

impl Fractions {
    pub fn new(taux_2mm: f64, taux_1mm: f64, taux_500um: f64, taux_250um: f64, taux_0: f64) -> Self {
        Self {
            taux_2mm,
            taux_1mm,
            taux_500um,
            taux_250um,
            taux_0,
        }
    }

    pub fn as_array(&self) -> [f64; 5] {
        [
            self.taux_2mm,
            self.taux_1mm,
            self.taux_500um,
            self.taux_250um,
            self.taux_0,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Full input check: every bucket must be a finite, non-negative
    /// percentage and the buckets must add up to roughly 100%.
    ///
    /// A negative bucket can still sum to 100 but would feed a negative
    /// argument to the fines-ratio log.
    pub fn validate(&self) -> PredictorResult<()> {
        let buckets = [
            ("taux_2mm", self.taux_2mm),
            ("taux_1mm", self.taux_1mm),
            ("taux_500um", self.taux_500um),
            ("taux_250um", self.taux_250um),
            ("taux_0", self.taux_0),
        ];
        if let Some(&(field, value)) = buckets
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(PredictorError::InvalidFractions { field, value });
        }
        self.validate_sum()
    }

    /// Reject distributions that do not add up to roughly 100%.
    ///
    /// The sum is reported as-is; nothing is renormalized. A NaN component
    /// fails the check as well.
    pub fn validate_sum(&self) -> PredictorResult<()> {
        let sum = self.sum();
        if (FRACTION_SUM_MIN..=FRACTION_SUM_MAX).contains(&sum) {
            Ok(())
        } else {
            Err(PredictorError::FractionSum { sum })
        }
    }
}

/// A laboratory measurement: a distribution and its measured conductivity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub fractions: Fractions,
    /// Measured thermal conductivity, W/(m·K)
    pub lambda: f64,
}

impl Sample {
    pub fn new(fractions: Fractions, lambda: f64) -> Self {
        Self { fractions, lambda }
    }
}

/// Classification of a prediction against the conductivity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Conforme,
    NonConforme,
}

impl ComplianceStatus {
    /// Lower conductivity insulates better, so the threshold is an upper bound.
    pub fn classify(lambda_predicted: f64, threshold: f64) -> Self {
        if lambda_predicted <= threshold {
            ComplianceStatus::Conforme
        } else {
            ComplianceStatus::NonConforme
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Conforme => "conforme",
            ComplianceStatus::NonConforme => "non_conforme",
        }
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted conductivity, W/(m·K)
    pub lambda_predicted: f64,
    /// Half-width of the 90% interval around `lambda_predicted`
    pub confidence_interval: f64,
    pub status: ComplianceStatus,
    pub r1p_log: f64,
    pub ee_best: f64,
    pub threshold: f64,
    /// 0 inside the training domain, up to 1 far outside it
    pub extrapolation_risk: f64,
}

/// Outcome of [`crate::Predictor::add_sample`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleAdded {
    pub message: String,
    pub samples_count: usize,
    pub robustness: Option<RobustnessReport>,
}
