use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictorError {
    #[error("Fractions must sum to about 100% (actual: {sum:.2}%)")]
    FractionSum { sum: f64 },

    #[error("Fraction {field} must be a finite, non-negative percentage (actual: {value})")]
    InvalidFractions { field: &'static str, value: f64 },

    #[error("Feature dimension mismatch: model expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid measured conductivity: {0}")]
    InvalidMeasurement(f64),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Covariance matrix is not positive definite ({0} training points)")]
    NotPositiveDefinite(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PredictorResult<T> = Result<T, PredictorError>;
