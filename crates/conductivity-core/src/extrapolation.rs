use nalgebra::DMatrix;

use crate::error::{PredictorError, PredictorResult};

/// Scores how far a query lies outside the observed training feature ranges.
///
/// Works on raw features. The score is advisory: it widens the reported
/// interval but never blocks a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrapolationDetector {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl ExtrapolationDetector {
    pub fn fit(features: &DMatrix<f64>) -> PredictorResult<Self> {
        if features.nrows() == 0 {
            return Err(PredictorError::InsufficientData(
                "cannot bound an empty training set".to_string(),
            ));
        }
        let min = features.column_iter().map(|c| c.min()).collect();
        let max = features.column_iter().map(|c| c.max()).collect();
        Ok(Self { min, max })
    }

    /// Mean per-dimension distance outside `[min, max]` in units of the
    /// range, clipped to `[0, 1]`.
    ///
    /// A dimension with zero range counts 0 on the observed value and 1
    /// anywhere else.
    pub fn risk(&self, features: &[f64]) -> PredictorResult<f64> {
        if features.len() != self.min.len() {
            return Err(PredictorError::DimensionMismatch {
                expected: self.min.len(),
                actual: features.len(),
            });
        }

        let total: f64 = features
            .iter()
            .enumerate()
            .map(|(j, &x)| {
                let (lo, hi) = (self.min[j], self.max[j]);
                let range = hi - lo;
                if range > 0.0 {
                    ((lo - x) / range).max((x - hi) / range).max(0.0)
                } else if x == lo {
                    0.0
                } else {
                    1.0
                }
            })
            .sum();

        let risk = total / features.len() as f64;
        Ok(if risk.is_nan() { 1.0 } else { risk.clamp(0.0, 1.0) })
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn max(&self) -> &[f64] {
        &self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn detector() -> ExtrapolationDetector {
        let x = DMatrix::from_row_slice(3, 2, &[0.0, 10.0, 1.0, 20.0, 2.0, 30.0]);
        ExtrapolationDetector::fit(&x).unwrap()
    }

    #[test]
    fn test_inside_range_is_zero() {
        let d = detector();
        assert_eq!(d.risk(&[1.0, 20.0]).unwrap(), 0.0);
        assert_eq!(d.risk(&[0.0, 30.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_grows_linearly_outside() {
        let d = detector();
        // One range beyond the max on dim 0, inside on dim 1
        assert_relative_eq!(d.risk(&[4.0, 20.0]).unwrap(), 0.5);
        // Half a range below the min on both dims
        assert_relative_eq!(d.risk(&[-1.0, 0.0]).unwrap(), 0.5);
    }

    #[test]
    fn test_clipped_to_one() {
        let d = detector();
        assert_eq!(d.risk(&[1e6, -1e6]).unwrap(), 1.0);
    }

    #[test]
    fn test_zero_range_dimension() {
        let x = DMatrix::from_row_slice(2, 2, &[0.0, 5.0, 2.0, 5.0]);
        let d = ExtrapolationDetector::fit(&x).unwrap();
        assert_eq!(d.risk(&[1.0, 5.0]).unwrap(), 0.0);
        assert_relative_eq!(d.risk(&[1.0, 5.5]).unwrap(), 0.5);
    }

    #[test]
    fn test_dimension_checked() {
        assert!(matches!(
            detector().risk(&[1.0]),
            Err(PredictorError::DimensionMismatch { .. })
        ));
    }
}
