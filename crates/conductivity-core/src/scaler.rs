use nalgebra::DMatrix;
use statrs::statistics::Statistics;

use crate::error::{PredictorError, PredictorResult};

/// Standard deviations below this are treated as zero.
const DEGENERATE_STD: f64 = 10.0 * f64::EPSILON;

/// Per-column standardization fitted on one training-set snapshot.
///
/// A column with no variance across the training set (`DegenerateScaling`)
/// is only centered: its scale is pinned to 1 so the model never sees NaN.
/// The affected column indices are kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    degenerate_columns: Vec<usize>,
}

impl Scaler {
    /// Fit on the full feature matrix (one row per sample).
    pub fn fit(x: &DMatrix<f64>) -> PredictorResult<Self> {
        if x.nrows() == 0 {
            return Err(PredictorError::InsufficientData(
                "cannot fit scaler on zero samples".to_string(),
            ));
        }

        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        let mut degenerate_columns = Vec::new();

        for (j, column) in x.column_iter().enumerate() {
            mean.push(column.iter().mean());
            // Population std, matching the usual standard-scaler convention
            let std = column.iter().population_std_dev();
            if std.is_finite() && std > DEGENERATE_STD {
                scale.push(std);
            } else {
                tracing::warn!(
                    "Feature column {} has no variance over {} samples, leaving it unscaled",
                    j,
                    x.nrows()
                );
                degenerate_columns.push(j);
                scale.push(1.0);
            }
        }

        Ok(Self {
            mean,
            scale,
            degenerate_columns,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn degenerate_columns(&self) -> &[usize] {
        &self.degenerate_columns
    }

    pub fn transform(&self, x: &DMatrix<f64>) -> PredictorResult<DMatrix<f64>> {
        self.check_width(x.ncols())?;
        Ok(DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            (x[(i, j)] - self.mean[j]) / self.scale[j]
        }))
    }

    pub fn transform_row(&self, row: &[f64]) -> PredictorResult<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }

    fn check_width(&self, actual: usize) -> PredictorResult<()> {
        if actual != self.n_features() {
            return Err(PredictorError::DimensionMismatch {
                expected: self.n_features(),
                actual,
            });
        }
        Ok(())
    }
}
