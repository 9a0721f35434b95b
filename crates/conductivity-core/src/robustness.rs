use serde::{Deserialize, Serialize};

use crate::error::PredictorResult;
use crate::model::{FittedModel, ModelFitter};
use crate::training::TrainingSet;

/// Leave-one-out diagnostics for the current training set.
///
/// Each held-out sample is predicted by a model (scaler included) refit on
/// the remaining samples. Comparing that error with the in-sample error
/// shows whether the fit generalizes: an `overfitting_ratio` near 1 is
/// healthy, one near 0 means the model memorizes its training points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    /// RMSE of held-out predictions, W/(m·K)
    pub rmse_loo: f64,
    /// RMSE of the full model on its own training set, W/(m·K)
    pub rmse_train: f64,
    /// `rmse_train / rmse_loo`, 1.0 when both are zero
    pub overfitting_ratio: f64,
    /// Number of held-out folds
    pub folds: usize,
}

/// Run leave-one-out validation. Returns `None` below two samples, where no
/// fold can be formed.
pub fn validate(
    fitter: &dyn ModelFitter,
    training: &TrainingSet,
    model: &FittedModel,
) -> PredictorResult<Option<RobustnessReport>> {
    let n = training.len();
    if n < 2 {
        return Ok(None);
    }

    let mut loo_sq_error = 0.0;
    for i in 0..n {
        let (features, targets) = training.without(i);
        let fold_model = fitter.fit(&features, &targets)?;
        let (predicted, _) = fold_model.predict(&training.feature_row(i))?;
        loo_sq_error += (training.targets()[i] - predicted).powi(2);
    }
    let rmse_loo = (loo_sq_error / n as f64).sqrt();

    let train_predictions = model.predict_means(training.features())?;
    let train_sq_error: f64 = train_predictions
        .iter()
        .zip(training.targets().iter())
        .map(|(predicted, actual)| (actual - predicted).powi(2))
        .sum();
    let rmse_train = (train_sq_error / n as f64).sqrt();

    let overfitting_ratio = if rmse_loo > 0.0 {
        rmse_train / rmse_loo
    } else {
        1.0
    };

    Ok(Some(RobustnessReport {
        rmse_loo,
        rmse_train,
        overfitting_ratio,
        folds: n,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PredictorConfig;
    use crate::model::FullRefit;
    use crate::seed::seed_samples;
    use crate::types::{Fractions, Sample};
    use approx::assert_relative_eq;

    fn run(samples: Vec<Sample>) -> Option<RobustnessReport> {
        let training = TrainingSet::from_samples(samples);
        let fitter = FullRefit::new(&PredictorConfig::default());
        let model = fitter.fit(training.features(), training.targets()).unwrap();
        validate(&fitter, &training, &model).unwrap()
    }

    #[test]
    fn test_seed_data_report() {
        let report = run(seed_samples()).unwrap();
        assert_eq!(report.folds, 12);
        assert_relative_eq!(report.rmse_loo, 0.000480, epsilon = 2e-5);
        assert_relative_eq!(report.rmse_train, 0.000326, epsilon = 2e-5);
        // In-sample error stays below held-out error but not by much
        assert!(report.overfitting_ratio > 0.5 && report.overfitting_ratio < 1.0);
    }

    #[test]
    fn test_single_sample_has_no_folds() {
        let samples = seed_samples().into_iter().take(1).collect();
        assert!(run(samples).is_none());
    }

    #[test]
    fn test_two_samples_still_defined() {
        let samples: Vec<Sample> = seed_samples().into_iter().take(2).collect();
        let report = run(samples).unwrap();
        assert_eq!(report.folds, 2);
        assert!(report.rmse_loo.is_finite());
        assert!(report.overfitting_ratio.is_finite());
    }

    #[test]
    fn test_identical_targets_give_unit_ratio() {
        let samples = vec![
            Sample::new(Fractions::new(11.23, 56.51, 25.95, 5.14, 1.17), 0.04),
            Sample::new(Fractions::new(20.83, 59.83, 15.83, 2.74, 0.78), 0.04),
            Sample::new(Fractions::new(15.83, 53.44, 20.46, 7.26, 3.01), 0.04),
        ];
        let report = run(samples).unwrap();
        assert_relative_eq!(report.rmse_loo, 0.0, epsilon = 1e-15);
        assert_eq!(report.overfitting_ratio, 1.0);
    }
}
