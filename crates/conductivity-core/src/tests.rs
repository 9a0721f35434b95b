use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};

use crate::*;

const THRESHOLD: f64 = 0.045;

fn seeded() -> Predictor {
    Predictor::with_seed_data(PredictorConfig::default()).unwrap()
}

fn reference() -> Fractions {
    Fractions::new(11.23, 56.51, 25.95, 5.14, 1.17)
}

/// Wraps the full refit and counts how often it runs.
struct CountingFitter {
    inner: FullRefit,
    fits: AtomicUsize,
}

impl ModelFitter for CountingFitter {
    fn fit(&self, features: &DMatrix<f64>, targets: &DVector<f64>) -> PredictorResult<FittedModel> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        self.inner.fit(features, targets)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

// ===== Input validation =====

#[test]
fn test_exact_hundred_never_rejected() {
    let predictor = seeded();
    let distributions = [
        Fractions::new(15.0, 56.0, 22.0, 5.0, 2.0),
        Fractions::new(100.0, 0.0, 0.0, 0.0, 0.0),
        Fractions::new(0.0, 0.0, 0.0, 0.0, 100.0),
        Fractions::new(20.0, 20.0, 20.0, 20.0, 20.0),
        Fractions::new(0.0, 50.0, 50.0, 0.0, 0.0),
    ];
    for fractions in &distributions {
        assert!(predictor.predict(fractions, THRESHOLD).is_ok(), "{:?}", fractions);
    }
}

#[test]
fn test_out_of_window_sums_rejected() {
    let predictor = seeded();

    let low = Fractions::new(10.0, 50.0, 15.0, 4.0, 1.0);
    match predictor.predict(&low, THRESHOLD) {
        Err(PredictorError::FractionSum { sum }) => assert_relative_eq!(sum, 80.0),
        other => panic!("expected FractionSum, got {:?}", other),
    }

    let high = Fractions::new(20.0, 60.0, 30.0, 8.0, 2.0);
    match predictor.predict(&high, THRESHOLD) {
        Err(PredictorError::FractionSum { sum }) => assert_relative_eq!(sum, 120.0),
        other => panic!("expected FractionSum, got {:?}", other),
    }
}

#[test]
fn test_add_sample_validates_before_mutating() {
    let predictor = seeded();

    let bad_sum = predictor.add_sample(&Fractions::new(10.0, 10.0, 10.0, 10.0, 10.0), 0.04);
    assert!(matches!(bad_sum, Err(PredictorError::FractionSum { .. })));

    let bad_lambda = predictor.add_sample(&reference(), f64::NAN);
    assert!(matches!(bad_lambda, Err(PredictorError::InvalidMeasurement(_))));

    assert_eq!(predictor.samples_count(), 12);
}

#[test]
fn test_negative_bucket_rejected_before_model() {
    let predictor = seeded();
    let fractions = Fractions::new(20.0, 60.0, 16.0, -1.0, 5.0);
    let expected = PredictorError::InvalidFractions {
        field: "taux_250um",
        value: -1.0,
    };

    assert_eq!(predictor.predict(&fractions, THRESHOLD).unwrap_err(), expected);
    assert_eq!(predictor.add_sample(&fractions, 0.04).unwrap_err(), expected);
    assert_eq!(predictor.samples_count(), 12);
}

#[test]
fn test_predictions_are_always_finite() {
    let predictor = seeded();
    let queries = [
        Fractions::new(0.0, 0.0, 0.0, 0.0, 100.0),
        Fractions::new(0.0, 50.0, 50.0, 0.0, 0.0),
        Fractions::new(0.0, 0.0, 0.0, 100.0, 0.0),
    ];
    for fractions in &queries {
        let result = predictor.predict(fractions, THRESHOLD).unwrap();
        assert!(result.lambda_predicted.is_finite(), "{:?}", fractions);
        assert!(result.confidence_interval.is_finite(), "{:?}", fractions);
        assert!(result.r1p_log.is_finite() && result.ee_best.is_finite());
    }
}

#[test]
fn test_empty_training_set_rejected() {
    assert!(matches!(
        Predictor::new(PredictorConfig::default(), Vec::new()),
        Err(PredictorError::InsufficientData(_))
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let config = PredictorConfig {
        length_scales: vec![5.0],
        ..Default::default()
    };
    assert!(matches!(
        Predictor::with_seed_data(config),
        Err(PredictorError::InvalidConfig(_))
    ));
}

// ===== Predictions =====

#[test]
fn test_reference_sample_round_trip() {
    let result = seeded().predict(&reference(), THRESHOLD).unwrap();

    assert_relative_eq!(result.lambda_predicted, 0.03970, epsilon = 5e-5);
    assert!((result.lambda_predicted - 0.0395).abs() <= result.confidence_interval);
    assert_eq!(result.status, ComplianceStatus::Conforme);
    assert_eq!(result.threshold, THRESHOLD);
    assert_relative_eq!(result.r1p_log, 1.799_833_144, epsilon = 1e-8);
    assert_relative_eq!(result.ee_best, 3.908_827_464, epsilon = 1e-8);
    assert_eq!(result.extrapolation_risk, 0.0);
}

#[test]
fn test_seed_samples_mostly_inside_their_interval() {
    let predictor = seeded();
    let inside = seed_samples()
        .iter()
        .filter(|sample| {
            let result = predictor.predict(&sample.fractions, THRESHOLD).unwrap();
            (result.lambda_predicted - sample.lambda).abs() <= result.confidence_interval
        })
        .count();
    assert!(inside >= 10, "only {} of 12 inside", inside);
}

#[test]
fn test_half_width_never_below_floor() {
    let predictor = seeded();
    let floor = PredictorConfig::default().uncertainty_floor;
    let mut queries: Vec<Fractions> = seed_samples().iter().map(|s| s.fractions).collect();
    queries.push(Fractions::new(15.0, 56.0, 22.0, 5.0, 2.0));
    queries.push(Fractions::new(100.0, 0.0, 0.0, 0.0, 0.0));
    queries.push(Fractions::new(12.0, 58.0, 24.0, 5.0, 1.0));

    for fractions in &queries {
        let result = predictor.predict(fractions, THRESHOLD).unwrap();
        assert!(result.confidence_interval >= floor);
        assert!(result.confidence_interval >= 1.645 * floor - 1e-15);
    }
}

#[test]
fn test_extrapolation_risk_zero_on_training_point() {
    let predictor = seeded();
    for sample in seed_samples() {
        let result = predictor.predict(&sample.fractions, THRESHOLD).unwrap();
        assert_eq!(result.extrapolation_risk, 0.0);
    }
}

#[test]
fn test_far_query_is_flagged_and_widened() {
    let predictor = seeded();
    let far = Fractions::new(100.0, 0.0, 0.0, 0.0, 0.0);
    let result = predictor.predict(&far, THRESHOLD).unwrap();

    assert!(result.extrapolation_risk > 0.0);
    assert_eq!(result.extrapolation_risk, 1.0);
    // Far from every training point the GP falls back to the target mean
    let mean_lambda = seed_samples().iter().map(|s| s.lambda).sum::<f64>() / 12.0;
    assert_relative_eq!(result.lambda_predicted, mean_lambda, epsilon = 1e-9);
    assert_relative_eq!(result.confidence_interval, 0.003_110_5, epsilon = 1e-6);
}

#[test]
fn test_threshold_is_caller_supplied() {
    let predictor = seeded();
    let fractions = Fractions::new(15.0, 56.0, 22.0, 5.0, 2.0);

    let loose = predictor.predict(&fractions, 0.045).unwrap();
    assert_eq!(loose.status, ComplianceStatus::Conforme);
    assert_eq!(loose.threshold, 0.045);

    let strict = predictor.predict(&fractions, 0.039).unwrap();
    assert_eq!(strict.status, ComplianceStatus::NonConforme);
    assert_eq!(strict.lambda_predicted, loose.lambda_predicted);
}

#[test]
fn test_predict_does_not_mutate() {
    let predictor = seeded();
    let before = predictor.snapshot();
    predictor.predict(&reference(), THRESHOLD).unwrap();
    assert!(Arc::ptr_eq(&before, &predictor.snapshot()));
}

// ===== Online learning =====

#[test]
fn test_add_sample_then_predict_sees_new_data() {
    let predictor = seeded();
    let fractions = Fractions::new(15.0, 56.0, 22.0, 5.0, 2.0);
    let before = predictor.predict(&fractions, THRESHOLD).unwrap();
    let report_before = predictor.robustness().unwrap();

    let added = predictor.add_sample(&fractions, 0.0410).unwrap();
    assert_eq!(added.samples_count, 13);
    assert_eq!(predictor.samples_count(), 13);

    let report = added.robustness.unwrap();
    assert_eq!(report.folds, 13);
    assert!(report.rmse_loo.is_finite());
    assert!(report.overfitting_ratio.is_finite());
    assert_ne!(report.rmse_loo, report_before.rmse_loo);
    assert_eq!(predictor.robustness(), Some(report));

    let after = predictor.predict(&fractions, THRESHOLD).unwrap();
    // Pulled toward the new, higher measurement
    assert!(after.lambda_predicted > before.lambda_predicted);
    assert_eq!(predictor.samples().last().map(|s| s.lambda), Some(0.0410));
}

#[test]
fn test_every_addition_is_a_full_refit() {
    let config = PredictorConfig::default();
    let fitter = Arc::new(CountingFitter {
        inner: FullRefit::new(&config),
        fits: AtomicUsize::new(0),
    });
    let predictor =
        Predictor::with_fitter(config, seed_samples(), fitter.clone() as Arc<dyn ModelFitter>)
            .unwrap();
    // One full model plus one per leave-one-out fold
    assert_eq!(fitter.fits.load(Ordering::SeqCst), 13);

    predictor.add_sample(&reference(), 0.0396).unwrap();
    assert_eq!(fitter.fits.load(Ordering::SeqCst), 13 + 14);
}

#[test]
fn test_snapshot_parts_agree_after_growth() {
    let predictor = seeded();
    predictor
        .add_sample(&Fractions::new(18.0, 55.0, 20.0, 5.0, 2.0), 0.0399)
        .unwrap();

    let snapshot = predictor.snapshot();
    assert_eq!(snapshot.training().len(), 13);
    assert_eq!(snapshot.model().gp().n_train(), 13);
    assert_eq!(snapshot.robustness().map(|r| r.folds), Some(13));

    let features = snapshot.training().features();
    let mean_ee = features.column(2).iter().sum::<f64>() / 13.0;
    assert_relative_eq!(snapshot.model().scaler().mean()[2], mean_ee, epsilon = 1e-12);
}

// ===== Concurrency =====

#[test]
fn test_concurrent_readers_see_whole_snapshots() {
    let extra = [
        (Fractions::new(15.0, 56.0, 22.0, 5.0, 2.0), 0.0410),
        (Fractions::new(18.0, 55.0, 20.0, 5.0, 2.0), 0.0399),
        (Fractions::new(12.0, 58.0, 24.0, 5.0, 1.0), 0.0392),
    ];
    let query = reference();

    // Expected prediction for every training-set size the readers may see
    let mut expected = Vec::new();
    let mut samples = seed_samples();
    for k in 0..=extra.len() {
        if k > 0 {
            samples.push(Sample::new(extra[k - 1].0, extra[k - 1].1));
        }
        let p = Predictor::new(PredictorConfig::default(), samples.clone()).unwrap();
        expected.push(p.predict(&query, THRESHOLD).unwrap().lambda_predicted);
    }

    let predictor = Arc::new(seeded());
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let predictor = Arc::clone(&predictor);
            let expected = expected.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let snapshot = predictor.snapshot();
                    let n = snapshot.training().len();
                    assert_eq!(snapshot.model().gp().n_train(), n);
                    assert_eq!(snapshot.robustness().map(|r| r.folds), Some(n));

                    let lambda = predictor.predict(&query, THRESHOLD).unwrap().lambda_predicted;
                    assert!(expected.contains(&lambda), "mixed state: {}", lambda);
                }
            })
        })
        .collect();

    let writer = {
        let predictor = Arc::clone(&predictor);
        thread::spawn(move || {
            for (fractions, lambda) in extra {
                predictor.add_sample(&fractions, lambda).unwrap();
            }
        })
    };

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(predictor.samples_count(), 15);
    assert_eq!(
        predictor.predict(&query, THRESHOLD).unwrap().lambda_predicted,
        expected[3]
    );
}
