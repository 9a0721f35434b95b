use nalgebra::{DMatrix, DVector};

use crate::features::{FeatureVector, FEATURE_COUNT};
use crate::types::Sample;

/// Append-only set of laboratory samples with their derived features.
///
/// Row `i` of `features` and entry `i` of `targets` always belong to
/// `samples[i]`. Appending builds a new set; an existing one never changes.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    samples: Vec<Sample>,
    features: DMatrix<f64>,
    targets: DVector<f64>,
}

impl TrainingSet {
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let features = DMatrix::from_fn(samples.len(), FEATURE_COUNT, |i, j| {
            FeatureVector::from_fractions(&samples[i].fractions).to_array()[j]
        });
        let targets = DVector::from_iterator(samples.len(), samples.iter().map(|s| s.lambda));
        Self {
            samples,
            features,
            targets,
        }
    }

    /// Copy of this set with `sample` appended.
    pub fn with_sample(&self, sample: Sample) -> Self {
        let mut samples = self.samples.clone();
        samples.push(sample);
        Self::from_samples(samples)
    }

    /// Features and targets with row `index` held out.
    pub fn without(&self, index: usize) -> (DMatrix<f64>, DVector<f64>) {
        (
            self.features.clone().remove_row(index),
            self.targets.clone().remove_row(index),
        )
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn features(&self) -> &DMatrix<f64> {
        &self.features
    }

    pub fn targets(&self) -> &DVector<f64> {
        &self.targets
    }

    pub fn feature_row(&self, index: usize) -> Vec<f64> {
        self.features.row(index).iter().copied().collect()
    }
}
