//! Feature engineering from raw granulometric fractions.
//!
//! Three features feed the model, in this column order:
//! 1. `r1p_log`: log-transform of the share of 250 µm particles among the
//!    two finest sieved buckets
//! 2. `taux_250um`: the raw 250–500 µm percentage
//! 3. `ee_best`: entanglement indicator, fibre connectivity discounted by dust

use serde::{Deserialize, Serialize};

use crate::types::Fractions;

pub const FEATURE_COUNT: usize = 3;

/// Characteristic particle size per bucket, mm (> 2 mm down to < 250 µm).
const BUCKET_SIZE_MM: [f64; 5] = [2.0, 1.0, 0.5, 0.25, 0.125];
/// Length / width ratio per bucket.
const BUCKET_ASPECT_RATIO: [f64; 5] = [12.0, 10.0, 8.0, 5.0, 3.0];

/// Empirical correction divisors on the 500 µm and 250 µm counts.
const K_500UM: f64 = 1.83;
const K_250UM: f64 = 3.04;
/// Weight of the 250 µm bucket in the dust estimate.
const DUST_250UM_WEIGHT: f64 = 0.196;
/// Dust saturates at this percentage.
const DUST_MAX_PERCENT: f64 = 1.76;
const DUST_PENALTY_EXPONENT: f64 = 0.572;

const RATIO_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub r1p_log: f64,
    pub taux_250um: f64,
    pub ee_best: f64,
}

impl FeatureVector {
    pub fn from_fractions(fractions: &Fractions) -> Self {
        Self {
            r1p_log: fines_ratio_log(fractions.taux_500um, fractions.taux_250um),
            taux_250um: fractions.taux_250um,
            ee_best: entanglement_indicator(fractions),
        }
    }

    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [self.r1p_log, self.taux_250um, self.ee_best]
    }
}

/// Entanglement indicator (EE_best).
///
/// Slender particles interlock; the relative particle count of each bucket is
/// weighted by how elongated it is, then penalized by the dust fraction.
pub fn entanglement_indicator(fractions: &Fractions) -> f64 {
    let percentages = fractions.as_array();

    let mut counts = [0.0; 5];
    for (i, count) in counts.iter_mut().enumerate() {
        *count = percentages[i] / (BUCKET_SIZE_MM[i].powi(2) * BUCKET_ASPECT_RATIO[i]);
    }
    counts[2] /= K_500UM;
    counts[3] /= K_250UM;

    let total: f64 = counts.iter().sum();
    // Validated fractions always have a positive total; direct callers may not
    let connectivity = if total > 0.0 {
        counts
            .iter()
            .zip(BUCKET_ASPECT_RATIO.iter())
            .map(|(count, aspect)| count / total * (aspect - 1.0))
            .sum()
    } else {
        0.0
    };

    let dust = (fractions.taux_0 + DUST_250UM_WEIGHT * fractions.taux_250um).min(DUST_MAX_PERCENT)
        / 100.0;
    let penalty = (-3.0 * dust).exp().powf(DUST_PENALTY_EXPONENT);

    connectivity * penalty
}

/// Fines-ratio log-transform (R1p_log).
///
/// Grows without bound (about 23 at the limit) as the 250 µm bucket vanishes
/// next to the 500 µm one; stays finite when both are zero.
pub fn fines_ratio_log(taux_500um: f64, taux_250um: f64) -> f64 {
    let ratio = taux_250um / (taux_500um + taux_250um + RATIO_EPSILON);
    -(ratio + RATIO_EPSILON).ln()
}
