use crate::types::{Fractions, Sample};

/// The twelve laboratory samples the model starts from.
const SEED: [([f64; 5], f64); 12] = [
    ([11.23, 56.51, 25.95, 5.14, 1.17], 0.0395),
    ([11.63, 57.67, 25.10, 4.66, 0.95], 0.0395),
    ([14.32, 57.36, 22.59, 4.73, 0.99], 0.0395),
    ([14.56, 55.55, 22.77, 5.72, 1.39], 0.0398),
    ([20.83, 59.83, 15.83, 2.74, 0.78], 0.0397),
    ([15.60, 57.54, 21.59, 4.15, 1.13], 0.0401),
    ([15.13, 57.39, 20.96, 5.47, 1.06], 0.0396),
    ([13.61, 56.30, 23.85, 5.57, 0.67], 0.0408),
    ([15.23, 58.18, 21.55, 4.23, 0.81], 0.0400),
    ([20.10, 58.58, 17.06, 3.30, 0.96], 0.0400),
    ([16.71, 54.32, 20.75, 5.88, 2.33], 0.0387),
    ([15.83, 53.44, 20.46, 7.26, 3.01], 0.0393),
];

pub fn seed_samples() -> Vec<Sample> {
    SEED.iter()
        .map(|([a, b, c, d, e], lambda)| Sample::new(Fractions::new(*a, *b, *c, *d, *e), *lambda))
        .collect()
}
