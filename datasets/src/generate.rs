//! Utility functions for randomly generating datasets

use ndarray::{Array, Array1, Array2, ArrayBase, Axis, Data, Ix1};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{StandardNormal, Uniform},
    RandomExt,
};
use winetrack::Dataset;

use crate::WINEQUALITY_FEATURES;

/// Value ranges of the red wine features, in the order of `WINEQUALITY_FEATURES`
const WINEQUALITY_RANGES: [(f64, f64); 11] = [
    (4.6, 15.9),
    (0.12, 1.58),
    (0.0, 1.0),
    (0.9, 15.5),
    (0.012, 0.611),
    (1.0, 72.0),
    (6.0, 289.0),
    (0.990, 1.004),
    (2.74, 4.01),
    (0.33, 2.0),
    (8.4, 14.9),
];

/// Generate `n` samples which resemble the red wine quality data
///
/// Every feature is drawn uniformly from the range observed in the real data. The quality is an
/// integer grade between 3 and 9 that rises with alcohol and sulphates and falls with volatile
/// acidity, plus some gaussian noise.
pub fn winequality_like(n: usize, rng: &mut impl Rng) -> Dataset<f64> {
    let mut records = Array2::zeros((n, WINEQUALITY_RANGES.len()));
    for (mut column, (low, high)) in records.axis_iter_mut(Axis(1)).zip(WINEQUALITY_RANGES) {
        column.assign(&Array::random_using(n, Uniform::new_inclusive(low, high), rng));
    }

    let noise = Array1::<f64>::random_using(n, StandardNormal, rng) * 0.5;
    let targets = records
        .outer_iter()
        .zip(noise.iter())
        .map(|(row, eps)| {
            let grade = 5.6 + 0.3 * (row[10] - 10.4) - 1.5 * (row[1] - 0.53)
                + 0.8 * (row[9] - 0.66)
                + eps;
            grade.round().max(3.0).min(9.0)
        })
        .collect::<Array1<_>>();

    Dataset::new(records, targets).with_feature_names(WINEQUALITY_FEATURES.to_vec())
}

/// Generate `n` samples with features uniform in `[-1, 1]` and noise-free targets
/// `records.dot(weights) + intercept`
pub fn linear(
    n: usize,
    weights: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    intercept: f64,
    rng: &mut impl Rng,
) -> Dataset<f64> {
    let records = Array::random_using((n, weights.len()), Uniform::new(-1., 1.), rng);
    let targets = records.dot(weights) + intercept;

    Dataset::new(records, targets)
}
