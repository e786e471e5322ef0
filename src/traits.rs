//! Provide traits for different classes of algorithms
//!

use crate::dataset::{Dataset, Float};
use std::error::Error;

/// Fittable algorithms
///
/// A fittable algorithm takes a dataset and creates a concept of some kind about it. For example
/// in *ElasticNet* this would be the hyperplane and intercept minimizing the penalized squared
/// error. The error type `E` has to be able to absorb errors from this crate, as records and
/// targets are validated before fitting.
pub trait Fit<F: Float, E: Error + From<crate::error::Error>> {
    type Object;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object, E>;
}

/// Predict with model
///
/// Estimators usually provide the following input/output combinations:
///
/// * &Array2 -> Array1
/// * &Dataset -> Array1
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}
