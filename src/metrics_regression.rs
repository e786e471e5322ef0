//! Common metrics for regression
//!
//! This module implements common comparison metrices for continuous variables.

use ndarray::prelude::*;
use ndarray::Data;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    Float,
};

/// Regression metrices trait
///
/// Implemented for one-dimensional arrays of predictions. The argument `compare_to` is the ground
/// truth, so to evaluate the accuracy of a prediction, use
/// ```ignore
/// prediction.r2(&ground_truth)
/// ```
pub trait Regression<F: Float> {
    /// Maximal error between two continuous variables
    fn max_error<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>) -> Result<F>;
    /// Mean error between two continuous variables
    fn mean_absolute_error<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>) -> Result<F>;
    /// Mean squared error between two continuous variables
    fn mean_squared_error<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>) -> Result<F>;
    /// Square root of the mean squared error, in the unit of the targets
    fn root_mean_squared_error<D: Data<Elem = F>>(
        &self,
        compare_to: &ArrayBase<D, Ix1>,
    ) -> Result<F>;
    /// R squared coefficient, is the proportion of the variance in the dependent variable that is
    /// predictable from the independent variable.
    ///
    /// A constant ground truth yields `1.0` for a perfect prediction and `0.0` otherwise.
    fn r2<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>) -> Result<F>;
    /// Same as R-Squared but with biased variance
    fn explained_variance<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>)
        -> Result<F>;
}

impl<F: Float, S: Data<Elem = F>> Regression<F> for ArrayBase<S, Ix1> {
    fn max_error<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>) -> Result<F> {
        let diff = residuals(self, compare_to)?;

        Ok(diff.iter().map(|x| x.abs()).fold(F::zero(), F::max))
    }

    fn mean_absolute_error<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>) -> Result<F> {
        let diff = residuals(self, compare_to)?;

        diff.mapv(|x| x.abs()).mean().ok_or(Error::NotEnoughSamples)
    }

    fn mean_squared_error<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>) -> Result<F> {
        let diff = residuals(self, compare_to)?;

        diff.mapv(|x| x * x).mean().ok_or(Error::NotEnoughSamples)
    }

    fn root_mean_squared_error<D: Data<Elem = F>>(
        &self,
        compare_to: &ArrayBase<D, Ix1>,
    ) -> Result<F> {
        self.mean_squared_error(compare_to).map(|x| x.sqrt())
    }

    // r2 = 1 - sum((pred_i - y_i)^2)/sum((mean_y - y_i)^2)
    // the mean is of `compare_to`, so the denominator compares `compare_to`
    // and its mean, not self and the mean
    fn r2<D: Data<Elem = F>>(&self, compare_to: &ArrayBase<D, Ix1>) -> Result<F> {
        let diff = residuals(self, compare_to)?;
        let mean = compare_to.mean().ok_or(Error::NotEnoughSamples)?;

        let numerator = diff.mapv(|x| x * x).sum();
        let denominator = compare_to.mapv(|x| (x - mean) * (x - mean)).sum();

        Ok(score_from_ratio(numerator, denominator))
    }

    fn explained_variance<D: Data<Elem = F>>(
        &self,
        compare_to: &ArrayBase<D, Ix1>,
    ) -> Result<F> {
        let diff = residuals(self, compare_to)?;
        let mean = compare_to.mean().ok_or(Error::NotEnoughSamples)?;
        let mean_error = diff.mean().ok_or(Error::NotEnoughSamples)?;

        let numerator = diff.mapv(|x| (x - mean_error) * (x - mean_error)).sum();
        let denominator = compare_to.mapv(|x| (x - mean) * (x - mean)).sum();

        Ok(score_from_ratio(numerator, denominator))
    }
}

fn residuals<F: Float, S: Data<Elem = F>, D: Data<Elem = F>>(
    prediction: &ArrayBase<S, Ix1>,
    ground_truth: &ArrayBase<D, Ix1>,
) -> Result<Array1<F>> {
    if ground_truth.len() != prediction.len() {
        return Err(Error::MismatchedShapes {
            expected: ground_truth.len(),
            actual: prediction.len(),
        });
    }
    if ground_truth.is_empty() {
        return Err(Error::NotEnoughSamples);
    }

    Ok(prediction - ground_truth)
}

fn score_from_ratio<F: Float>(numerator: F, denominator: F) -> F {
    if denominator > F::zero() {
        F::one() - numerator / denominator
    } else if numerator > F::zero() {
        F::zero()
    } else {
        F::one()
    }
}

/// Accuracy scores reported for a single training run
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics<F> {
    /// Root mean squared error
    pub rmse: F,
    /// Mean absolute error
    pub mae: F,
    /// Coefficient of determination
    pub r2: F,
}

/// Compare predicted with actual targets and compute RMSE, MAE and R²
///
/// This is a pure function, calling it twice with the same inputs gives the same scores.
pub fn eval_metrics<F: Float, D1: Data<Elem = F>, D2: Data<Elem = F>>(
    actual: &ArrayBase<D1, Ix1>,
    predicted: &ArrayBase<D2, Ix1>,
) -> Result<EvalMetrics<F>> {
    Ok(EvalMetrics {
        rmse: predicted.root_mean_squared_error(actual)?,
        mae: predicted.mean_absolute_error(actual)?,
        r2: predicted.r2(actual)?,
    })
}
