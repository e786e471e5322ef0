//! `winetrack` contains the shared building blocks of the wine quality training workflow.
//!
//! It is modelled after the classical "fit on a dataset, predict on records" toolkit layout:
//!
//! * [`Dataset`](dataset::Dataset) bundles a record matrix with a target vector and can be
//!   shuffled and split into training and validation parts
//! * [`Fit`](traits::Fit) and [`Predict`](traits::Predict) are implemented by the estimators in
//!   the `algorithms/` crates
//! * [`ParamGuard`](param_guard::ParamGuard) separates unchecked hyper-parameter sets from
//!   verified ones
//! * [`metrics`] implements the regression scores reported after each training run
//!
//! Loading data, the ElasticNet estimator and the experiment tracking client live in their own
//! workspace crates.

pub mod dataset;
pub mod error;
mod metrics_regression;
pub mod param_guard;
pub mod prelude;
pub mod traits;

pub use dataset::{Dataset, Float};
pub use error::{Error, Result};
pub use param_guard::ParamGuard;

/// Common metrics functions for regression
pub mod metrics {
    pub use crate::metrics_regression::{eval_metrics, EvalMetrics, Regression};
}
