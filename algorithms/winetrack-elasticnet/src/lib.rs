//! # Elastic Net
//!
//! Linear regression with a mixed L1/L2 penalty, fitted by coordinate descent. A larger `alpha`
//! shrinks the coefficients, and with a non-zero L1 share some of them become exactly zero.
//!
//! ## Example
//!
//! ```
//! use winetrack::prelude::*;
//! use winetrack_elasticnet::{ElasticNet, Result};
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! fn main() -> Result<()> {
//!     let mut rng = Xoshiro256Plus::seed_from_u64(40);
//!     let dataset = winetrack_datasets::generate::winequality_like(200, &mut rng);
//!     let (train, valid) = dataset.shuffle(&mut rng).split_with_ratio(0.75);
//!
//!     let model = ElasticNet::params()
//!         .l1_ratio(0.5)
//!         .penalty(0.5)
//!         .fit(&train)?;
//!
//!     let predicted = model.predict(&valid);
//!     let metrics = eval_metrics(valid.targets(), &predicted)?;
//!     println!("rmse {} / mae {} / r2 {}", metrics.rmse, metrics.mae, metrics.r2);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Implementation
//!
//! Each sweep updates one coefficient at a time with a soft-thresholding step while the others
//! stay fixed. Sweeps stop when the duality gap falls below `tolerance * ||y||^2` or after
//! `max_iterations`. With an intercept the records and targets are centered first and the
//! intercept is recovered from the means afterwards.
//!
//! The method follows [glmnet](http://www.jstatsoft.org/v33/i01/paper).

use ndarray::Array1;
use winetrack::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

mod algorithm;
mod error;
mod hyperparams;

pub use error::{ElasticNetError, Result};
pub use hyperparams::{ElasticNetParams, ElasticNetValidParams, Selection};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
/// A fitted elastic net: coefficients, intercept and convergence details
pub struct ElasticNet<F> {
    hyperplane: Array1<F>,
    intercept: F,
    duality_gap: F,
    n_steps: u32,
}

impl<F: Float> ElasticNet<F> {
    /// Default settings, see [`ElasticNetParams`]
    pub fn params() -> ElasticNetParams<F> {
        ElasticNetParams::new()
    }

    /// Settings with `l1_ratio = 0`
    pub fn ridge() -> ElasticNetParams<F> {
        ElasticNetParams::new().l1_ratio(F::zero())
    }

    /// Settings with `l1_ratio = 1`
    pub fn lasso() -> ElasticNetParams<F> {
        ElasticNetParams::new().l1_ratio(F::one())
    }
}
