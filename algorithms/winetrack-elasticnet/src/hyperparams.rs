#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use winetrack::{Float, ParamGuard};

use crate::error::ElasticNetError;

use super::Result;

/// Order in which coordinates are updated during a sweep of the coordinate descent
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Loop over the features in order
    Cyclic,
    /// Draw a random feature for every update, seeded by `random_state`
    Random,
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Checked settings of an elastic net fit, produced by [`ElasticNetParams`](crate::ElasticNetParams)
pub struct ElasticNetValidParams<F> {
    penalty: F,
    l1_ratio: F,
    with_intercept: bool,
    max_iterations: u32,
    tolerance: F,
    selection: Selection,
    random_state: u64,
}

impl<F: Float> ElasticNetValidParams<F> {
    pub fn penalty(&self) -> F {
        self.penalty
    }

    pub fn l1_ratio(&self) -> F {
        self.l1_ratio
    }

    pub fn with_intercept(&self) -> bool {
        self.with_intercept
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn random_state(&self) -> u64 {
        self.random_state
    }
}

/// Builder for the elastic net settings
///
/// The fitted coefficients minimize
/// ```ignore
/// 1 / (2 * n_samples) * ||y - Xw||^2_2
///     + penalty * l1_ratio * ||w||_1
///     + 0.5 * penalty * (1 - l1_ratio) * ||w||^2_2
/// ```
///
/// [ParamGuard::check](Self::check) turns the builder into
/// [`ElasticNetValidParams`](crate::ElasticNetValidParams). Calling
/// [Fit::fit](winetrack::traits::Fit::fit) on the builder runs the same check first.
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :---| :--- |
/// | [penalty](Self::penalty) | `1.0` | Overall parameter penalty, also known as `alpha` | `[0, inf)` |
/// | [l1_ratio](Self::l1_ratio) | `0.5` | Distribution of penalty to L1 and L2 regularizations | `[0.0, 1.0]` |
/// | [with_intercept](Self::with_intercept) | `true` | Enable intercept | `false`, `true` |
/// | [tolerance](Self::tolerance) | `1e-4` | Relative duality gap at which the optimization stops | `[0, inf)` |
/// | [max_iterations](Self::max_iterations) | `1000` | Maximum number of sweeps | `[1, inf)` |
/// | [selection](Self::selection) | `Cyclic` | Coordinate update order | `Cyclic`, `Random` |
/// | [random_state](Self::random_state) | `42` | Seed for the `Random` selection | any `u64` |
///
/// # Errors
///
/// * [`InvalidPenalty`](ElasticNetError::InvalidPenalty) for a negative or NaN `alpha`
/// * [`InvalidL1Ratio`](ElasticNetError::InvalidL1Ratio) for a ratio outside `[0, 1]`
/// * [`InvalidTolerance`](ElasticNetError::InvalidTolerance) for a negative tolerance
/// * [`InvalidMaxIterations`](ElasticNetError::InvalidMaxIterations) for zero sweeps
///
/// # Example
///
/// ```rust
/// use winetrack_elasticnet::{ElasticNetParams, ElasticNetError};
/// use winetrack::prelude::*;
/// use ndarray::array;
///
/// let ds = Dataset::new(array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]], array![3.0, 2.0, 5.0]);
///
/// let params = ElasticNetParams::new().penalty(1e-5).l1_ratio(0.2);
/// let model = params.fit(&ds)?;
///
/// // a checked set can only fail during the fit itself
/// let checked = params.check()?;
/// assert_eq!(checked.fit(&ds)?, model);
/// # Ok::<(), ElasticNetError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ElasticNetParams<F>(ElasticNetValidParams<F>);

impl<F: Float> Default for ElasticNetParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> ElasticNetParams<F> {
    /// Defaults as listed in the table above
    pub fn new() -> ElasticNetParams<F> {
        Self(ElasticNetValidParams {
            penalty: F::one(),
            l1_ratio: F::cast(0.5),
            with_intercept: true,
            max_iterations: 1000,
            tolerance: F::cast(1e-4),
            selection: Selection::Cyclic,
            random_state: 42,
        })
    }

    /// Overall strength of the regularization, `alpha` in most references
    pub fn penalty(mut self, penalty: F) -> Self {
        self.0.penalty = penalty;
        self
    }

    /// Share of the penalty given to the L1 term. `1.0` is a pure lasso, `0.0` a pure ridge.
    pub fn l1_ratio(mut self, l1_ratio: F) -> Self {
        self.0.l1_ratio = l1_ratio;
        self
    }

    /// Fit an intercept on centered data
    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.0.with_intercept = with_intercept;
        self
    }

    /// Set the tolerance of the optimization. The coordinate descent stops once the duality gap
    /// drops below `tolerance` times the squared norm of the (centered) targets.
    ///
    /// Defaults to `1e-4` if not set
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Upper bound on full coordinate sweeps
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.0.max_iterations = max_iterations;
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.0.selection = selection;
        self
    }

    /// Seed the random number generator used with `Selection::Random`. Has no effect for
    /// cyclic updates.
    ///
    /// Defaults to `42` if not set
    pub fn random_state(mut self, random_state: u64) -> Self {
        self.0.random_state = random_state;
        self
    }
}

impl<F: Float> ParamGuard for ElasticNetParams<F> {
    type Checked = ElasticNetValidParams<F>;
    type Error = ElasticNetError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.penalty.is_negative() || self.0.penalty.is_nan() {
            Err(ElasticNetError::InvalidPenalty(
                self.0.penalty.to_f32().unwrap_or(f32::NAN),
            ))
        } else if !(F::zero()..=F::one()).contains(&self.0.l1_ratio) {
            Err(ElasticNetError::InvalidL1Ratio(
                self.0.l1_ratio.to_f32().unwrap_or(f32::NAN),
            ))
        } else if self.0.tolerance.is_negative() || self.0.tolerance.is_nan() {
            Err(ElasticNetError::InvalidTolerance(
                self.0.tolerance.to_f32().unwrap_or(f32::NAN),
            ))
        } else if self.0.max_iterations == 0 {
            Err(ElasticNetError::InvalidMaxIterations)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
