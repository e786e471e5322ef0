use approx::{abs_diff_eq, abs_diff_ne};
use ndarray::{s, Array1, ArrayBase, ArrayView1, ArrayView2, Axis, CowArray, Data, Ix1, Ix2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use winetrack::traits::{Fit, Predict};
use winetrack::{Dataset, Float};

use super::{ElasticNet, ElasticNetError, ElasticNetValidParams, Result, Selection};

impl<F: Float> Fit<F, ElasticNetError> for ElasticNetValidParams<F> {
    type Object = ElasticNet<F>;

    /// Fit an elastic net model given a feature matrix `x` and a target
    /// variable `y`.
    ///
    /// The feature matrix `x` must have shape `(n_samples, n_features)`
    ///
    /// The target variable `y` must have shape `(n_samples)`
    ///
    /// Returns a fitted `ElasticNet` object which contains the fitted
    /// parameters and can be used to `predict` values of the target variable
    /// for new feature values.
    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        let records = dataset.records();
        let targets = dataset.targets();

        if records.nrows() != targets.len() {
            return Err(winetrack::Error::MismatchedShapes {
                expected: records.nrows(),
                actual: targets.len(),
            }
            .into());
        }
        if records.nrows() == 0 {
            return Err(ElasticNetError::NotEnoughSamples);
        }
        if records.ncols() == 0 {
            return Err(ElasticNetError::NoFeatures);
        }

        let (x_offset, x) = self.center_records(records.view());
        let (y_offset, y) = self.center_targets(targets.view());

        let mut rng = match self.selection() {
            Selection::Cyclic => None,
            Selection::Random => Some(Xoshiro256Plus::seed_from_u64(self.random_state())),
        };

        let (hyperplane, duality_gap, n_steps) = coordinate_descent(
            x.view(),
            y.view(),
            self.tolerance(),
            self.max_iterations(),
            self.l1_ratio(),
            self.penalty(),
            rng.as_mut(),
        );

        // the hyperplane was estimated on centered records, shift the intercept back
        let intercept = y_offset - x_offset.dot(&hyperplane);

        Ok(ElasticNet {
            hyperplane,
            intercept,
            duality_gap,
            n_steps,
        })
    }
}

impl<F: Float> ElasticNetValidParams<F> {
    /// Compute the column means of `x` and center it if an intercept should be used, use zeros as
    /// offset and leave `x` unchanged otherwise.
    fn center_records<'a>(&self, x: ArrayView2<'a, F>) -> (Array1<F>, CowArray<'a, F, Ix2>) {
        match x.mean_axis(Axis(0)) {
            Some(x_mean) if self.with_intercept() => {
                let x_centered = &x - &x_mean;
                (x_mean, x_centered.into())
            }
            _ => (Array1::zeros(x.ncols()), x.into()),
        }
    }

    /// Compute the intercept as the mean of `y` and center `y` if an intercept should
    /// be used, use `0.0` as intercept and leave `y` unchanged otherwise.
    fn center_targets<'a>(&self, y: ArrayView1<'a, F>) -> (F, CowArray<'a, F, Ix1>) {
        match y.mean() {
            Some(y_mean) if self.with_intercept() => {
                let y_centered = &y - y_mean;
                (y_mean, y_centered.into())
            }
            _ => (F::zero(), y.into()),
        }
    }
}

impl<F: Float, D: Data<Elem = F>> Predict<&ArrayBase<D, Ix2>, Array1<F>> for ElasticNet<F> {
    /// Given an input matrix `X`, with shape `(n_samples, n_features)`,
    /// `predict` returns the target variable according to elastic net
    /// learned from the training data distribution.
    fn predict(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        x.dot(&self.hyperplane) + self.intercept
    }
}

impl<F: Float> Predict<&Dataset<F>, Array1<F>> for ElasticNet<F> {
    fn predict(&self, dataset: &Dataset<F>) -> Array1<F> {
        self.predict(dataset.records())
    }
}

/// View the fitted parameters and make predictions with a fitted
/// elastic net model
impl<F: Float> ElasticNet<F> {
    /// Get the fitted hyperplane
    pub fn hyperplane(&self) -> &Array1<F> {
        &self.hyperplane
    }

    /// Get the fitted intercept, 0. if no intercept was fitted
    pub fn intercept(&self) -> F {
        self.intercept
    }

    /// Get the number of steps taken in optimization algorithm
    pub fn n_steps(&self) -> u32 {
        self.n_steps
    }

    /// Get the duality gap at the end of the optimization algorithm
    pub fn duality_gap(&self) -> F {
        self.duality_gap
    }
}

fn coordinate_descent<'a, F: Float>(
    x: ArrayView2<'a, F>,
    y: ArrayView1<'a, F>,
    tol: F,
    max_steps: u32,
    l1_ratio: F,
    penalty: F,
    mut rng: Option<&mut Xoshiro256Plus>,
) -> (Array1<F>, F, u32) {
    let n_samples = F::cast(x.nrows());
    let n_features = x.ncols();
    // the parameters of the model
    let mut w = Array1::<F>::zeros(n_features);
    // the residuals: `y - X*w` (since w=0, this is just `y` for now),
    // the residuals are updated during the algorithm as the parameters change
    let mut r = y.to_owned();
    let mut n_steps = 0u32;
    let norm_cols_x = x.map_axis(Axis(0), |col| col.dot(&col));
    let mut gap = F::one() + tol;
    let d_w_tol = tol;
    let tol = tol * y.dot(&y);

    while n_steps < max_steps {
        let mut w_max = F::zero();
        let mut d_w_max = F::zero();
        for f_iter in 0..n_features {
            let ii = match rng.as_mut() {
                Some(rng) => rng.gen_range(0..n_features),
                None => f_iter,
            };
            if abs_diff_eq!(norm_cols_x[ii], F::zero()) {
                continue;
            }
            let w_ii = w[ii];
            let x_slc: ArrayView1<F> = x.slice(s![.., ii]);
            if abs_diff_ne!(w_ii, F::zero()) {
                r.scaled_add(w_ii, &x_slc);
            }
            let tmp: F = x_slc.dot(&r);
            w[ii] = tmp.signum() * F::max(tmp.abs() - n_samples * l1_ratio * penalty, F::zero())
                / (norm_cols_x[ii] + n_samples * (F::one() - l1_ratio) * penalty);
            if abs_diff_ne!(w[ii], F::zero()) {
                r.scaled_add(-w[ii], &x_slc);
            }
            let d_w_ii = (w[ii] - w_ii).abs();
            d_w_max = F::max(d_w_max, d_w_ii);
            w_max = F::max(w_max, w[ii].abs());
        }
        n_steps += 1;

        if n_steps == max_steps || abs_diff_eq!(w_max, F::zero()) || d_w_max / w_max < d_w_tol {
            // We've hit one potential stopping criteria
            // check duality gap for ultimate stopping criterion
            gap = duality_gap(x.view(), y.view(), w.view(), r.view(), l1_ratio, penalty);
            if gap <= tol {
                break;
            }
        }
    }

    (w, gap, n_steps)
}

fn duality_gap<'a, F: Float>(
    x: ArrayView2<'a, F>,
    y: ArrayView1<'a, F>,
    w: ArrayView1<'a, F>,
    r: ArrayView1<'a, F>,
    l1_ratio: F,
    penalty: F,
) -> F {
    let half = F::cast(0.5);
    let n_samples = F::cast(x.nrows());
    let l1_reg = l1_ratio * penalty * n_samples;
    let l2_reg = (F::one() - l1_ratio) * penalty * n_samples;
    let xta = x.t().dot(&r) - &w * l2_reg;

    let dual_norm_xta = xta.fold(F::zero(), |abs_max, &x| abs_max.max(x.abs()));
    let r_norm2 = r.dot(&r);
    let w_norm2 = w.dot(&w);
    let (const_, mut gap) = if dual_norm_xta > l1_reg {
        let const_ = l1_reg / dual_norm_xta;
        let a_norm2 = r_norm2 * const_ * const_;
        (const_, half * (r_norm2 + a_norm2))
    } else {
        (F::one(), r_norm2)
    };
    let l1_norm = w.fold(F::zero(), |sum, w_i| sum + w_i.abs());
    gap += l1_reg * l1_norm - const_ * r.dot(&y)
        + half * l2_reg * (F::one() + const_ * const_) * w_norm2;
    gap
}

#[cfg(test)]
mod tests {
    use super::{coordinate_descent, ElasticNet};
    use crate::{ElasticNetError, Selection};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, s, Array, Array1, Array2};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    use winetrack::{
        metrics::Regression,
        traits::{Fit, Predict},
        Dataset,
    };

    fn elastic_net_objective(
        x: &Array2<f64>,
        y: &Array1<f64>,
        intercept: f64,
        beta: &Array1<f64>,
        alpha: f64,
        lambda: f64,
    ) -> f64 {
        squared_error(x, y, intercept, beta) + lambda * elastic_net_penalty(beta, alpha)
    }

    fn squared_error(x: &Array2<f64>, y: &Array1<f64>, intercept: f64, beta: &Array1<f64>) -> f64 {
        let mut resid = -x.dot(beta);
        resid -= intercept;
        resid += y;
        let mut result = 0.0;
        for r in &resid {
            result += r * r;
        }
        result /= 2.0 * y.len() as f64;
        result
    }

    fn elastic_net_penalty(beta: &Array1<f64>, alpha: f64) -> f64 {
        let mut penalty = 0.0;
        for beta_j in beta {
            penalty += (1.0 - alpha) / 2.0 * beta_j * beta_j + alpha * beta_j.abs();
        }
        penalty
    }

    #[test]
    fn elastic_net_penalty_works() {
        let beta = array![-2.0, 1.0];
        assert_abs_diff_eq!(
            elastic_net_penalty(&beta, 0.8),
            0.4 + 0.1 + 1.6 + 0.8,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(elastic_net_penalty(&beta, 1.0), 3.0);
        assert_abs_diff_eq!(elastic_net_penalty(&beta, 0.0), 2.5);
    }

    #[test]
    fn coordinate_descent_lowers_objective() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![1.0, -1.0];
        let beta = array![0.0, 0.0];
        let intercept = 0.0;
        let alpha = 0.8;
        let lambda = 0.001;
        let objective_start = elastic_net_objective(&x, &y, intercept, &beta, alpha, lambda);
        let opt_result = coordinate_descent(x.view(), y.view(), 1e-4, 3, alpha, lambda, None);
        let objective_end = elastic_net_objective(&x, &y, intercept, &opt_result.0, alpha, lambda);
        assert!(objective_start > objective_end);
    }

    #[test]
    fn lasso_zero_works() {
        let dataset = Dataset::new(array![[0.], [0.], [0.]], array![0., 0., 0.]);

        let model = ElasticNet::params()
            .l1_ratio(1.0)
            .penalty(0.1)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.intercept(), 0.);
        assert_abs_diff_eq!(model.hyperplane(), &array![0.]);
    }

    #[test]
    fn lasso_toy_example_works() {
        // Test Lasso on a toy example for various values of alpha.
        // When validating this against glmnet notice that glmnet divides it
        // against n_samples.
        let dataset = Dataset::new(array![[-1.0], [0.0], [1.0]], array![-1.0, 0.0, 1.0]);

        // input for prediction
        let t = array![[2.0], [3.0], [4.0]];
        let model = ElasticNet::lasso().penalty(1e-8).fit(&dataset).unwrap();
        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.hyperplane(), &array![1.0], epsilon = 1e-6);
        assert_abs_diff_eq!(model.predict(&t), array![2.0, 3.0, 4.0], epsilon = 1e-6);
        assert_abs_diff_eq!(model.duality_gap(), 0.0);

        let model = ElasticNet::lasso().penalty(0.1).fit(&dataset).unwrap();
        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.hyperplane(), &array![0.85], epsilon = 1e-6);
        assert_abs_diff_eq!(model.predict(&t), array![1.7, 2.55, 3.4], epsilon = 1e-6);
        assert_abs_diff_eq!(model.duality_gap(), 0.0);

        let model = ElasticNet::lasso().penalty(0.5).fit(&dataset).unwrap();
        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.hyperplane(), &array![0.25], epsilon = 1e-6);
        assert_abs_diff_eq!(model.predict(&t), array![0.5, 0.75, 1.0], epsilon = 1e-6);
        assert_abs_diff_eq!(model.duality_gap(), 0.0);

        let model = ElasticNet::lasso().penalty(1.0).fit(&dataset).unwrap();
        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.hyperplane(), &array![0.0], epsilon = 1e-6);
        assert_abs_diff_eq!(model.predict(&t), array![0.0, 0.0, 0.0], epsilon = 1e-6);
        assert_abs_diff_eq!(model.duality_gap(), 0.0);
    }

    #[test]
    fn elastic_net_toy_example_works() {
        let dataset = Dataset::new(array![[-1.0], [0.0], [1.0]], array![-1.0, 0.0, 1.0]);

        // for predictions
        let t = array![[2.0], [3.0], [4.0]];
        let model = ElasticNet::params()
            .l1_ratio(0.3)
            .penalty(0.5)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.hyperplane(), &array![0.50819], epsilon = 1e-3);
        assert_abs_diff_eq!(
            model.predict(&t),
            array![1.0163, 1.5245, 2.0327],
            epsilon = 1e-3
        );
        assert_abs_diff_eq!(model.duality_gap(), 0.0);

        let model = ElasticNet::params()
            .l1_ratio(0.5)
            .penalty(0.5)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.hyperplane(), &array![0.45454], epsilon = 1e-3);
        assert_abs_diff_eq!(
            model.predict(&t),
            array![0.9090, 1.3636, 1.8181],
            epsilon = 1e-3
        );
        assert_abs_diff_eq!(model.duality_gap(), 0.0);
    }

    #[test]
    fn intercept_is_shifted_back() {
        // y = 2 * x + 10 on records far away from the origin
        let dataset = Dataset::new(
            array![[100.0], [101.0], [102.0], [103.0]],
            array![210.0, 212.0, 214.0, 216.0],
        );

        let model = ElasticNet::params()
            .penalty(0.0)
            .tolerance(1e-12)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.hyperplane(), &array![2.0], epsilon = 1e-8);
        assert_abs_diff_eq!(model.intercept(), 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(
            model.predict(&dataset),
            dataset.targets().clone(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn without_intercept() {
        let dataset = Dataset::new(array![[1.0], [2.0], [3.0]], array![2.0, 4.0, 6.0]);

        let model = ElasticNet::params()
            .penalty(0.0)
            .with_intercept(false)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.hyperplane(), &array![2.0], epsilon = 1e-6);
    }

    #[test]
    fn ordinary_least_squares_on_linear_data() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);

        let w = array![1.5, -2.0, 0.5, 3.0];
        let x = Array::random_using((60, 4), Uniform::new(-1., 1.), &mut rng);
        let y = x.dot(&w) + 4.0;
        let dataset = Dataset::new(x, y);

        let model = ElasticNet::params()
            .penalty(0.0)
            .l1_ratio(0.0)
            .tolerance(1e-12)
            .max_iterations(10_000)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.hyperplane(), &w, epsilon = 1e-5);
        assert_abs_diff_eq!(model.intercept(), 4.0, epsilon = 1e-5);

        let r2 = model.predict(&dataset).r2(dataset.targets()).unwrap();
        assert_abs_diff_eq!(r2, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn random_selection_finds_same_solution() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);

        let w = array![1.0, 0.0, -1.0, 2.0, 0.0];
        let x = Array::random_using((80, 5), Uniform::new(-1., 1.), &mut rng);
        let y = x.dot(&w);
        let dataset = Dataset::new(x, y);

        let cyclic = ElasticNet::params()
            .penalty(0.05)
            .tolerance(1e-10)
            .fit(&dataset)
            .unwrap();
        let random = ElasticNet::params()
            .penalty(0.05)
            .tolerance(1e-10)
            .selection(Selection::Random)
            .random_state(42)
            .fit(&dataset)
            .unwrap();
        let random_again = ElasticNet::params()
            .penalty(0.05)
            .tolerance(1e-10)
            .selection(Selection::Random)
            .random_state(42)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(cyclic.hyperplane(), random.hyperplane(), epsilon = 1e-4);
        assert_eq!(random, random_again);
    }

    #[test]
    fn invalid_inputs() {
        let empty = Dataset::new(Array2::<f64>::zeros((0, 3)), Array1::zeros(0));
        assert_eq!(
            ElasticNet::params().fit(&empty).unwrap_err(),
            ElasticNetError::NotEnoughSamples
        );

        let mismatched = Dataset::new(array![[1.0], [2.0]], array![1.0]);
        assert_eq!(
            ElasticNet::params().fit(&mismatched).unwrap_err(),
            ElasticNetError::BaseCrate(winetrack::Error::MismatchedShapes {
                expected: 2,
                actual: 1
            })
        );

        assert_eq!(
            ElasticNet::params()
                .penalty(-1.0)
                .fit(&Dataset::new(array![[1.0]], array![1.0]))
                .unwrap_err(),
            ElasticNetError::InvalidPenalty(-1.0)
        );
    }

    #[test]
    fn select_subset() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);

        // check that we are selecting the subsect of informative features
        let mut w = Array::random_using(50, Uniform::new(1f64, 2.), &mut rng);
        w.slice_mut(s![10..]).fill(0.0);

        let x = Array::random_using((200, 50), Uniform::new(-1., 1.), &mut rng);
        let y = x.dot(&w);
        let train = Dataset::new(x, y);

        let model = ElasticNet::lasso()
            .penalty(0.1)
            .max_iterations(1000)
            .tolerance(1e-10)
            .fit(&train)
            .unwrap();

        // check that we set the last 40 parameters to zero
        let num_zeros = model
            .hyperplane()
            .iter()
            .filter(|x: &&f64| x.abs() < 1e-5)
            .count();
        assert_eq!(num_zeros, 40);

        // predict a small testing dataset
        let x = Array::random_using((100, 50), Uniform::new(-1., 1.), &mut rng);
        let y = x.dot(&w);

        let predicted = model.predict(&x);
        let mse = predicted.mean_squared_error(&y).unwrap();
        assert!(mse < 0.67);
    }

    #[test]
    fn gap_of_last_sweep_is_reported() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let x = Array::random_using((40, 6), Uniform::new(-1f64, 1.), &mut rng);
        let y = x.dot(&array![1.0, -2.0, 0.5, 0.0, 3.0, -1.0]);
        let train = Dataset::new(x, y);

        let stopped = ElasticNet::params()
            .penalty(0.01)
            .tolerance(0.0)
            .max_iterations(1)
            .fit(&train)
            .unwrap();
        assert_eq!(stopped.n_steps(), 1);
        assert!(stopped.duality_gap().is_finite());
        assert!(stopped.duality_gap() > 0.0);

        let longer = ElasticNet::params()
            .penalty(0.01)
            .tolerance(0.0)
            .max_iterations(50)
            .fit(&train)
            .unwrap();
        assert_eq!(longer.n_steps(), 50);
        assert!(longer.duality_gap() < stopped.duality_gap());
    }
}
