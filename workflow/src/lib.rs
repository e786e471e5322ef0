//! Train an ElasticNet on the red wine quality data and record the run in a tracking service.
//!
//! [`run_training`] loads the dataset, splits it into a training and a test part, fits the
//! model, prints the scores and finally logs parameters, metrics and the model. The model is
//! registered under `ElasticnetWineModel` unless configured otherwise.
//!
//! ```no_run
//! use winetrack::ParamGuard;
//! use winetrack_tracking::MemoryStore;
//! use winetrack_workflow::{run_training, TracingDiagnostics, WorkflowParams};
//!
//! let params = WorkflowParams::new().alpha(0.3).check()?;
//! let store = MemoryStore::new();
//! let summary = run_training(&params, &store, &TracingDiagnostics, &mut std::io::stdout())?;
//! println!("logged run {}", summary.run.run_id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::io::Write;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use thiserror::Error;

use winetrack::metrics::{eval_metrics, EvalMetrics};
use winetrack::traits::{Fit, Predict};
use winetrack_datasets::DataLoadError;
use winetrack_elasticnet::{ElasticNet, ElasticNetError};
use winetrack_tracking::{LoggingError, ModelVersion, RunInfo, Session, TrackingStore};

mod diagnostics;
mod params;

pub use diagnostics::{CapturedDiagnostics, Diagnostics, TracingDiagnostics};
pub use params::{ConfigFile, ParamsError, WorkflowParams, WorkflowValidParams};

/// Failures of a training run
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("unable to load the training data: {0}")]
    DataLoad(#[from] DataLoadError),
    #[error("unable to fit the model: {0}")]
    Fit(#[from] ElasticNetError),
    #[error("unable to log the run: {0}")]
    Logging(#[from] LoggingError),
    #[error("unable to write the summary: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Outcome of a successful training run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub metrics: EvalMetrics<f64>,
    pub model: ElasticNet<f64>,
    pub run: RunInfo,
    pub model_version: Option<ModelVersion>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Scores {
            alpha: self.alpha,
            l1_ratio: self.l1_ratio,
            metrics: &self.metrics,
        }
        .fmt(f)
    }
}

struct Scores<'a> {
    alpha: f64,
    l1_ratio: f64,
    metrics: &'a EvalMetrics<f64>,
}

impl<'a> fmt::Display for Scores<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Elasticnet model (alpha={:.6}, l1_ratio={:.6}):",
            self.alpha, self.l1_ratio
        )?;
        writeln!(f, "  RMSE: {:.6}", self.metrics.rmse)?;
        writeln!(f, "  MAE: {:.6}", self.metrics.mae)?;
        write!(f, "  R2: {:.6}", self.metrics.r2)
    }
}

/// Train, evaluate and log a single ElasticNet model
///
/// A dataset which cannot be loaded is reported as a warning and ends the run with
/// [`WorkflowError::DataLoad`] before anything is fitted or logged. The human-readable summary
/// goes to `out`. Once the run is opened in `store` it is closed on every path, as `FINISHED`
/// on success and as `FAILED` when a later tracking call fails.
pub fn run_training(
    params: &WorkflowValidParams,
    store: &dyn TrackingStore,
    diagnostics: &dyn Diagnostics,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let dataset = match winetrack_datasets::winequality(params.data_source()) {
        Ok(dataset) => dataset,
        Err(err) => {
            diagnostics.warn(&format!(
                "Unable to download training & test CSV, check your internet connection. Error: {}",
                err
            ));
            return Err(err.into());
        }
    };
    diagnostics.info(&format!(
        "loaded {} samples with {} features from {}",
        dataset.nsamples(),
        dataset.nfeatures(),
        params.data_source()
    ));

    let mut rng = Xoshiro256Plus::seed_from_u64(params.split_seed());
    let (train, test) = dataset
        .shuffle(&mut rng)
        .split_with_ratio(params.train_fraction());

    let model = ElasticNet::params()
        .penalty(params.alpha())
        .l1_ratio(params.l1_ratio())
        .tolerance(params.tolerance())
        .max_iterations(params.max_iterations())
        .random_state(params.fit_seed())
        .fit(&train)
        .map_err(WorkflowError::Fit)?;
    diagnostics.info(&format!(
        "fitted ElasticNet on {} samples in {} steps",
        train.nsamples(),
        model.n_steps()
    ));

    let predicted = model.predict(&test);
    let metrics =
        eval_metrics(test.targets(), &predicted).map_err(ElasticNetError::BaseCrate)?;

    let scores = Scores {
        alpha: params.alpha(),
        l1_ratio: params.l1_ratio(),
        metrics: &metrics,
    };
    writeln!(out, "{}", scores)?;

    let run = Session::start(store, params.experiment_name(), params.run_name())?;
    run.log_param("alpha", params.alpha())?;
    run.log_param("l1_ratio", params.l1_ratio())?;
    run.log_metric("rmse", metrics.rmse)?;
    run.log_metric("r2", metrics.r2)?;
    run.log_metric("mae", metrics.mae)?;
    let model_version = run.log_model(
        &model,
        params.artifact_path(),
        Some(params.registered_model_name()),
    )?;
    let info = run.end()?;
    diagnostics.info(&format!("finished run {}", info.run_id));

    Ok(RunSummary {
        alpha: params.alpha(),
        l1_ratio: params.l1_ratio(),
        n_train: train.nsamples(),
        n_test: test.nsamples(),
        metrics,
        model,
        run: info,
        model_version,
    })
}
