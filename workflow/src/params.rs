use std::fs::File;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use winetrack::ParamGuard;

/// Invalid workflow settings
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("alpha should be non-negative, but is {0}")]
    InvalidAlpha(f64),
    #[error("l1 ratio should be in range [0, 1], but is {0}")]
    InvalidL1Ratio(f64),
    #[error("train fraction should be in range (0, 1), but is {0}")]
    InvalidTrainFraction(f64),
    #[error("{0} must not be empty")]
    EmptyName(&'static str),
}

/// A verified set of workflow settings
///
/// See [`WorkflowParams`] for the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowValidParams {
    data_source: String,
    alpha: f64,
    l1_ratio: f64,
    split_seed: u64,
    fit_seed: u64,
    train_fraction: f64,
    tolerance: f64,
    max_iterations: u32,
    experiment_name: String,
    run_name: Option<String>,
    artifact_path: String,
    registered_model_name: String,
}

impl WorkflowValidParams {
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn l1_ratio(&self) -> f64 {
        self.l1_ratio
    }

    pub fn split_seed(&self) -> u64 {
        self.split_seed
    }

    pub fn fit_seed(&self) -> u64 {
        self.fit_seed
    }

    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    pub fn run_name(&self) -> Option<&str> {
        self.run_name.as_deref()
    }

    pub fn artifact_path(&self) -> &str {
        &self.artifact_path
    }

    pub fn registered_model_name(&self) -> &str {
        &self.registered_model_name
    }
}

/// Settings of a training run
///
/// # Parameters
/// | Name | Default | Purpose |
/// | :--- | :--- | :--- |
/// | [data_source](Self::data_source) | [`WINEQUALITY_RED_URL`](winetrack_datasets::WINEQUALITY_RED_URL) | URL or path of the `;` separated CSV |
/// | [alpha](Self::alpha) | `0.5` | Overall penalty of the ElasticNet |
/// | [l1_ratio](Self::l1_ratio) | `0.5` | Share of the L1 penalty |
/// | [split_seed](Self::split_seed) | `40` | Seed of the train/test shuffle |
/// | [fit_seed](Self::fit_seed) | `42` | Seed of the estimator |
/// | [train_fraction](Self::train_fraction) | `0.75` | Share of rows used for training |
/// | [tolerance](Self::tolerance) | `1e-4` | Convergence tolerance of the ElasticNet |
/// | [max_iterations](Self::max_iterations) | `1000` | Iteration limit of the ElasticNet |
/// | [experiment_name](Self::experiment_name) | `Default` | Experiment the run is recorded in |
/// | [run_name](Self::run_name) | none | Display name of the run |
/// | [artifact_path](Self::artifact_path) | `model` | Artifact directory of the model |
/// | [registered_model_name](Self::registered_model_name) | `ElasticnetWineModel` | Registry entry of the model |
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowParams(WorkflowValidParams);

impl Default for WorkflowParams {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowParams {
    pub fn new() -> Self {
        WorkflowParams(WorkflowValidParams {
            data_source: winetrack_datasets::WINEQUALITY_RED_URL.to_string(),
            alpha: 0.5,
            l1_ratio: 0.5,
            split_seed: 40,
            fit_seed: 42,
            train_fraction: 0.75,
            tolerance: 1e-4,
            max_iterations: 1000,
            experiment_name: "Default".to_string(),
            run_name: None,
            artifact_path: "model".to_string(),
            registered_model_name: "ElasticnetWineModel".to_string(),
        })
    }

    pub fn data_source<S: Into<String>>(mut self, data_source: S) -> Self {
        self.0.data_source = data_source.into();
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.0.alpha = alpha;
        self
    }

    pub fn l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.0.l1_ratio = l1_ratio;
        self
    }

    pub fn split_seed(mut self, split_seed: u64) -> Self {
        self.0.split_seed = split_seed;
        self
    }

    pub fn fit_seed(mut self, fit_seed: u64) -> Self {
        self.0.fit_seed = fit_seed;
        self
    }

    pub fn train_fraction(mut self, train_fraction: f64) -> Self {
        self.0.train_fraction = train_fraction;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.0.max_iterations = max_iterations;
        self
    }

    pub fn experiment_name<S: Into<String>>(mut self, experiment_name: S) -> Self {
        self.0.experiment_name = experiment_name.into();
        self
    }

    pub fn run_name<S: Into<String>>(mut self, run_name: Option<S>) -> Self {
        self.0.run_name = run_name.map(Into::into);
        self
    }

    pub fn artifact_path<S: Into<String>>(mut self, artifact_path: S) -> Self {
        self.0.artifact_path = artifact_path.into();
        self
    }

    pub fn registered_model_name<S: Into<String>>(mut self, name: S) -> Self {
        self.0.registered_model_name = name.into();
        self
    }
}

impl ParamGuard for WorkflowParams {
    type Checked = WorkflowValidParams;
    type Error = ParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, ParamsError> {
        let p = &self.0;
        if p.alpha.is_nan() || p.alpha < 0.0 {
            Err(ParamsError::InvalidAlpha(p.alpha))
        } else if !(0.0..=1.0).contains(&p.l1_ratio) {
            Err(ParamsError::InvalidL1Ratio(p.l1_ratio))
        } else if !(p.train_fraction > 0.0 && p.train_fraction < 1.0) {
            Err(ParamsError::InvalidTrainFraction(p.train_fraction))
        } else if p.data_source.trim().is_empty() {
            Err(ParamsError::EmptyName("data source"))
        } else if p.experiment_name.trim().is_empty() {
            Err(ParamsError::EmptyName("experiment name"))
        } else if p.artifact_path.trim_matches('/').is_empty() {
            Err(ParamsError::EmptyName("artifact path"))
        } else if p.registered_model_name.trim().is_empty() {
            Err(ParamsError::EmptyName("registered model name"))
        } else {
            Ok(p)
        }
    }

    fn check(self) -> Result<Self::Checked, ParamsError> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Settings read from a YAML file or the command line, omitted fields keep their defaults
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub data_source: Option<String>,
    pub alpha: Option<f64>,
    pub l1_ratio: Option<f64>,
    pub split_seed: Option<u64>,
    pub fit_seed: Option<u64>,
    pub train_fraction: Option<f64>,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<u32>,
    pub tracking_uri: Option<String>,
    pub experiment_name: Option<String>,
    pub run_name: Option<String>,
    pub artifact_path: Option<String>,
    pub registered_model_name: Option<String>,
}

impl ConfigFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Merge two configs, values of `other` win
    pub fn merge(self, other: Self) -> Self {
        Self {
            data_source: other.data_source.or(self.data_source),
            alpha: other.alpha.or(self.alpha),
            l1_ratio: other.l1_ratio.or(self.l1_ratio),
            split_seed: other.split_seed.or(self.split_seed),
            fit_seed: other.fit_seed.or(self.fit_seed),
            train_fraction: other.train_fraction.or(self.train_fraction),
            tolerance: other.tolerance.or(self.tolerance),
            max_iterations: other.max_iterations.or(self.max_iterations),
            tracking_uri: other.tracking_uri.or(self.tracking_uri),
            experiment_name: other.experiment_name.or(self.experiment_name),
            run_name: other.run_name.or(self.run_name),
            artifact_path: other.artifact_path.or(self.artifact_path),
            registered_model_name: other.registered_model_name.or(self.registered_model_name),
        }
    }

    /// Override the values of `params` that are set in this config
    pub fn apply(&self, mut params: WorkflowParams) -> WorkflowParams {
        if let Some(data_source) = &self.data_source {
            params = params.data_source(data_source.as_str());
        }
        if let Some(alpha) = self.alpha {
            params = params.alpha(alpha);
        }
        if let Some(l1_ratio) = self.l1_ratio {
            params = params.l1_ratio(l1_ratio);
        }
        if let Some(split_seed) = self.split_seed {
            params = params.split_seed(split_seed);
        }
        if let Some(fit_seed) = self.fit_seed {
            params = params.fit_seed(fit_seed);
        }
        if let Some(train_fraction) = self.train_fraction {
            params = params.train_fraction(train_fraction);
        }
        if let Some(tolerance) = self.tolerance {
            params = params.tolerance(tolerance);
        }
        if let Some(max_iterations) = self.max_iterations {
            params = params.max_iterations(max_iterations);
        }
        if let Some(experiment_name) = &self.experiment_name {
            params = params.experiment_name(experiment_name.as_str());
        }
        if self.run_name.is_some() {
            params = params.run_name(self.run_name.as_deref());
        }
        if let Some(artifact_path) = &self.artifact_path {
            params = params.artifact_path(artifact_path.as_str());
        }
        if let Some(name) = &self.registered_model_name {
            params = params.registered_model_name(name.as_str());
        }
        params
    }
}
