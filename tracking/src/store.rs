use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{LoggingError, Result};

/// Lifecycle state of a run
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Scheduled,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    /// Numeric code used in `meta.yaml` files
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Running => 1,
            RunStatus::Scheduled => 2,
            RunStatus::Finished => 3,
            RunStatus::Failed => 4,
            RunStatus::Killed => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<RunStatus> {
        match code {
            1 => Some(RunStatus::Running),
            2 => Some(RunStatus::Scheduled),
            3 => Some(RunStatus::Finished),
            4 => Some(RunStatus::Failed),
            5 => Some(RunStatus::Killed),
            _ => None,
        }
    }

    pub fn is_terminated(self) -> bool {
        matches!(
            self,
            RunStatus::Finished | RunStatus::Failed | RunStatus::Killed
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Scheduled => "SCHEDULED",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        };
        f.write_str(name)
    }
}

impl FromStr for RunStatus {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(RunStatus::Running),
            "SCHEDULED" => Ok(RunStatus::Scheduled),
            "FINISHED" => Ok(RunStatus::Finished),
            "FAILED" => Ok(RunStatus::Failed),
            "KILLED" => Ok(RunStatus::Killed),
            _ => Err(LoggingError::Api {
                code: "INVALID_PARAMETER_VALUE".to_string(),
                message: format!("unknown run status {}", s),
            }),
        }
    }
}

/// Client side view of a run record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    #[serde(default)]
    pub run_name: Option<String>,
    pub artifact_uri: String,
    pub status: RunStatus,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
}

/// A single metric observation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    pub timestamp: i64,
    pub step: i64,
}

/// A version of a registered model
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelVersion {
    pub name: String,
    pub version: u32,
    pub source: String,
    pub run_id: String,
}

/// The logging contract of a tracking service
///
/// A store owns experiments, runs with their parameters, metrics, tags and artifacts, and the
/// model registry. Implementations use interior mutability so a run guard can hold a shared
/// reference to the store.
pub trait TrackingStore {
    /// Look up an experiment by name, create it when missing and return its id
    fn get_or_create_experiment(&self, name: &str) -> Result<String>;

    /// Open a new run in state `RUNNING`
    fn create_run(
        &self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
    ) -> Result<RunInfo>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()>;

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Store `contents` under `path`, relative to the artifact root of `run`
    fn log_artifact(&self, run: &RunInfo, path: &str, contents: &[u8]) -> Result<()>;

    fn update_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()>;

    /// Add a new version to the registered model `name`, creating the model when missing
    fn register_model_version(&self, name: &str, source: &str, run_id: &str)
        -> Result<ModelVersion>;
}

impl<T: TrackingStore + ?Sized> TrackingStore for Box<T> {
    fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        (**self).get_or_create_experiment(name)
    }

    fn create_run(
        &self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
    ) -> Result<RunInfo> {
        (**self).create_run(experiment_id, run_name, start_time)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        (**self).log_param(run_id, key, value)
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()> {
        (**self).log_metric(run_id, metric)
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        (**self).set_tag(run_id, key, value)
    }

    fn log_artifact(&self, run: &RunInfo, path: &str, contents: &[u8]) -> Result<()> {
        (**self).log_artifact(run, path, contents)
    }

    fn update_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        (**self).update_run(run_id, status, end_time)
    }

    fn register_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion> {
        (**self).register_model_version(name, source, run_id)
    }
}

/// Current timestamp in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Fresh run or model id, 32 lowercase hex digits
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
