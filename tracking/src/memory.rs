use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{LoggingError, Result};
use crate::store::{new_id, Metric, ModelVersion, RunInfo, RunStatus, TrackingStore};

/// Everything recorded for a single run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub info: RunInfo,
    pub params: Vec<(String, String)>,
    pub metrics: Vec<Metric>,
    pub tags: BTreeMap<String, String>,
    pub artifacts: BTreeMap<String, Vec<u8>>,
}

impl RunRecord {
    /// Values logged for parameter `key`, in logging order
    pub fn param_values(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Values logged for metric `key`, in logging order
    pub fn metric_values(&self, key: &str) -> Vec<f64> {
        self.metrics
            .iter()
            .filter(|m| m.key == key)
            .map(|m| m.value)
            .collect()
    }
}

#[derive(Debug, Default)]
struct State {
    experiments: Vec<String>,
    runs: Vec<RunRecord>,
    models: BTreeMap<String, Vec<ModelVersion>>,
}

impl State {
    fn run_mut(&mut self, run_id: &str) -> Result<&mut RunRecord> {
        self.runs
            .iter_mut()
            .find(|run| run.info.run_id == run_id)
            .ok_or_else(|| LoggingError::UnknownRun(run_id.to_string()))
    }
}

/// In-process tracking store
///
/// Keeps all records in memory, used for dry runs and tests. The experiment `Default` always
/// exists with id `0`.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            state: Mutex::new(State {
                experiments: vec!["Default".to_string()],
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all runs, in creation order
    pub fn runs(&self) -> Vec<RunRecord> {
        self.state().runs.clone()
    }

    pub fn run(&self, run_id: &str) -> Option<RunRecord> {
        self.state()
            .runs
            .iter()
            .find(|run| run.info.run_id == run_id)
            .cloned()
    }

    /// Versions of the registered model `name`, oldest first
    pub fn model_versions(&self, name: &str) -> Vec<ModelVersion> {
        self.state().models.get(name).cloned().unwrap_or_default()
    }

    pub fn experiment_id(&self, name: &str) -> Option<String> {
        self.state()
            .experiments
            .iter()
            .position(|e| e == name)
            .map(|idx| idx.to_string())
    }
}

impl TrackingStore for MemoryStore {
    fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        let mut state = self.state();
        let idx = match state.experiments.iter().position(|e| e == name) {
            Some(idx) => idx,
            None => {
                state.experiments.push(name.to_string());
                state.experiments.len() - 1
            }
        };

        Ok(idx.to_string())
    }

    fn create_run(
        &self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
    ) -> Result<RunInfo> {
        let mut state = self.state();
        let known = experiment_id
            .parse::<usize>()
            .map_or(false, |idx| idx < state.experiments.len());
        if !known {
            return Err(LoggingError::Api {
                code: "RESOURCE_DOES_NOT_EXIST".to_string(),
                message: format!("no experiment with id {}", experiment_id),
            });
        }

        let run_id = new_id();
        let info = RunInfo {
            artifact_uri: format!("memory:/{}/{}/artifacts", experiment_id, run_id),
            run_id,
            experiment_id: experiment_id.to_string(),
            run_name: run_name.map(String::from),
            status: RunStatus::Running,
            start_time,
            end_time: None,
        };

        state.runs.push(RunRecord {
            info: info.clone(),
            params: Vec::new(),
            metrics: Vec::new(),
            tags: BTreeMap::new(),
            artifacts: BTreeMap::new(),
        });

        Ok(info)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.state();
        let run = state.run_mut(run_id)?;
        if let Some((_, old)) = run.params.iter().find(|(k, _)| k == key) {
            if old != value {
                return Err(LoggingError::Api {
                    code: "INVALID_PARAMETER_VALUE".to_string(),
                    message: format!("parameter {} was already logged with value {}", key, old),
                });
            }
            return Ok(());
        }
        run.params.push((key.to_string(), value.to_string()));

        Ok(())
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()> {
        self.state().run_mut(run_id)?.metrics.push(metric.clone());
        Ok(())
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.state()
            .run_mut(run_id)?
            .tags
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn log_artifact(&self, run: &RunInfo, path: &str, contents: &[u8]) -> Result<()> {
        self.state()
            .run_mut(&run.run_id)?
            .artifacts
            .insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    fn update_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        let mut state = self.state();
        let run = state.run_mut(run_id)?;
        run.info.status = status;
        if status.is_terminated() {
            run.info.end_time = Some(end_time);
        }
        Ok(())
    }

    fn register_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion> {
        let mut state = self.state();
        state.run_mut(run_id)?;

        let versions = state.models.entry(name.to_string()).or_default();
        let version = ModelVersion {
            name: name.to_string(),
            version: versions.len() as u32 + 1,
            source: source.to_string(),
            run_id: run_id.to_string(),
        };
        versions.push(version.clone());

        Ok(version)
    }
}
