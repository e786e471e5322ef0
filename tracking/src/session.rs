use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;

use crate::error::Result;
use crate::store::{new_id, now_ms, Metric, ModelVersion, RunInfo, RunStatus, TrackingStore};

/// Name of the serialized model inside the model directory
pub const MODEL_DATA_FILE: &str = "model.json";
/// Name of the model descriptor inside the model directory
pub const MLMODEL_FILE: &str = "MLmodel";

#[derive(Serialize, Debug, PartialEq)]
struct Flavor {
    code: Option<String>,
    data: String,
    serialization_format: String,
    winetrack_version: String,
}

/// Descriptor written next to a logged model
#[derive(Serialize, Debug, PartialEq)]
struct MlModel {
    artifact_path: String,
    flavors: BTreeMap<String, Flavor>,
    model_uuid: String,
    run_id: String,
    utc_time_created: String,
}

impl MlModel {
    fn new(run_id: &str, artifact_path: &str) -> Self {
        let mut flavors = BTreeMap::new();
        flavors.insert(
            "winetrack".to_string(),
            Flavor {
                code: None,
                data: MODEL_DATA_FILE.to_string(),
                serialization_format: "json".to_string(),
                winetrack_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        );

        MlModel {
            artifact_path: artifact_path.to_string(),
            flavors,
            model_uuid: new_id(),
            run_id: run_id.to_string(),
            utc_time_created: chrono::Utc::now()
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
        }
    }
}

/// An experiment of a tracking store, runs are started from here
pub struct Session<'s> {
    store: &'s dyn TrackingStore,
    experiment_id: String,
}

impl<'s> Session<'s> {
    /// Attach to `experiment`, creating it when missing
    pub fn open(store: &'s dyn TrackingStore, experiment: &str) -> Result<Session<'s>> {
        let experiment_id = store.get_or_create_experiment(experiment)?;
        Ok(Session {
            store,
            experiment_id,
        })
    }

    /// Open `experiment` and start a single run in it
    pub fn start(
        store: &'s dyn TrackingStore,
        experiment: &str,
        run_name: Option<&str>,
    ) -> Result<ActiveRun<'s>> {
        Session::open(store, experiment)?.start_run(run_name)
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    pub fn start_run(&self, run_name: Option<&str>) -> Result<ActiveRun<'s>> {
        let info = self
            .store
            .create_run(&self.experiment_id, run_name, now_ms())?;
        tracing::info!(run_id = %info.run_id, experiment_id = %self.experiment_id, "started run");

        Ok(ActiveRun {
            store: self.store,
            info,
            ended: false,
        })
    }
}

/// A run in state `RUNNING`
///
/// The run is closed on every path: [`end`](ActiveRun::end) marks it `FINISHED`, dropping the
/// guard without ending it marks it `FAILED`.
pub struct ActiveRun<'s> {
    store: &'s dyn TrackingStore,
    info: RunInfo,
    ended: bool,
}

impl<'s> ActiveRun<'s> {
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn run_id(&self) -> &str {
        &self.info.run_id
    }

    pub fn log_param<V: Display>(&self, key: &str, value: V) -> Result<()> {
        self.store
            .log_param(&self.info.run_id, key, &value.to_string())
    }

    pub fn log_metric(&self, key: &str, value: f64) -> Result<()> {
        self.log_metric_step(key, value, 0)
    }

    pub fn log_metric_step(&self, key: &str, value: f64, step: i64) -> Result<()> {
        let metric = Metric {
            key: key.to_string(),
            value,
            timestamp: now_ms(),
            step,
        };
        self.store.log_metric(&self.info.run_id, &metric)
    }

    pub fn set_tag<V: Display>(&self, key: &str, value: V) -> Result<()> {
        self.store
            .set_tag(&self.info.run_id, key, &value.to_string())
    }

    pub fn log_artifact(&self, path: &str, contents: &[u8]) -> Result<()> {
        self.store.log_artifact(&self.info, path, contents)
    }

    /// Log a serializable model under `artifact_path` and optionally register it
    ///
    /// Writes `<artifact_path>/model.json` and the `<artifact_path>/MLmodel` descriptor. With a
    /// `registered_model_name` a new version pointing at `runs:/<run id>/<artifact_path>` is
    /// added to the registry and returned.
    pub fn log_model<M: Serialize>(
        &self,
        model: &M,
        artifact_path: &str,
        registered_model_name: Option<&str>,
    ) -> Result<Option<ModelVersion>> {
        let artifact_path = artifact_path.trim_matches('/');

        let data = serde_json::to_vec_pretty(model)?;
        self.log_artifact(&format!("{}/{}", artifact_path, MODEL_DATA_FILE), &data)?;

        let mlmodel = serde_yaml::to_string(&MlModel::new(&self.info.run_id, artifact_path))?;
        self.log_artifact(
            &format!("{}/{}", artifact_path, MLMODEL_FILE),
            mlmodel.as_bytes(),
        )?;

        let name = match registered_model_name {
            Some(name) => name,
            None => return Ok(None),
        };

        let source = format!("runs:/{}/{}", self.info.run_id, artifact_path);
        let version = self
            .store
            .register_model_version(name, &source, &self.info.run_id)?;
        tracing::info!(model = name, version = version.version, "registered model version");

        Ok(Some(version))
    }

    /// Mark the run `FINISHED`
    pub fn end(self) -> Result<RunInfo> {
        self.terminate(RunStatus::Finished)
    }

    /// Close the run with an explicit terminal status
    pub fn terminate(mut self, status: RunStatus) -> Result<RunInfo> {
        self.ended = true;
        let end_time = now_ms();
        self.store.update_run(&self.info.run_id, status, end_time)?;

        let mut info = self.info.clone();
        info.status = status;
        info.end_time = Some(end_time);

        Ok(info)
    }
}

impl<'s> Drop for ActiveRun<'s> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }

        if let Err(err) = self
            .store
            .update_run(&self.info.run_id, RunStatus::Failed, now_ms())
        {
            tracing::warn!(run_id = %self.info.run_id, "could not mark run as failed: {}", err);
        }
    }
}
