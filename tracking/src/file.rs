use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{LoggingError, Result};
use crate::store::{new_id, now_ms, Metric, ModelVersion, RunInfo, RunStatus, TrackingStore};

const DEFAULT_EXPERIMENT_ID: &str = "0";
const MODELS_DIR: &str = "models";

#[derive(Serialize, Deserialize, Debug)]
struct ExperimentMeta {
    artifact_location: String,
    creation_time: i64,
    experiment_id: String,
    last_update_time: i64,
    lifecycle_stage: String,
    name: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct RunMeta {
    artifact_uri: String,
    end_time: Option<i64>,
    experiment_id: String,
    lifecycle_stage: String,
    run_id: String,
    run_name: Option<String>,
    run_uuid: String,
    start_time: i64,
    status: i32,
}

impl RunMeta {
    fn info(&self) -> Result<RunInfo> {
        let status = RunStatus::from_code(self.status)
            .ok_or_else(|| LoggingError::UnknownRun(self.run_id.clone()))?;

        Ok(RunInfo {
            run_id: self.run_id.clone(),
            experiment_id: self.experiment_id.clone(),
            run_name: self.run_name.clone(),
            artifact_uri: self.artifact_uri.clone(),
            status,
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct RegisteredModelMeta {
    name: String,
    creation_timestamp: i64,
    last_updated_timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug)]
struct ModelVersionMeta {
    name: String,
    version: u32,
    source: String,
    run_id: String,
    creation_timestamp: i64,
    current_stage: String,
    status: String,
}

/// Tracking store writing the `mlruns` directory layout
///
/// ```text
/// <root>/<experiment id>/meta.yaml
/// <root>/<experiment id>/<run id>/meta.yaml
/// <root>/<experiment id>/<run id>/{params,metrics,tags,artifacts}/...
/// <root>/models/<name>/version-<n>/meta.yaml
/// ```
///
/// Parameters and tags are stored one file per key, metrics one line `timestamp value step` per
/// observation.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store at `root`, creating the directory and the `Default` experiment when
    /// missing
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let store = FileStore {
            root: fs::canonicalize(root)?,
        };

        if !store.root.join(DEFAULT_EXPERIMENT_ID).join("meta.yaml").exists() {
            store.write_experiment(DEFAULT_EXPERIMENT_ID, "Default")?;
        }

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_experiment(&self, experiment_id: &str, name: &str) -> Result<()> {
        let dir = self.root.join(experiment_id);
        fs::create_dir_all(&dir)?;

        let now = now_ms();
        write_yaml(
            &dir.join("meta.yaml"),
            &ExperimentMeta {
                artifact_location: file_uri(&dir),
                creation_time: now,
                experiment_id: experiment_id.to_string(),
                last_update_time: now,
                lifecycle_stage: "active".to_string(),
                name: name.to_string(),
            },
        )
    }

    fn experiments(&self) -> Result<Vec<ExperimentMeta>> {
        let mut experiments = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let meta = entry?.path().join("meta.yaml");
            if meta.is_file() {
                experiments.push(read_yaml(&meta)?);
            }
        }

        Ok(experiments)
    }

    fn run_dir(&self, run_id: &str) -> Result<PathBuf> {
        if run_id.is_empty() || !run_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(LoggingError::UnknownRun(run_id.to_string()));
        }
        for entry in fs::read_dir(&self.root)? {
            let dir = entry?.path().join(run_id);
            if dir.join("meta.yaml").is_file() {
                return Ok(dir);
            }
        }

        Err(LoggingError::UnknownRun(run_id.to_string()))
    }

    /// Read back the record of a run
    pub fn run_info(&self, run_id: &str) -> Result<RunInfo> {
        let meta: RunMeta = read_yaml(&self.run_dir(run_id)?.join("meta.yaml"))?;
        meta.info()
    }

    /// Parameter `key` of a run, `None` when it was never logged
    pub fn param(&self, run_id: &str, key: &str) -> Result<Option<String>> {
        validate_key("parameter", key)?;
        let path = self.run_dir(run_id)?.join("params").join(key);
        if !path.is_file() {
            return Ok(None);
        }

        Ok(Some(fs::read_to_string(path)?))
    }

    /// All observations of metric `key` of a run, oldest first
    pub fn metric_history(&self, run_id: &str, key: &str) -> Result<Vec<Metric>> {
        validate_key("metric", key)?;
        let path = self.run_dir(run_id)?.join("metrics").join(key);
        if !path.is_file() {
            return Ok(Vec::new());
        }

        fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_metric_line(key, line))
            .collect()
    }

    /// Versions of the registered model `name`, oldest first
    pub fn model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        let dir = self.root.join(MODELS_DIR).join(name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(dir)? {
            let meta = entry?.path().join("meta.yaml");
            let is_version = meta
                .parent()
                .and_then(|p| p.file_name())
                .map_or(false, |n| n.to_string_lossy().starts_with("version-"));
            if is_version && meta.is_file() {
                let meta: ModelVersionMeta = read_yaml(&meta)?;
                versions.push(ModelVersion {
                    name: meta.name,
                    version: meta.version,
                    source: meta.source,
                    run_id: meta.run_id,
                });
            }
        }
        versions.sort_by_key(|v| v.version);

        Ok(versions)
    }

    fn artifact_dir(&self, run: &RunInfo) -> Result<PathBuf> {
        match run.artifact_uri.strip_prefix("file://") {
            Some(path) => Ok(PathBuf::from(path)),
            None => Err(LoggingError::UnsupportedArtifactUri(
                run.artifact_uri.clone(),
            )),
        }
    }
}

impl TrackingStore for FileStore {
    fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        let experiments = self.experiments()?;
        if let Some(experiment) = experiments.iter().find(|e| e.name == name) {
            return Ok(experiment.experiment_id.clone());
        }

        let next_id = experiments
            .iter()
            .filter_map(|e| e.experiment_id.parse::<u64>().ok())
            .max()
            .map_or(0, |id| id + 1)
            .to_string();
        self.write_experiment(&next_id, name)?;
        tracing::debug!(experiment = name, id = %next_id, "created experiment");

        Ok(next_id)
    }

    fn create_run(
        &self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
    ) -> Result<RunInfo> {
        let experiment_dir = self.root.join(experiment_id);
        if !experiment_dir.join("meta.yaml").is_file() {
            return Err(LoggingError::Api {
                code: "RESOURCE_DOES_NOT_EXIST".to_string(),
                message: format!("no experiment with id {}", experiment_id),
            });
        }

        let run_id = new_id();
        let run_dir = experiment_dir.join(&run_id);
        for sub in &["params", "metrics", "tags", "artifacts"] {
            fs::create_dir_all(run_dir.join(sub))?;
        }

        let meta = RunMeta {
            artifact_uri: file_uri(&run_dir.join("artifacts")),
            end_time: None,
            experiment_id: experiment_id.to_string(),
            lifecycle_stage: "active".to_string(),
            run_id: run_id.clone(),
            run_name: run_name.map(String::from),
            run_uuid: run_id,
            start_time,
            status: RunStatus::Running.code(),
        };
        write_yaml(&run_dir.join("meta.yaml"), &meta)?;

        meta.info()
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key("parameter", key)?;
        let path = self.run_dir(run_id)?.join("params").join(key);
        if path.is_file() {
            let old = fs::read_to_string(&path)?;
            if old != value {
                return Err(LoggingError::Api {
                    code: "INVALID_PARAMETER_VALUE".to_string(),
                    message: format!("parameter {} was already logged with value {}", key, old),
                });
            }
            return Ok(());
        }

        write_nested(&path, value.as_bytes())
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()> {
        validate_key("metric", &metric.key)?;
        let path = self.run_dir(run_id)?.join("metrics").join(&metric.key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{} {} {}", metric.timestamp, metric.value, metric.step)?;

        Ok(())
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key("tag", key)?;
        write_nested(&self.run_dir(run_id)?.join("tags").join(key), value.as_bytes())
    }

    fn log_artifact(&self, run: &RunInfo, path: &str, contents: &[u8]) -> Result<()> {
        validate_key("artifact path", path)?;
        write_nested(&self.artifact_dir(run)?.join(path), contents)
    }

    fn update_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        let path = self.run_dir(run_id)?.join("meta.yaml");
        let mut meta: RunMeta = read_yaml(&path)?;
        meta.status = status.code();
        if status.is_terminated() {
            meta.end_time = Some(end_time);
        }

        write_yaml(&path, &meta)
    }

    fn register_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion> {
        validate_key("registered model name", name)?;
        if name.contains('/') {
            return Err(invalid_value(format!(
                "registered model name {} must not contain '/'",
                name
            )));
        }
        self.run_dir(run_id)?;

        let now = now_ms();
        let model_dir = self.root.join(MODELS_DIR).join(name);
        let model_meta = model_dir.join("meta.yaml");
        if !model_meta.is_file() {
            fs::create_dir_all(&model_dir)?;
            write_yaml(
                &model_meta,
                &RegisteredModelMeta {
                    name: name.to_string(),
                    creation_timestamp: now,
                    last_updated_timestamp: now,
                },
            )?;
        }

        let version = self
            .model_versions(name)?
            .last()
            .map_or(1, |v| v.version + 1);
        let version_dir = model_dir.join(format!("version-{}", version));
        fs::create_dir_all(&version_dir)?;
        write_yaml(
            &version_dir.join("meta.yaml"),
            &ModelVersionMeta {
                name: name.to_string(),
                version,
                source: source.to_string(),
                run_id: run_id.to_string(),
                creation_timestamp: now,
                current_stage: "None".to_string(),
                status: "READY".to_string(),
            },
        )?;

        let mut registered: RegisteredModelMeta = read_yaml(&model_meta)?;
        registered.last_updated_timestamp = now;
        write_yaml(&model_meta, &registered)?;

        Ok(ModelVersion {
            name: name.to_string(),
            version,
            source: source.to_string(),
            run_id: run_id.to_string(),
        })
    }
}

fn invalid_value(message: String) -> LoggingError {
    LoggingError::Api {
        code: "INVALID_PARAMETER_VALUE".to_string(),
        message,
    }
}

/// Keys become paths below the run directory. Accepts alphanumerics and `_-./ `, with `/`
/// only between non-empty components and no `.` or `..` component.
fn validate_key(kind: &str, key: &str) -> Result<()> {
    let allowed = |c: char| c.is_alphanumeric() || "_-./ ".contains(c);
    if key.is_empty() || !key.chars().all(allowed) {
        return Err(invalid_value(format!("invalid {} name `{}`", kind, key)));
    }
    if key
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(invalid_value(format!(
            "{} name `{}` does not stay inside the run",
            kind, key
        )));
    }

    Ok(())
}

fn write_nested(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;

    Ok(())
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = fs::File::open(path)?;
    Ok(serde_yaml::from_reader(file)?)
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

fn parse_metric_line(key: &str, line: &str) -> Result<Metric> {
    let malformed = || LoggingError::Api {
        code: "INVALID_STATE".to_string(),
        message: format!("malformed metric line `{}` for {}", line, key),
    };

    let mut fields = line.split_whitespace();
    let timestamp = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(malformed)?;
    let value = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(malformed)?;
    let step = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);

    Ok(Metric {
        key: key.to_string(),
        value,
        timestamp,
        step,
    })
}
