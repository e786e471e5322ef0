use std::fs;
use std::path::PathBuf;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{LoggingError, Result};
use crate::store::{Metric, ModelVersion, RunInfo, RunStatus, TrackingStore};

const API_PREFIX: &str = "api/2.0/mlflow";
const ARTIFACTS_PREFIX: &str = "api/2.0/mlflow-artifacts/artifacts";

/// Authentication against a tracking server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    Basic { username: String, password: String },
    Token(String),
}

impl Default for Credentials {
    fn default() -> Self {
        Credentials::None
    }
}

impl Credentials {
    /// Read `MLFLOW_TRACKING_TOKEN`, or `MLFLOW_TRACKING_USERNAME` together with
    /// `MLFLOW_TRACKING_PASSWORD`
    pub fn from_env() -> Credentials {
        let var = |name: &str| std::env::var(name).ok().filter(|v: &String| !v.is_empty());

        if let Some(token) = var("MLFLOW_TRACKING_TOKEN") {
            return Credentials::Token(token);
        }
        match (var("MLFLOW_TRACKING_USERNAME"), var("MLFLOW_TRACKING_PASSWORD")) {
            (Some(username), password) => Credentials::Basic {
                username,
                password: password.unwrap_or_default(),
            },
            _ => Credentials::None,
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::None => request,
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::Token(token) => request.bearer_auth(token),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ApiError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct Named<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct ExperimentId {
    experiment_id: String,
}

#[derive(Deserialize)]
struct GetExperiment {
    experiment: ExperimentId,
}

#[derive(Serialize)]
struct CreateRun<'a> {
    experiment_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_name: Option<&'a str>,
    start_time: i64,
}

#[derive(Deserialize)]
struct RunWire {
    info: RunInfo,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: RunWire,
}

#[derive(Serialize)]
struct KeyValue<'a> {
    run_id: &'a str,
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct LogMetric<'a> {
    run_id: &'a str,
    key: &'a str,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Serialize)]
struct UpdateRun<'a> {
    run_id: &'a str,
    status: RunStatus,
    end_time: i64,
}

#[derive(Serialize)]
struct CreateModelVersion<'a> {
    name: &'a str,
    source: &'a str,
    run_id: &'a str,
}

#[derive(Deserialize)]
struct ModelVersionWire {
    name: String,
    version: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    run_id: String,
}

#[derive(Deserialize)]
struct CreateModelVersionResponse {
    model_version: ModelVersionWire,
}

impl ModelVersionWire {
    fn into_model_version(self) -> Result<ModelVersion> {
        let version = self.version.parse().map_err(|_| LoggingError::Api {
            code: "INVALID_RESPONSE".to_string(),
            message: format!("model version `{}` is not a number", self.version),
        })?;

        Ok(ModelVersion {
            name: self.name,
            version,
            source: self.source,
            run_id: self.run_id,
        })
    }
}

/// Where an artifact has to be written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactTarget {
    /// Upload with `PUT` through the server's artifact proxy
    Proxy(String),
    /// Write to a filesystem shared with the server
    Local(PathBuf),
}

/// Map the artifact root of a run and a relative path to an upload target
pub fn artifact_target(base_url: &str, artifact_uri: &str, path: &str) -> Result<ArtifactTarget> {
    let path = path.trim_start_matches('/');

    if let Some(rest) = artifact_uri.strip_prefix("mlflow-artifacts:") {
        // `mlflow-artifacts:/<path>` or `mlflow-artifacts://<host>/<path>`
        let rest = match rest.strip_prefix("//") {
            Some(with_host) => with_host.splitn(2, '/').nth(1).unwrap_or(""),
            None => rest.trim_start_matches('/'),
        };
        let root = rest.trim_end_matches('/');

        return Ok(ArtifactTarget::Proxy(format!(
            "{}/{}/{}/{}",
            base_url.trim_end_matches('/'),
            ARTIFACTS_PREFIX,
            root,
            path
        )));
    }

    if let Some(local) = artifact_uri.strip_prefix("file://") {
        return Ok(ArtifactTarget::Local(PathBuf::from(local).join(path)));
    }
    if artifact_uri.starts_with('/') {
        return Ok(ArtifactTarget::Local(PathBuf::from(artifact_uri).join(path)));
    }

    Err(LoggingError::UnsupportedArtifactUri(
        artifact_uri.to_string(),
    ))
}

/// Tracking store talking to an MLflow server over its REST API
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    credentials: Credentials,
    client: Client,
}

impl RestStore {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("winetrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(RestStore {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, endpoint)
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<R> {
        tracing::debug!(endpoint, "POST");
        let request = self.client.post(self.endpoint(endpoint)).json(body);
        decode(self.credentials.apply(request).send()?)
    }

    fn get<R: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<R> {
        tracing::debug!(endpoint, "GET");
        let request = self.client.get(self.endpoint(endpoint)).query(query);
        decode(self.credentials.apply(request).send()?)
    }

    fn upload(&self, url: &str, contents: &[u8]) -> Result<()> {
        tracing::debug!(url, bytes = contents.len(), "PUT artifact");
        let request = self.client.put(url).body(contents.to_vec());
        let response = self.credentials.apply(request).send()?;
        if !response.status().is_success() {
            return Err(api_error(response));
        }

        Ok(())
    }
}

fn decode<R: DeserializeOwned>(response: Response) -> Result<R> {
    if !response.status().is_success() {
        return Err(api_error(response));
    }

    Ok(serde_json::from_slice(&response.bytes()?)?)
}

fn api_error(response: Response) -> LoggingError {
    let status = response.status();
    let body = response.text().unwrap_or_default();

    parse_api_error(status.as_u16(), &body)
}

/// Interpret an error response, MLflow answers with `{"error_code": .., "message": ..}`
fn parse_api_error(status: u16, body: &str) -> LoggingError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(ApiError {
            error_code: Some(code),
            message,
        }) => LoggingError::Api {
            code,
            message: message.unwrap_or_default(),
        },
        _ => LoggingError::Api {
            code: format!("HTTP_{}", status),
            message: body.trim().to_string(),
        },
    }
}

impl TrackingStore for RestStore {
    fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        match self.get::<GetExperiment>("experiments/get-by-name", &[("experiment_name", name)]) {
            Ok(found) => Ok(found.experiment.experiment_id),
            Err(err) if err.api_code() == Some("RESOURCE_DOES_NOT_EXIST") => {
                let created: ExperimentId =
                    self.post("experiments/create", &Named { name })?;
                Ok(created.experiment_id)
            }
            Err(err) => Err(err),
        }
    }

    fn create_run(
        &self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
    ) -> Result<RunInfo> {
        let response: CreateRunResponse = self.post(
            "runs/create",
            &CreateRun {
                experiment_id,
                run_name,
                start_time,
            },
        )?;

        Ok(response.run.info)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post::<_, serde_json::Value>("runs/log-parameter", &KeyValue { run_id, key, value })?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()> {
        self.post::<_, serde_json::Value>(
            "runs/log-metric",
            &LogMetric {
                run_id,
                key: &metric.key,
                value: metric.value,
                timestamp: metric.timestamp,
                step: metric.step,
            },
        )?;
        Ok(())
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post::<_, serde_json::Value>("runs/set-tag", &KeyValue { run_id, key, value })?;
        Ok(())
    }

    fn log_artifact(&self, run: &RunInfo, path: &str, contents: &[u8]) -> Result<()> {
        match artifact_target(&self.base_url, &run.artifact_uri, path)? {
            ArtifactTarget::Proxy(url) => self.upload(&url, contents),
            ArtifactTarget::Local(target) => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(target, contents)?;
                Ok(())
            }
        }
    }

    fn update_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        self.post::<_, serde_json::Value>(
            "runs/update",
            &UpdateRun {
                run_id,
                status,
                end_time,
            },
        )?;
        Ok(())
    }

    fn register_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion> {
        match self.post::<_, serde_json::Value>(
            "registered-models/create",
            &Named { name },
        ) {
            Ok(_) => tracing::debug!(name, "created registered model"),
            Err(err) if err.api_code() == Some("RESOURCE_ALREADY_EXISTS") => {}
            Err(err) => return Err(err),
        }

        let response: CreateModelVersionResponse = self.post(
            "model-versions/create",
            &CreateModelVersion {
                name,
                source,
                run_id,
            },
        )?;

        response.model_version.into_model_version()
    }
}
