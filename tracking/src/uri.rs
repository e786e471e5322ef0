use std::fmt;
use std::path::PathBuf;

use crate::error::{LoggingError, Result};
use crate::file::FileStore;
use crate::rest::{Credentials, RestStore};
use crate::store::TrackingStore;

/// Environment variable consulted when no tracking uri is given explicitly
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";

/// Where runs are recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingUri {
    /// A tracking server, e.g. `http://mlflow.kubeflow:5000`
    Http(String),
    /// A local `mlruns` directory
    File(PathBuf),
}

impl TrackingUri {
    /// Pick the explicit uri, then `MLFLOW_TRACKING_URI`, then `./mlruns`
    pub fn resolve(explicit: Option<&str>) -> Result<TrackingUri> {
        let from_env = std::env::var(TRACKING_URI_ENV).ok();
        Self::resolve_with(explicit, from_env.as_deref())
    }

    fn resolve_with(explicit: Option<&str>, from_env: Option<&str>) -> Result<TrackingUri> {
        match explicit.or(from_env).filter(|uri| !uri.trim().is_empty()) {
            Some(uri) => uri.parse(),
            None => Ok(TrackingUri::File(PathBuf::from("mlruns"))),
        }
    }
}

impl std::str::FromStr for TrackingUri {
    type Err = LoggingError;

    fn from_str(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(TrackingUri::Http(uri.trim_end_matches('/').to_string()));
        }
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(TrackingUri::File(PathBuf::from(path)));
        }
        if uri.contains("://") || uri.starts_with("databricks") {
            return Err(LoggingError::InvalidUri(uri.to_string()));
        }

        Ok(TrackingUri::File(PathBuf::from(uri)))
    }
}

impl fmt::Display for TrackingUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingUri::Http(url) => write!(f, "{}", url),
            TrackingUri::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Build the store matching a tracking uri
pub fn open_store(uri: &TrackingUri, credentials: Credentials) -> Result<Box<dyn TrackingStore>> {
    tracing::debug!(%uri, "opening tracking store");
    match uri {
        TrackingUri::Http(url) => Ok(Box::new(RestStore::new(url, credentials)?)),
        TrackingUri::File(path) => Ok(Box::new(FileStore::new(path)?)),
    }
}
