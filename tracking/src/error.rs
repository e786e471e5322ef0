use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoggingError>;

/// Failures while talking to a tracking store
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The tracking server rejected a request
    #[error("tracking server returned {code}: {message}")]
    Api { code: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("run {0} does not exist")]
    UnknownRun(String),
    #[error("cannot store artifacts at {0}")]
    UnsupportedArtifactUri(String),
    #[error("invalid tracking uri {0}")]
    InvalidUri(String),
}

impl LoggingError {
    /// Error code reported by the tracking server, if any
    pub fn api_code(&self) -> Option<&str> {
        match self {
            LoggingError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
