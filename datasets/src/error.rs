use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataLoadError>;

/// Failures while fetching or decoding a dataset
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("could not read {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("could not parse records: {0}")]
    Parse(#[from] ndarray_csv::ReadError),
    #[error("column `{0}` not found in header")]
    MissingColumn(String),
    #[error("the dataset contains no records")]
    Empty,
}
