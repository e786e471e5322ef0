use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use flate2::read::GzDecoder;

use crate::error::{DataLoadError, Result};

/// Location of a CSV dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    Path(PathBuf),
}

impl DataSource {
    /// Interpret a locator string
    ///
    /// `http://` and `https://` locators are fetched over the network, `file://` locators and
    /// everything else are read from the local filesystem.
    pub fn parse(locator: &str) -> DataSource {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            DataSource::Url(locator.to_string())
        } else {
            let path = locator.strip_prefix("file://").unwrap_or(locator);
            DataSource::Path(PathBuf::from(path))
        }
    }

    fn is_gzip(&self) -> bool {
        match self {
            DataSource::Url(url) => url.ends_with(".gz"),
            DataSource::Path(path) => path.extension().map_or(false, |ext| ext == "gz"),
        }
    }

    /// Fetch the raw bytes, decompressing gzip sources
    pub fn fetch(&self) -> Result<Vec<u8>> {
        let raw = match self {
            DataSource::Url(url) => fetch_url(url)?,
            DataSource::Path(path) => std::fs::read(path).map_err(|source| DataLoadError::Io {
                locator: self.to_string(),
                source,
            })?,
        };

        if !self.is_gzip() {
            return Ok(raw);
        }

        let mut buf = Vec::new();
        GzDecoder::new(&raw[..])
            .read_to_end(&mut buf)
            .map_err(|source| DataLoadError::Io {
                locator: self.to_string(),
                source,
            })?;

        Ok(buf)
    }
}

fn fetch_url(url: &str) -> Result<Vec<u8>> {
    let http_err = |source| DataLoadError::Http {
        url: url.to_string(),
        source,
    };

    tracing::debug!(url, "downloading dataset");
    let response = reqwest::blocking::get(url).map_err(http_err)?;

    let status = response.status();
    if !status.is_success() {
        return Err(DataLoadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.bytes().map_err(http_err)?.to_vec())
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Url(url) => write!(f, "{}", url),
            DataSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}
