//! Error types in winetrack
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("not enough samples to compute the score")]
    NotEnoughSamples,
    #[error("mismatched number of samples: expected {expected}, got {actual}")]
    MismatchedShapes { expected: usize, actual: usize },
}
