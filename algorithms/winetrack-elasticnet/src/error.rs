use thiserror::Error;

/// Simplified `Result` using [`ElasticNetError`](crate::ElasticNetError) as error type
pub type Result<T> = std::result::Result<T, ElasticNetError>;

/// Error variants from hyper-parameter construction or model estimation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ElasticNetError {
    /// The input has not enough samples
    #[error("not enough samples as they have to be larger than zero")]
    NotEnoughSamples,
    /// The input has no features
    #[error("the records contain no features")]
    NoFeatures,
    #[error("penalty should be positive, but is {0}")]
    InvalidPenalty(f32),
    #[error("l1 ratio should be in range [0, 1], but is {0}")]
    InvalidL1Ratio(f32),
    #[error("tolerance should be positive, but is {0}")]
    InvalidTolerance(f32),
    #[error("at least one iteration is required")]
    InvalidMaxIterations,
    #[error(transparent)]
    BaseCrate(#[from] winetrack::Error),
}
