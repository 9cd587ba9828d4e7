use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarmonizeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("undefined statistic: {0}")]
    UndefinedStatistic(String),
}

pub type Result<T> = std::result::Result<T, HarmonizeError>;
