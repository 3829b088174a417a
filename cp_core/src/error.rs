/// Core error type for chpool-exporter
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The pool could not produce a stat snapshot
    #[error("Pool stat error: {0}")]
    Stat(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The metrics registry could not be accessed
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
