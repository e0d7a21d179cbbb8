use thiserror::Error;

/// Top-level error type for the trigger system.
///
/// Subsystem crates define their own error types and convert into
/// `TriggerError` where a failure has to cross a crate boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TriggerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Interaction context error: {0}")]
    Context(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TriggerError {
    fn from(err: toml::de::Error) -> Self {
        TriggerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TriggerError {
    fn from(err: toml::ser::Error) -> Self {
        TriggerError::Config(err.to_string())
    }
}

/// A specialized `Result` type for trigger operations.
pub type Result<T> = std::result::Result<T, TriggerError>;
