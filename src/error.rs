use thiserror::Error;

#[derive(Debug, Error)]
pub enum PqMiddlewareError {
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}
