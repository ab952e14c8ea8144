use thiserror::Error;

#[derive(Debug, Error)]
pub enum RummageoError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error [{status}]: {message}")]
    Upstream { status: u16, message: String },

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RummageoError>;
