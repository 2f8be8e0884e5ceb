use thiserror::Error;

/// Unified error type for the maintainer
#[derive(Error, Debug)]
pub enum MaintainerError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    // Inventory errors
    #[error("Inventory request failed: {0}")]
    Inventory(#[from] reqwest::Error),

    #[error("Inventory returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Failed to decode inventory response: {0}")]
    Decode(#[from] serde_json::Error),

    // Proxy errors
    #[error("Proxy connection failed: {0}")]
    ProxyConnectionFailed(String),

    #[error("Invalid proxy address: {0}")]
    InvalidProxyAddress(String),

    #[error("Unknown dial type: {0}")]
    UnsupportedDialType(String),

    #[error("Check request failed: {0}")]
    CheckFailed(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Operation timed out")]
    Timeout,
}

/// Result type alias for maintainer operations
pub type Result<T> = std::result::Result<T, MaintainerError>;

impl MaintainerError {
    /// Data-quality errors from the inventory: the candidate is skipped, never reported
    pub fn is_classification(&self) -> bool {
        matches!(self, MaintainerError::UnsupportedDialType(_))
    }
}

// Convert from URL parse errors
impl From<url::ParseError> for MaintainerError {
    fn from(err: url::ParseError) -> Self {
        MaintainerError::InvalidConfig(err.to_string())
    }
}
