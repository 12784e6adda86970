use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CepError {
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl CepError {
    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            CepError::HttpClientError(_) => "Could not build the HTTP client".to_string(),
            CepError::IoError(e) => format!("Could not read a file: {}", e),
            CepError::ConfigError { message } => format!("Invalid configuration: {}", message),
            CepError::ConfigValidationError { field, message } => {
                format!("Configuration field {} is invalid: {}", field, message)
            }
            CepError::InvalidConfigValueError { field, value, .. } => {
                format!("Configuration field {} has an invalid value '{}'", field, value)
            }
            CepError::MissingConfigError { field } => format!("Missing required configuration: {}", field),
            CepError::ValidationError { message } => message.clone(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CepError::HttpClientError(_) => "Check the TLS setup of the host".to_string(),
            CepError::IoError(_) => "Make sure the config file exists and is readable".to_string(),
            CepError::ConfigError { .. } | CepError::ConfigValidationError { .. } => {
                "Review the TOML file against the documented layout".to_string()
            }
            CepError::InvalidConfigValueError { reason, .. } => reason.clone(),
            CepError::MissingConfigError { field } => {
                format!("Set '{}' in the config file or on the command line", field)
            }
            CepError::ValidationError { .. } => "Postal codes must have exactly 8 characters".to_string(),
        }
    }
}

/// 單一 provider 失敗的原因，只在 coordinator 內部流轉
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Decode(String),

    #[error("provider reported '{0}' for this code")]
    Rejected(String),

    #[error("provider task panicked")]
    Panicked,

    #[error("provider task was cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaceError {
    #[error("no provider answered within {0:?}")]
    Timeout(Duration),

    #[error("all {attempted} providers failed")]
    AllFailed { attempted: usize },
}

pub type Result<T> = std::result::Result<T, CepError>;
