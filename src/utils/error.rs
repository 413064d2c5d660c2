use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrptError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API responded with status {status}: {body}")]
    ApiStatusError { status: u16, body: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Task pool error: {message}")]
    PoolError { message: String },

    #[error("Rate limiter is closed")]
    RateLimiterClosed,

    #[error("Background task failed: {0}")]
    TaskJoinError(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CrptError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CrptError::ApiError(_) => ErrorCategory::Network,
            CrptError::ApiStatusError { .. } => ErrorCategory::Api,
            CrptError::SerializationError(_) | CrptError::ValidationError { .. } => {
                ErrorCategory::Data
            }
            CrptError::ConfigError { .. }
            | CrptError::ConfigValidationError { .. }
            | CrptError::InvalidConfigValueError { .. }
            | CrptError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CrptError::IoError(_)
            | CrptError::PoolError { .. }
            | CrptError::RateLimiterClosed
            | CrptError::TaskJoinError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 5xx and 429 are worth another attempt later
            CrptError::ApiStatusError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            CrptError::ApiError(_) => ErrorSeverity::Medium,
            CrptError::ApiStatusError { .. }
            | CrptError::SerializationError(_)
            | CrptError::ValidationError { .. }
            | CrptError::ConfigError { .. }
            | CrptError::ConfigValidationError { .. }
            | CrptError::InvalidConfigValueError { .. }
            | CrptError::MissingConfigError { .. } => ErrorSeverity::High,
            CrptError::IoError(_)
            | CrptError::PoolError { .. }
            | CrptError::RateLimiterClosed
            | CrptError::TaskJoinError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Medium
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CrptError::ApiError(_) => {
                "Check network connectivity and that the API endpoint is reachable".to_string()
            }
            CrptError::ApiStatusError { status, .. } => match status {
                401 | 403 => "Check that the auth token is valid and not expired".to_string(),
                429 => "Lower the request limit or lengthen the period".to_string(),
                s if *s >= 500 => "The API is unavailable, try again later".to_string(),
                _ => "Check the document fields against the API documentation".to_string(),
            },
            CrptError::SerializationError(_) => {
                "Check that the document JSON matches the expected schema".to_string()
            }
            CrptError::IoError(_) => "Check file paths and permissions".to_string(),
            CrptError::ConfigError { .. }
            | CrptError::ConfigValidationError { .. }
            | CrptError::InvalidConfigValueError { .. } => {
                "Review the configuration values and try again".to_string()
            }
            CrptError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            CrptError::ValidationError { .. } => "Fix the document and resend it".to_string(),
            CrptError::PoolError { .. }
            | CrptError::RateLimiterClosed
            | CrptError::TaskJoinError(_) => {
                "Create a new client or pool instance".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the CRPT API: {}", self),
            ErrorCategory::Api => format!("The CRPT API rejected the request: {}", self),
            ErrorCategory::Data => format!("The document is invalid: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("Internal error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrptError>;
