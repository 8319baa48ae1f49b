use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookalikeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    #[error("Name already exists: {name}")]
    NameCollisionError { name: String },

    #[error("Remote API error (HTTP {status}): {message}")]
    RemoteApiError { status: u16, message: String },

    #[error("Pagination stopped after {pages} pages")]
    PaginationLimitError { pages: usize },

    #[error("Not connected: {message}")]
    SessionError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Authentication,
    Conflict,
    Remote,
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

impl LookalikeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. } | Self::SessionError { .. } => ErrorCategory::Input,
            Self::AuthenticationError { .. } => ErrorCategory::Authentication,
            Self::NameCollisionError { .. } => ErrorCategory::Conflict,
            Self::HttpError(_) | Self::RemoteApiError { .. } | Self::PaginationLimitError { .. } => {
                ErrorCategory::Remote
            }
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Conflict => ErrorSeverity::Low,
            ErrorCategory::Input | ErrorCategory::Remote => ErrorSeverity::Medium,
            ErrorCategory::Authentication | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給網頁與終端機顯示的訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message } => message.clone(),
            Self::AuthenticationError { message } => {
                format!("Connection rejected by the ad platform: {}", message)
            }
            Self::NameCollisionError { name } => format!("Name already exists: {}", name),
            Self::RemoteApiError { message, .. } => message.clone(),
            Self::HttpError(e) if e.is_timeout() => "The ad platform did not respond in time".to_string(),
            Self::HttpError(e) if e.is_connect() => "Could not reach the ad platform".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the form fields and try again",
            ErrorCategory::Authentication => {
                "Paste a valid (long-lived) access token with ads_management permission"
            }
            ErrorCategory::Conflict => "Pick another conflict policy or rename the seed audience",
            ErrorCategory::Remote => "Check the ad account id and your network, then retry",
            ErrorCategory::Configuration => "Fix the command line flags or the TOML config file",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, LookalikeError>;
