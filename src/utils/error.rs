use std::sync::Arc;
use thiserror::Error;

/// 儀表板錯誤。外部錯誤以 `Arc` 包裝，讓合併中的請求可以把同一個失敗廣播給所有等待者。
#[derive(Error, Debug, Clone)]
pub enum DashboardError {
    #[error("API request failed: {0}")]
    ApiError(Arc<reqwest::Error>),

    #[error("{message}")]
    HttpStatusError { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(Arc<std::io::Error>),

    #[error("Serialization error: {0}")]
    SerializationError(Arc<serde_json::Error>),

    #[error("CSV export error: {0}")]
    CsvError(Arc<csv::Error>),

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

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Background fetch task failed: {message}")]
    TaskError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DashboardError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_) | Self::ValidationError { .. } => ErrorCategory::Data,
            Self::IoError(_) | Self::CsvError(_) | Self::TaskError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 後端資料異常只記錄，不中斷渲染
            Self::ValidationError { .. } => ErrorSeverity::Low,
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorSeverity::Medium,
            Self::SerializationError(_)
            | Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::High,
            Self::TaskError { .. } => ErrorSeverity::High,
            Self::IoError(_) | Self::CsvError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check that the prediction backend is running, then reload the dashboard"
            }
            ErrorCategory::Configuration => {
                "Review the [api] section of the config file or the --mode/--origin flags"
            }
            ErrorCategory::Data => {
                "The backend returned unexpected data; check the backend logs for this period"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(e) if e.is_timeout() => {
                "The prediction service took too long to respond".to_string()
            }
            Self::ApiError(e) if e.is_connect() => {
                "Could not connect to the prediction service".to_string()
            }
            Self::HttpStatusError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// 是否為可透過重新載入恢復的錯誤
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Network
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(e: reqwest::Error) -> Self {
        Self::ApiError(Arc::new(e))
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(Arc::new(e))
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(Arc::new(e))
    }
}

impl From<csv::Error> for DashboardError {
    fn from(e: csv::Error) -> Self {
        Self::CsvError(Arc::new(e))
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
