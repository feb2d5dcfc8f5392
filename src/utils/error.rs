use thiserror::Error;

#[derive(Error, Debug)]
pub enum GritError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Grafana request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to parse {path}: {message}")]
    ConfigParseError { path: String, message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Definition error in {source_name}: {message}")]
    DefinitionError {
        source_name: String,
        message: String,
    },

    #[error("Layout error: {message}")]
    LayoutError { message: String },

    #[error("Invalid time range '{value}': {reason}")]
    TimeRangeError { value: String, reason: String },

    #[error("Unknown variation '{name}', known variations: {known}")]
    UnknownVariation { name: String, known: String },

    #[error("Grafana API {endpoint} returned {status}: {body}")]
    GrafanaApiError {
        status: u16,
        endpoint: String,
        body: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Definition,
    Network,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GritError {
    pub fn definition(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        GritError::DefinitionError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn layout(message: impl Into<String>) -> Self {
        GritError::LayoutError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GritError::ConfigParseError { .. }
            | GritError::MissingConfigError { .. }
            | GritError::InvalidConfigValueError { .. }
            | GritError::UnknownVariation { .. } => ErrorCategory::Configuration,
            GritError::DefinitionError { .. }
            | GritError::LayoutError { .. }
            | GritError::TimeRangeError { .. }
            | GritError::SerializationError(_) => ErrorCategory::Definition,
            GritError::HttpError(_) | GritError::GrafanaApiError { .. } => ErrorCategory::Network,
            GritError::IoError(_) | GritError::ZipError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GritError::HttpError(_) => ErrorSeverity::Medium,
            GritError::GrafanaApiError { status, .. } if *status >= 500 || *status == 429 => {
                ErrorSeverity::Medium
            }
            GritError::IoError(_) | GritError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            GritError::ConfigParseError { path, .. } => {
                format!("Check the TOML syntax of {}", path)
            }
            GritError::MissingConfigError { field } => {
                format!("Set '{}' in grit.toml or pass it on the command line", field)
            }
            GritError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}'", field)
            }
            GritError::DefinitionError { source_name, .. } => {
                format!("Fix the definition in {}", source_name)
            }
            GritError::LayoutError { .. } => {
                "Use non-zero row heights and at most 24 panels per row".to_string()
            }
            GritError::TimeRangeError { .. } => {
                "Use 'now', '<n>m|h|d|w' or 'now-<n>m|h|d|w'".to_string()
            }
            GritError::UnknownVariation { known, .. } => {
                format!("Pick one of the declared variations: {}", known)
            }
            GritError::GrafanaApiError { status: 401, .. }
            | GritError::GrafanaApiError { status: 403, .. } => {
                "Check the Grafana token and its permissions".to_string()
            }
            GritError::GrafanaApiError { .. } | GritError::HttpError(_) => {
                "Check that Grafana is reachable and retry".to_string()
            }
            GritError::IoError(_) | GritError::ZipError(_) => {
                "Check file permissions and free disk space".to_string()
            }
            GritError::SerializationError(_) => {
                "Check the generated values for unsupported content".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Definition => format!("Definition problem: {}", self),
            ErrorCategory::Network => format!("Could not talk to Grafana: {}", self),
            ErrorCategory::Storage => format!("Could not write output: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, GritError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_severity() {
        let err = GritError::layout("row height must be positive");
        assert_eq!(err.category(), ErrorCategory::Definition);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = GritError::GrafanaApiError {
            status: 503,
            endpoint: "/api/folders".to_string(),
            body: String::new(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = GritError::IoError(std::io::Error::other("disk full"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_unauthorized_suggestion() {
        let err = GritError::GrafanaApiError {
            status: 401,
            endpoint: "/api/dashboards/db".to_string(),
            body: "invalid API key".to_string(),
        };
        assert!(err.recovery_suggestion().contains("token"));
        assert!(err.user_friendly_message().starts_with("Could not talk to Grafana"));
    }
}
