use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// Whether the error must end the run even when per-item failures are isolated.
    fn is_fatal(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::RedditApi(e) => {
                error!("Reddit API error details: {:?}", e);
            }
            CoreError::Auth(e) => {
                error!("Authentication error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_fatal(),
            CoreError::Network(e) => !(e.is_timeout() || e.is_connect()),
            CoreError::Auth(_)
            | CoreError::Config(_)
            | CoreError::Io(_)
            | CoreError::Serialization(_)
            | CoreError::Internal { .. } => true,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Auth(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::Io(e) => format!("File system error: {}", e),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API".to_string(),
            CoreError::Auth(_) => "AUTH".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!("RedditApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("RedditApiError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        // Every later request would fail the same way.
        matches!(
            self,
            RedditApiError::InvalidToken | RedditApiError::RateLimitExceeded { .. }
        )
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            RedditApiError::InvalidToken => {
                "Reddit session token is invalid or expired. Please run again.".to_string()
            }
            RedditApiError::Forbidden { resource } => format!(
                "Access denied to {}. The item may be archived or locked.",
                resource
            ),
            RedditApiError::NotFound { resource } => {
                format!("Could not find {} on Reddit.", resource)
            }
            RedditApiError::RequestTimeout => {
                "Request to Reddit timed out. Please try again.".to_string()
            }
            RedditApiError::MutationRejected {
                operation, reason, ..
            } => format!("Reddit refused the {}: {}", operation, reason),
            _ => "Reddit API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT".to_string(),
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN".to_string(),
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN".to_string(),
            RedditApiError::NotFound { .. } => "REDDIT_NOT_FOUND".to_string(),
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR".to_string(),
            RedditApiError::MutationRejected { .. } => "REDDIT_MUTATION_REJECTED".to_string(),
        }
    }
}

impl ErrorExt for AuthError {
    fn log_error(&self) -> &Self {
        error!("AuthError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("AuthError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn user_friendly_message(&self) -> String {
        match self {
            AuthError::UserNotFound { username } => {
                format!("User '{}' does not exist.", username)
            }
            AuthError::BadPassword => {
                "Specified an incorrect password. Please check your configuration.".to_string()
            }
            AuthError::RateLimited { retry_after } => format!(
                "You're doing that too much. Please wait {} seconds.",
                retry_after
            ),
            AuthError::InvalidClient { .. } => {
                "Reddit rejected client_id/client_secret. Check your app settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            AuthError::UserNotFound { .. } => "AUTH_USER_NOT_FOUND".to_string(),
            AuthError::BadPassword => "AUTH_BAD_PASSWORD".to_string(),
            AuthError::RateLimited { .. } => "AUTH_RATE_LIMITED".to_string(),
            AuthError::InvalidClient { .. } => "AUTH_INVALID_CLIENT".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => format!(
                "Configuration file '{}' not found. Copy shreddit.toml.example to get started.",
                path
            ),
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for configuration field '{}'.", value, field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
