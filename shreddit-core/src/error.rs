use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("User does not exist: {username}")]
    UserNotFound { username: String },

    #[error("Specified an incorrect password")]
    BadPassword,

    #[error("You're doing that too much. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Reddit rejected the application credentials: {reason}")]
    InvalidClient { reason: String },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("{operation} of {id} rejected: {reason}")]
    MutationRejected {
        operation: String,
        id: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
