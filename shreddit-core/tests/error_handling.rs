use shreddit_core::{
    AuthError, ConfigError, CoreError, ErrorExt, ErrorReporter, RedditApiError,
};

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let auth_error = CoreError::Auth(AuthError::BadPassword);
    assert_eq!(auth_error.error_code(), "AUTH");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "username".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    assert_eq!(
        AuthError::UserNotFound {
            username: "ghost".to_string()
        }
        .error_code(),
        "AUTH_USER_NOT_FOUND"
    );
}

#[test]
fn test_fatal_errors() {
    assert!(CoreError::Auth(AuthError::RateLimited { retry_after: 600 }).is_fatal());
    assert!(CoreError::RedditApi(RedditApiError::InvalidToken).is_fatal());
    assert!(CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 }).is_fatal());

    let rejected = CoreError::RedditApi(RedditApiError::MutationRejected {
        operation: "edit".to_string(),
        id: "t1_abc".to_string(),
        reason: "TOO_OLD".to_string(),
    });
    assert!(!rejected.is_fatal());

    let archived = CoreError::RedditApi(RedditApiError::Forbidden {
        resource: "/api/del".to_string(),
    });
    assert!(!archived.is_fatal());
}

#[test]
fn test_user_friendly_messages() {
    let auth_error = CoreError::Auth(AuthError::UserNotFound {
        username: "ghost".to_string(),
    });
    let message = auth_error.user_friendly_message();
    assert!(message.contains("ghost"));
    assert!(message.contains("does not exist"));

    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "item".to_string(),
        value: "posts".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("item"));
    assert!(message.contains("posts"));
}

#[test]
fn test_error_display_carries_cause() {
    let error: CoreError = AuthError::BadPassword.into();
    assert_eq!(
        error.to_string(),
        "Authentication error: Specified an incorrect password"
    );
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new()
        .with_error_reporting(true)
        .with_warning_reporting(true);
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);

    // This test just ensures the methods don't panic
    reporter.report_error(&error);
    reporter.report_warning(&error);
}
