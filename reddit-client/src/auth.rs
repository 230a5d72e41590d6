//! Script-app login: OAuth2 resource-owner password grant.

use oauth2::basic::{BasicClient, BasicErrorResponseType};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use shreddit_core::{AuthError, CoreError, Credentials, RedditApiError};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, warn};

pub const AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const ACCESS_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const PUBLIC_BASE: &str = "https://www.reddit.com";

/// Tokens are renewed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct RedditAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl RedditAuthConfig {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
        }
    }

    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(
            credentials.client_id.clone(),
            credentials.client_secret.clone(),
            credentials.user_agent.clone(),
        )
    }
}

impl std::fmt::Debug for RedditAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    #[cfg(test)]
    pub(crate) fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    pub fn needs_refresh(&self) -> bool {
        SystemTime::now() + REFRESH_MARGIN >= self.expires_at
    }
}

/// Scopes the deletion run needs: identity, history listing, edit/delete and vote.
pub fn required_scopes() -> Vec<&'static str> {
    vec!["identity", "history", "edit", "vote"]
}

/// Failures of the token request that the OAuth2 error body cannot express.
#[derive(Debug, Error)]
pub enum TokenTransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("client credentials rejected")]
    Unauthorized,
}

/// Reddit answers a bad password with `200 {"error": "invalid_grant"}`.
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: serde_json::Value,
}

async fn send_token_request(
    http: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, TokenTransportError> {
    let response = http
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    match status_code.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(TokenTransportError::RateLimited { retry_after });
        }
        401 => return Err(TokenTransportError::Unauthorized),
        _ => {}
    }

    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

pub(crate) type TokenError =
    RequestTokenError<TokenTransportError, oauth2::StandardErrorResponse<BasicErrorResponseType>>;

pub(crate) fn map_token_error(error: TokenError) -> CoreError {
    match error {
        RequestTokenError::ServerResponse(response) => match response.error() {
            BasicErrorResponseType::InvalidGrant => AuthError::BadPassword.into(),
            BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient => {
                AuthError::InvalidClient {
                    reason: response.to_string(),
                }
                .into()
            }
            other => CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Token request failed: {}", other),
            }),
        },
        RequestTokenError::Request(TokenTransportError::RateLimited { retry_after }) => {
            AuthError::RateLimited { retry_after }.into()
        }
        RequestTokenError::Request(TokenTransportError::Unauthorized) => AuthError::InvalidClient {
            reason: "client_id or client_secret rejected".to_string(),
        }
        .into(),
        RequestTokenError::Request(TokenTransportError::Http(e)) => CoreError::Network(e),
        RequestTokenError::Parse(_, body) => {
            match serde_json::from_slice::<TokenErrorBody>(&body) {
                Ok(parsed) if parsed.error.as_str() == Some("invalid_grant") => {
                    AuthError::BadPassword.into()
                }
                Ok(parsed) => CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Token request failed: {}", parsed.error),
                }),
                Err(_) => CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: "Unparseable token response".to_string(),
                }),
            }
        }
        RequestTokenError::Other(message) => {
            CoreError::RedditApi(RedditApiError::InvalidResponse { details: message })
        }
    }
}

/// Logs one account in with its username and password.
pub struct PasswordAuthenticator {
    oauth: BasicClient,
    http: reqwest::Client,
    username: String,
    password: String,
}

impl PasswordAuthenticator {
    pub fn new(
        config: &RedditAuthConfig,
        http: reqwest::Client,
        username: String,
        password: String,
    ) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(AUTHORIZE_URL.to_string()).map_err(|e| CoreError::Internal {
            message: format!("Invalid authorization URL: {}", e),
        })?;
        let token_url =
            TokenUrl::new(ACCESS_TOKEN_URL.to_string()).map_err(|e| CoreError::Internal {
                message: format!("Invalid token URL: {}", e),
            })?;

        let oauth = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            oauth,
            http,
            username,
            password,
        })
    }

    /// Fails with `UserNotFound` when Reddit has no such account.
    pub async fn check_user_exists(&self) -> Result<(), CoreError> {
        let url = format!("{}/user/{}/about.json", PUBLIC_BASE, self.username);
        let response = self.http.get(&url).send().await?;

        match response.status().as_u16() {
            404 => Err(AuthError::UserNotFound {
                username: self.username.clone(),
            }
            .into()),
            429 => Err(AuthError::RateLimited { retry_after: 60 }.into()),
            code if !response.status().is_success() => {
                // Suspended or shadow-banned accounts still get to try the grant.
                warn!("User lookup for {} returned {}", self.username, code);
                Ok(())
            }
            _ => {
                debug!("User {} exists", self.username);
                Ok(())
            }
        }
    }

    pub async fn request_token(&self) -> Result<RedditToken, CoreError> {
        let username = ResourceOwnerUsername::new(self.username.clone());
        let password = ResourceOwnerPassword::new(self.password.clone());
        let http = self.http.clone();

        let token = self
            .oauth
            .exchange_password(&username, &password)
            .add_scopes(required_scopes().into_iter().map(|s| Scope::new(s.to_string())))
            .request_async(|request| send_token_request(http, request))
            .await
            .map_err(map_token_error)?;

        let lifetime = token.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let scope = token
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        debug!("Obtained access token for {}", self.username);
        Ok(RedditToken {
            access_token: token.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope,
        })
    }
}
