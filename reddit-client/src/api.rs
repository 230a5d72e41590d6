use crate::rate_limiter::{RateLimitConfig, RateLimiter, ServerBudget};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use shreddit_core::{
    Comment, CoreError, Item, ItemCategory, Post, RedditApiError, VoteState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Largest page Reddit serves for listings.
pub const LISTING_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<T>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

/// A child of a user history listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum RedditThing {
    #[serde(rename = "t1")]
    Comment(RedditCommentData),
    #[serde(rename = "t3")]
    Link(RedditPostData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub likes: Option<bool>,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    pub subreddit: String,
    pub body: String,
    #[serde(default)]
    pub link_id: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub likes: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub id: String,
    pub name: String,
    pub created_utc: f64,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
}

#[derive(Debug, Deserialize)]
struct JsonApiResponse {
    json: JsonApiBody,
}

#[derive(Debug, Deserialize)]
struct JsonApiBody {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
}

fn timestamp(created_utc: f64) -> Result<DateTime<Utc>, CoreError> {
    Utc.timestamp_opt(created_utc as i64, 0)
        .single()
        .ok_or_else(|| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Invalid created_utc timestamp: {}", created_utc),
            })
        })
}

impl TryFrom<RedditThing> for Item {
    type Error = CoreError;

    fn try_from(thing: RedditThing) -> Result<Self, Self::Error> {
        match thing {
            RedditThing::Comment(data) => Ok(Item::Comment(Comment {
                created_utc: timestamp(data.created_utc)?,
                vote: VoteState::from(data.likes),
                id: data.id,
                subreddit: data.subreddit,
                body: data.body,
            })),
            RedditThing::Link(data) => Ok(Item::Post(Post {
                created_utc: timestamp(data.created_utc)?,
                vote: VoteState::from(data.likes),
                id: data.id,
                subreddit: data.subreddit,
                title: data.title,
                url: data.url,
            })),
        }
    }
}

fn retry_after_secs(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::reddit_oauth())),
        })
    }

    /// The underlying HTTP client, shared with the login flow.
    pub fn http_client(&self) -> Client {
        self.http_client.clone()
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);

        let waited = self.rate_limiter.acquire_permit().await;
        debug!("Acquired rate limit permit for {} {} after {:?}", method, endpoint, waited);

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        if let Some(budget) = ServerBudget::from_headers(response.headers()) {
            self.rate_limiter.observe(budget).await;
        }

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let api_error = match status.as_u16() {
            429 => {
                let retry_after = retry_after_secs(&response);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => RedditApiError::NotFound {
                resource: endpoint.to_string(),
            },
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => RedditApiError::InvalidResponse {
                details: format!("Unexpected status {} for {}", code, endpoint),
            },
        };
        Err(CoreError::RedditApi(api_error))
    }

    pub async fn get_user_info(&self, access_token: &str) -> Result<RedditUserData, CoreError> {
        let response = self
            .make_request(Method::GET, "/api/v1/me", access_token, None, None)
            .await?;

        let user_data: RedditUserData = response.json().await.map_err(|e| {
            error!("Failed to parse user data: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "Failed to parse user data".to_string(),
            })
        })?;

        debug!("Retrieved user info for: {}", user_data.name);
        Ok(user_data)
    }

    /// One page of the user's comments, submissions or overview.
    pub async fn get_user_items(
        &self,
        access_token: &str,
        username: &str,
        category: ItemCategory,
        sort: &str,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditThing>, CoreError> {
        let endpoint = format!("/user/{}/{}", username, category.as_path());
        let limit = LISTING_PAGE_SIZE.to_string();
        let mut params = vec![("sort", sort), ("limit", limit.as_str()), ("raw_json", "1")];
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(params.as_slice()), None)
            .await?;

        let listing: RedditListing<RedditThing> = response.json().await.map_err(|e| {
            error!("Failed to parse user listing: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse {} for u/{}", category, username),
            })
        })?;

        debug!(
            "Retrieved {} items from u/{}/{}",
            listing.data.children.len(),
            username,
            category
        );
        Ok(listing)
    }

    /// Resets the account's vote on `fullname` to neutral.
    pub async fn clear_vote(&self, access_token: &str, fullname: &str) -> Result<(), CoreError> {
        self.make_request(
            Method::POST,
            "/api/vote",
            access_token,
            None,
            Some(&[("id", fullname), ("dir", "0")]),
        )
        .await?;
        Ok(())
    }

    pub async fn edit_user_text(
        &self,
        access_token: &str,
        fullname: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let response = self
            .make_request(
                Method::POST,
                "/api/editusertext",
                access_token,
                None,
                Some(&[("thing_id", fullname), ("text", text), ("api_type", "json")]),
            )
            .await?;

        let body: JsonApiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse edit response: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse edit response for {}", fullname),
            })
        })?;

        if !body.json.errors.is_empty() {
            let reason = body
                .json
                .errors
                .iter()
                .map(|e| {
                    e.iter()
                        .filter_map(|part| part.as_str())
                        .collect::<Vec<_>>()
                        .join(": ")
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CoreError::RedditApi(RedditApiError::MutationRejected {
                operation: "edit".to_string(),
                id: fullname.to_string(),
                reason,
            }));
        }
        Ok(())
    }

    pub async fn delete_thing(&self, access_token: &str, fullname: &str) -> Result<(), CoreError> {
        self.make_request(
            Method::POST,
            "/api/del",
            access_token,
            None,
            Some(&[("id", fullname)]),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_creation() {
        assert!(RedditApiClient::new("test-user-agent/1.0".to_string()).is_ok());
    }

    #[test]
    fn test_comment_conversion() {
        let thing = RedditThing::Comment(RedditCommentData {
            id: "c0ffee".to_string(),
            subreddit: "rust".to_string(),
            body: "This is test content".to_string(),
            link_id: "t3_abc".to_string(),
            permalink: "/r/rust/comments/abc/_/c0ffee".to_string(),
            created_utc: 1640995200.0,
            likes: Some(true),
        });

        let item = Item::try_from(thing).unwrap();
        assert_eq!(item.id(), "c0ffee");
        assert_eq!(item.fullname(), "t1_c0ffee");
        assert_eq!(item.vote(), VoteState::Upvoted);
        assert_eq!(item.created_at().timestamp(), 1640995200);
    }

    #[test]
    fn test_post_conversion() {
        let thing = RedditThing::Link(RedditPostData {
            id: "test123".to_string(),
            title: "Test Post".to_string(),
            subreddit: "test".to_string(),
            url: "https://reddit.com/r/test/comments/test123".to_string(),
            permalink: "/r/test/comments/test123".to_string(),
            created_utc: 1640995200.0,
            likes: None,
            is_self: true,
        });

        match Item::try_from(thing).unwrap() {
            Item::Post(post) => {
                assert_eq!(post.id, "test123");
                assert_eq!(post.title, "Test Post");
                assert_eq!(post.vote, VoteState::None);
            }
            other => panic!("expected a post, got {:?}", other),
        }
    }
}
