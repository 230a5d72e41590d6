pub mod api;
pub mod auth;
pub mod rate_limiter;


pub use api::{RedditApiClient, RedditListing, RedditThing};
pub use auth::{required_scopes, PasswordAuthenticator, RedditAuthConfig, RedditToken};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use shreddit_core::{CoreError, Credentials, Item, ItemCategory, RemoteAccount};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Unauthenticated handle to Reddit for one script application.
pub struct RedditClient {
    api: RedditApiClient,
    config: RedditAuthConfig,
}

impl RedditClient {
    pub fn new(config: RedditAuthConfig) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(config.user_agent.clone())?;
        Ok(Self { api, config })
    }

    /// Logs in as `username`, consuming the client.
    ///
    /// Checks the account exists before attempting the password grant so a
    /// typo in the username is reported as such rather than as a bad password.
    pub async fn login(self, username: &str, password: &str) -> Result<RedditSession, CoreError> {
        let authenticator = PasswordAuthenticator::new(
            &self.config,
            self.api.http_client(),
            username.to_string(),
            password.to_string(),
        )?;

        authenticator.check_user_exists().await?;
        let token = authenticator.request_token().await?;
        let me = self.api.get_user_info(&token.access_token).await?;
        debug!("Logged in as u/{}", me.name);

        Ok(RedditSession {
            api: self.api,
            authenticator,
            token: RwLock::new(token),
            username: me.name,
        })
    }
}

/// Logs in with the credentials from the settings file.
pub async fn connect(credentials: &Credentials) -> Result<RedditSession, CoreError> {
    RedditClient::new(RedditAuthConfig::from_credentials(credentials))?
        .login(&credentials.username, &credentials.password)
        .await
}

#[derive(Debug)]
enum Cursor {
    Start,
    After(String),
    Done,
}

/// A logged-in Reddit account.
pub struct RedditSession {
    api: RedditApiClient,
    authenticator: PasswordAuthenticator,
    token: RwLock<RedditToken>,
    username: String,
}

impl RedditSession {
    /// Current bearer token, logging in again when it is about to expire.
    async fn access_token(&self) -> Result<String, CoreError> {
        {
            let token = self.token.read().await;
            if !token.needs_refresh() {
                return Ok(token.access_token.clone());
            }
        }

        let mut token = self.token.write().await;
        if token.needs_refresh() {
            info!("Access token for u/{} is expiring, logging in again", self.username);
            *token = self.authenticator.request_token().await?;
        }
        Ok(token.access_token.clone())
    }

    async fn fetch_page(
        &self,
        category: ItemCategory,
        sort: &str,
        cursor: Cursor,
    ) -> Result<Option<(Vec<Result<Item, CoreError>>, Cursor)>, CoreError> {
        let after = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::After(after) => Some(after),
        };

        let token = self.access_token().await?;
        let listing = self
            .api
            .get_user_items(&token, &self.username, category, sort, after.as_deref())
            .await?;

        let children = listing.data.children;
        if children.is_empty() {
            debug!("Reached the end of u/{}/{}", self.username, category);
            return Ok(None);
        }

        let next = match listing.data.after {
            Some(after) => Cursor::After(after),
            None => Cursor::Done,
        };
        let page = children.into_iter().map(Item::try_from).collect();
        Ok(Some((page, next)))
    }
}

#[async_trait]
impl RemoteAccount for RedditSession {
    fn username(&self) -> &str {
        &self.username
    }

    fn items(&self, category: ItemCategory, sort: &str) -> BoxStream<'_, Result<Item, CoreError>> {
        let sort = sort.to_string();
        stream::try_unfold(Cursor::Start, move |cursor| {
            let sort = sort.clone();
            async move { self.fetch_page(category, &sort, cursor).await }
        })
        .map_ok(stream::iter)
        .try_flatten()
        .boxed()
    }

    async fn clear_vote(&self, item: &Item) -> Result<(), CoreError> {
        let token = self.access_token().await?;
        self.api.clear_vote(&token, &item.fullname()).await
    }

    async fn edit(&self, item: &Item, text: &str) -> Result<(), CoreError> {
        let token = self.access_token().await?;
        self.api.edit_user_text(&token, &item.fullname(), text).await
    }

    async fn delete(&self, item: &Item) -> Result<(), CoreError> {
        let token = self.access_token().await?;
        self.api.delete_thing(&token, &item.fullname()).await
    }
}
