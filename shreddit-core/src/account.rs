use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::CoreError;
use crate::types::{Item, ItemCategory};

/// An authenticated session on the remote account.
///
/// Mutations are issued one at a time; the account is never touched
/// concurrently.
#[async_trait]
pub trait RemoteAccount: Send + Sync {
    /// Name of the logged-in user.
    fn username(&self) -> &str;

    /// The account's history for `category`, in `sort` order.
    ///
    /// The stream is lazy and finite: it ends once the history is exhausted and
    /// cannot be restarted.
    fn items(&self, category: ItemCategory, sort: &str) -> BoxStream<'_, Result<Item, CoreError>>;

    async fn clear_vote(&self, item: &Item) -> Result<(), CoreError>;

    async fn edit(&self, item: &Item, text: &str) -> Result<(), CoreError>;

    async fn delete(&self, item: &Item) -> Result<(), CoreError>;
}
