use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Preference, SourcedArticle, User};

/// Read access to the stored entities, as consumed by the feed and bias views.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn list_preferences_for_user(&self, user_id: i64) -> Result<Vec<Preference>>;

    /// Articles whose topic equals `topic` exactly, joined with their source.
    async fn list_articles_by_topic(&self, topic: &str) -> Result<Vec<SourcedArticle>>;

    /// Every article that still has a source, joined with it.
    async fn list_articles_with_source(&self) -> Result<Vec<SourcedArticle>>;
}
