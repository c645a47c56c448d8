//! Per-user article feed.
//!
//! A feed is every article whose topic exactly matches one of the user's
//! preference topics, enriched with its source, newest first. Topic matching
//! is case-sensitive equality; absent or empty preference topics match nothing.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::grouping::sort_newest_first;
use crate::model::SourcedArticle;
use crate::store::EntityStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub topic: Option<String>,
    pub tone: String,
    pub factuality_level: String,
    pub source_id: i64,
    pub source_name: String,
    pub political_leaning: String,
}

impl From<SourcedArticle> for FeedEntry {
    fn from(article: SourcedArticle) -> Self {
        Self {
            id: article.id,
            title: article.title,
            summary: article.summary,
            url: article.url,
            published_at: article.published_at,
            topic: article.topic,
            tone: article.tone,
            factuality_level: article.factuality_level,
            source_id: article.source_id,
            source_name: article.source_name,
            political_leaning: article.political_leaning,
        }
    }
}

/// Articles matching any of the user's topics, newest first with ties by id
/// descending. Fails with `NotFound` when the user does not exist.
pub async fn compose_feed<S>(store: &S, user_id: i64) -> Result<Vec<FeedEntry>>
where
    S: EntityStore + ?Sized,
{
    if store.find_user_by_id(user_id).await?.is_none() {
        return Err(Error::NotFound(format!(
            "AppUser with Id={} not found.",
            user_id
        )));
    }

    let preferences = store.list_preferences_for_user(user_id).await?;
    let topics: BTreeSet<String> = preferences
        .into_iter()
        .filter_map(|p| p.topic)
        .filter(|t| !t.is_empty())
        .collect();

    // An article can match through several preferences.
    let mut by_id: HashMap<i64, FeedEntry> = HashMap::new();
    for topic in &topics {
        for article in store.list_articles_by_topic(topic).await? {
            by_id.entry(article.id).or_insert_with(|| article.into());
        }
    }

    let mut feed: Vec<FeedEntry> = by_id.into_values().collect();
    sort_newest_first(&mut feed, |entry| (entry.published_at, entry.id));

    debug!(
        "Composed feed for user {}: {} topics, {} articles",
        user_id,
        topics.len(),
        feed.len()
    );

    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{at_hour, FakeStore};

    fn ids(feed: &[FeedEntry]) -> Vec<i64> {
        feed.iter().map(|e| e.id).collect()
    }

    fn euro_daily() -> FakeStore {
        FakeStore::default()
            .source(1, "Euro Daily", "pro-eu")
            .source(2, "Moscow Wire", "pro-russia")
    }

    mod lookup_tests {
        use super::*;

        #[tokio::test]
        async fn test_unknown_user_is_not_found() {
            let store = euro_daily().article(1, 1, Some("climate"), "neutral", 1);

            let result = compose_feed(&store, 42).await;

            match result {
                Err(Error::NotFound(message)) => {
                    assert_eq!(message, "AppUser with Id=42 not found.")
                }
                other => panic!("expected NotFound, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_user_without_preferences_gets_empty_feed() {
            let store = euro_daily()
                .article(1, 1, Some("climate"), "neutral", 1)
                .user(1);

            let feed = compose_feed(&store, 1).await.unwrap();
            assert!(feed.is_empty());
        }

        #[tokio::test]
        async fn test_unmatched_topic_gets_empty_feed() {
            let store = euro_daily()
                .article(1, 1, Some("climate"), "neutral", 1)
                .user(1)
                .preference(1, 1, Some("sports"));

            let feed = compose_feed(&store, 1).await.unwrap();
            assert!(feed.is_empty());
        }

        #[tokio::test]
        async fn test_store_failure_propagates() {
            let store = euro_daily().user(1).unavailable();

            let result = compose_feed(&store, 1).await;
            assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        }
    }

    mod matching_tests {
        use super::*;

        #[tokio::test]
        async fn test_scenario_both_climate_articles_newest_first() {
            let store = euro_daily()
                .article(1, 1, Some("climate"), "neutral", 1)
                .article(2, 1, Some("climate"), "positive", 5)
                .user(1)
                .preference(1, 1, Some("climate"));

            let feed = compose_feed(&store, 1).await.unwrap();

            assert_eq!(ids(&feed), vec![2, 1]);
            assert_eq!(feed[0].source_name, "Euro Daily");
            assert_eq!(feed[0].political_leaning, "pro-eu");
            assert_eq!(feed[0].published_at, at_hour(5));
        }

        #[tokio::test]
        async fn test_topic_match_is_case_sensitive() {
            let store = euro_daily()
                .article(1, 1, Some("Climate"), "neutral", 1)
                .article(2, 1, Some("climate"), "neutral", 2)
                .article(3, 1, Some("climate "), "neutral", 3)
                .user(1)
                .preference(1, 1, Some("climate"));

            let feed = compose_feed(&store, 1).await.unwrap();
            assert_eq!(ids(&feed), vec![2]);
        }

        #[tokio::test]
        async fn test_absent_preference_topic_is_not_a_wildcard() {
            let store = euro_daily()
                .article(1, 1, Some("climate"), "neutral", 1)
                .article(2, 1, None, "neutral", 2)
                .user(1)
                .preference(1, 1, None)
                .preference(2, 1, Some(""));

            let feed = compose_feed(&store, 1).await.unwrap();
            assert!(feed.is_empty());
        }

        #[tokio::test]
        async fn test_only_own_preferences_are_used() {
            let store = euro_daily()
                .article(1, 1, Some("climate"), "neutral", 1)
                .article(2, 2, Some("energy"), "negative", 2)
                .user(1)
                .user(2)
                .preference(1, 1, Some("climate"))
                .preference(2, 2, Some("energy"));

            assert_eq!(ids(&compose_feed(&store, 1).await.unwrap()), vec![1]);
            assert_eq!(ids(&compose_feed(&store, 2).await.unwrap()), vec![2]);
        }

        #[tokio::test]
        async fn test_every_entry_matches_a_preference_topic() {
            let store = euro_daily()
                .article(1, 1, Some("climate"), "neutral", 1)
                .article(2, 2, Some("energy"), "negative", 2)
                .article(3, 2, Some("war"), "sensationalist", 3)
                .article(4, 1, Some("energy"), "positive", 4)
                .user(1)
                .preference(1, 1, Some("climate"))
                .preference(2, 1, Some("energy"));

            let feed = compose_feed(&store, 1).await.unwrap();

            assert_eq!(ids(&feed), vec![4, 2, 1]);
            for entry in &feed {
                let topic = entry.topic.as_deref().unwrap();
                assert!(topic == "climate" || topic == "energy");
            }
        }
    }

    mod dedup_and_order_tests {
        use super::*;

        #[tokio::test]
        async fn test_duplicate_preference_topics_do_not_duplicate_articles() {
            let store = euro_daily()
                .article(1, 1, Some("climate"), "neutral", 1)
                .article(2, 2, Some("climate"), "negative", 2)
                .user(1)
                .preference(1, 1, Some("climate"))
                .preference(2, 1, Some("climate"))
                .preference(3, 1, Some("climate"));

            let feed = compose_feed(&store, 1).await.unwrap();
            assert_eq!(ids(&feed), vec![2, 1]);
        }

        #[tokio::test]
        async fn test_orphaned_articles_are_excluded() {
            let store = euro_daily()
                .article(1, 1, Some("climate"), "neutral", 1)
                .article(2, 99, Some("climate"), "neutral", 2)
                .user(1)
                .preference(1, 1, Some("climate"));

            let feed = compose_feed(&store, 1).await.unwrap();
            assert_eq!(ids(&feed), vec![1]);
        }

        #[tokio::test]
        async fn test_equal_timestamps_break_ties_by_id_descending() {
            let store = euro_daily()
                .article(3, 1, Some("climate"), "neutral", 7)
                .article(9, 2, Some("climate"), "neutral", 7)
                .article(5, 1, Some("climate"), "neutral", 7)
                .article(1, 1, Some("climate"), "neutral", 8)
                .user(1)
                .preference(1, 1, Some("climate"));

            let feed = compose_feed(&store, 1).await.unwrap();

            assert_eq!(ids(&feed), vec![1, 9, 5, 3]);
            for pair in feed.windows(2) {
                assert!(pair[0].published_at >= pair[1].published_at);
            }
        }
    }
}
