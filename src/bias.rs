//! Political-bias analytics over the article/source join.
//!
//! Both summaries are built in a single pass over the joined rows. Leaning and
//! tone are folded to lowercase when used as grouping keys, so case variants
//! collapse into one bucket.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::grouping::{canonical_key, ToneCount, ToneTally};
use crate::store::EntityStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaningBias {
    pub political_leaning: String,
    pub total_articles: i64,
    pub by_tone: Vec<ToneCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasSummary {
    pub total_articles: i64,
    pub by_leaning: Vec<LeaningBias>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBias {
    pub source_id: i64,
    pub name: String,
    pub political_leaning: String,
    pub total_articles: i64,
    pub by_tone: Vec<ToneCount>,
}

/// Count articles per (leaning, tone), ordered by leaning then tone.
pub async fn summarize_by_leaning<S>(store: &S) -> Result<BiasSummary>
where
    S: EntityStore + ?Sized,
{
    let rows = store.list_articles_with_source().await?;

    let mut by_leaning: BTreeMap<String, ToneTally> = BTreeMap::new();
    for row in &rows {
        by_leaning
            .entry(canonical_key(&row.political_leaning))
            .or_default()
            .record(&row.tone);
    }

    let by_leaning: Vec<LeaningBias> = by_leaning
        .into_iter()
        .map(|(political_leaning, tally)| LeaningBias {
            political_leaning,
            total_articles: tally.total(),
            by_tone: tally.into_counts(),
        })
        .collect();
    let total_articles: i64 = by_leaning.iter().map(|l| l.total_articles).sum();

    debug!(
        "Bias summary: {} articles across {} leanings",
        total_articles,
        by_leaning.len()
    );

    Ok(BiasSummary {
        total_articles,
        by_leaning,
    })
}

struct SourceGroup {
    name: String,
    political_leaning: String,
    tally: ToneTally,
}

/// Count articles per (source, tone), ordered by source name then tone.
///
/// Sources without articles never appear.
pub async fn summarize_by_source<S>(store: &S) -> Result<Vec<SourceBias>>
where
    S: EntityStore + ?Sized,
{
    let rows = store.list_articles_with_source().await?;

    let mut by_source: BTreeMap<i64, SourceGroup> = BTreeMap::new();
    for row in rows {
        by_source
            .entry(row.source_id)
            .or_insert_with(|| SourceGroup {
                name: row.source_name,
                political_leaning: row.political_leaning,
                tally: ToneTally::default(),
            })
            .tally
            .record(&row.tone);
    }

    let mut summaries: Vec<SourceBias> = by_source
        .into_iter()
        .map(|(source_id, group)| SourceBias {
            source_id,
            name: group.name,
            political_leaning: group.political_leaning,
            total_articles: group.tally.total(),
            by_tone: group.tally.into_counts(),
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.source_id.cmp(&b.source_id)));

    debug!("Bias by source: {} sources with articles", summaries.len());

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::testing::FakeStore;

    fn tone(tone: &str, count: i64) -> ToneCount {
        ToneCount {
            tone: tone.to_string(),
            count,
        }
    }

    fn mixed_store() -> FakeStore {
        FakeStore::default()
            .source(1, "Euro Daily", "pro-eu")
            .source(2, "Moscow Wire", "pro-russia")
            .source(3, "Alpine Times", "Pro-EU")
            .source(4, "Empty Gazette", "neutral")
            .article(1, 1, Some("climate"), "neutral", 1)
            .article(2, 1, Some("climate"), "positive", 2)
            .article(3, 2, Some("war"), "sensationalist", 3)
            .article(4, 2, None, "Sensationalist", 4)
            .article(5, 3, Some("energy"), "Neutral", 5)
            .article(6, 99, Some("energy"), "negative", 6)
    }

    mod leaning_tests {
        use super::*;

        #[tokio::test]
        async fn test_scenario_single_source() {
            let store = FakeStore::default()
                .source(1, "Euro Daily", "pro-eu")
                .article(1, 1, Some("climate"), "neutral", 1)
                .article(2, 1, Some("climate"), "positive", 2);

            let summary = summarize_by_leaning(&store).await.unwrap();

            assert_eq!(
                summary,
                BiasSummary {
                    total_articles: 2,
                    by_leaning: vec![LeaningBias {
                        political_leaning: "pro-eu".to_string(),
                        total_articles: 2,
                        by_tone: vec![tone("neutral", 1), tone("positive", 1)],
                    }],
                }
            );
        }

        #[tokio::test]
        async fn test_case_variants_collapse_into_one_bucket() {
            let summary = summarize_by_leaning(&mixed_store()).await.unwrap();

            let leanings: Vec<&str> = summary
                .by_leaning
                .iter()
                .map(|l| l.political_leaning.as_str())
                .collect();
            assert_eq!(leanings, vec!["pro-eu", "pro-russia"]);

            assert_eq!(
                summary.by_leaning[0].by_tone,
                vec![tone("neutral", 2), tone("positive", 1)]
            );
            assert_eq!(summary.by_leaning[0].total_articles, 3);
            assert_eq!(
                summary.by_leaning[1].by_tone,
                vec![tone("sensationalist", 2)]
            );
        }

        #[tokio::test]
        async fn test_total_counts_only_articles_with_a_source() {
            let summary = summarize_by_leaning(&mixed_store()).await.unwrap();

            // Article 6 points at a missing source.
            assert_eq!(summary.total_articles, 5);
            let bucket_sum: i64 = summary
                .by_leaning
                .iter()
                .flat_map(|l| l.by_tone.iter())
                .map(|t| t.count)
                .sum();
            assert_eq!(bucket_sum, summary.total_articles);
        }

        #[tokio::test]
        async fn test_empty_store() {
            let summary = summarize_by_leaning(&FakeStore::default()).await.unwrap();

            assert_eq!(summary.total_articles, 0);
            assert!(summary.by_leaning.is_empty());
        }

        #[tokio::test]
        async fn test_repeated_calls_are_identical() {
            let store = mixed_store();

            let first = summarize_by_leaning(&store).await.unwrap();
            let second = summarize_by_leaning(&store).await.unwrap();
            assert_eq!(first, second);
        }

        #[tokio::test]
        async fn test_store_failure_propagates() {
            let store = mixed_store().unavailable();

            let result = summarize_by_leaning(&store).await;
            assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        }
    }

    mod source_tests {
        use super::*;

        #[tokio::test]
        async fn test_groups_per_source_ordered_by_name() {
            let summaries = summarize_by_source(&mixed_store()).await.unwrap();

            assert_eq!(
                summaries,
                vec![
                    SourceBias {
                        source_id: 3,
                        name: "Alpine Times".to_string(),
                        political_leaning: "Pro-EU".to_string(),
                        total_articles: 1,
                        by_tone: vec![tone("neutral", 1)],
                    },
                    SourceBias {
                        source_id: 1,
                        name: "Euro Daily".to_string(),
                        political_leaning: "pro-eu".to_string(),
                        total_articles: 2,
                        by_tone: vec![tone("neutral", 1), tone("positive", 1)],
                    },
                    SourceBias {
                        source_id: 2,
                        name: "Moscow Wire".to_string(),
                        political_leaning: "pro-russia".to_string(),
                        total_articles: 2,
                        by_tone: vec![tone("sensationalist", 2)],
                    },
                ]
            );
        }

        #[tokio::test]
        async fn test_sources_without_articles_are_omitted() {
            let summaries = summarize_by_source(&mixed_store()).await.unwrap();

            assert!(summaries.iter().all(|s| s.name != "Empty Gazette"));
            assert!(summaries.iter().all(|s| s.total_articles > 0));
        }

        #[tokio::test]
        async fn test_same_name_sources_stay_separate() {
            let store = FakeStore::default()
                .source(7, "Daily", "neutral")
                .source(3, "Daily", "unknown")
                .article(1, 7, None, "neutral", 1)
                .article(2, 3, None, "negative", 2);

            let summaries = summarize_by_source(&store).await.unwrap();

            let ids: Vec<i64> = summaries.iter().map(|s| s.source_id).collect();
            assert_eq!(ids, vec![3, 7]);
        }

        #[tokio::test]
        async fn test_empty_store() {
            let summaries = summarize_by_source(&FakeStore::default()).await.unwrap();
            assert!(summaries.is_empty());
        }

        #[tokio::test]
        async fn test_store_failure_propagates() {
            let store = mixed_store().unavailable();

            let result = summarize_by_source(&store).await;
            assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        }
    }
}
