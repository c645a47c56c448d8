use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fold a leaning or tone to the form used as a grouping key.
pub fn canonical_key(value: &str) -> String {
    value.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToneCount {
    pub tone: String,
    pub count: i64,
}

/// Article counts per folded tone, kept in ascending tone order.
#[derive(Debug, Default, Clone)]
pub struct ToneTally(BTreeMap<String, i64>);

impl ToneTally {
    pub fn record(&mut self, tone: &str) {
        *self.0.entry(canonical_key(tone)).or_insert(0) += 1;
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    pub fn into_counts(self) -> Vec<ToneCount> {
        self.0
            .into_iter()
            .map(|(tone, count)| ToneCount { tone, count })
            .collect()
    }
}

/// Sort by timestamp descending, breaking ties by id descending.
pub fn sort_newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (DateTime<Utc>, i64),
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}
