//! Stored entities and the request payloads that create or replace them.
//!
//! Requests are normalized and validated in one step: `validate` consumes the
//! raw payload and returns the row values ready to be written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{Error, Result};

pub const POLITICAL_LEANINGS: &[&str] = &["pro-eu", "pro-russia", "neutral", "unknown"];

pub const TONES: &[&str] = &["positive", "negative", "neutral", "sensationalist", "unknown"];

pub const FACTUALITY_LEVELS: &[&str] =
    &["factual", "mixed", "opinion", "propaganda", "tabloid", "unknown"];

pub const POLITICAL_PREFERENCES: &[&str] = &["none", "pro-eu", "pro-russia", "neutral", "unknown"];

const MAX_USER_FIELD_CHARS: usize = 200;
const MAX_TOPIC_CHARS: usize = 100;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub category: Option<String>,
    pub is_active: bool,
    pub political_leaning: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub topic: Option<String>,
    pub tone: String,
    pub factuality_level: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub political_preference: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    pub id: i64,
    pub user_id: i64,
    pub topic: Option<String>,
}

/// An article row joined with the source that owns it.
#[derive(Debug, Clone, FromRow)]
pub struct SourcedArticle {
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

/// Trim a free-text value, treating blank input as absent.
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim and lowercase an enumerated value, falling back when blank.
fn folded_or(value: Option<String>, fallback: &str) -> String {
    trimmed(value)
        .map(|v| v.to_lowercase())
        .unwrap_or_else(|| fallback.to_string())
}

fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub political_leaning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSource {
    pub name: String,
    pub url: String,
    pub category: Option<String>,
    pub is_active: bool,
    pub political_leaning: String,
}

impl SourceRequest {
    pub fn validate(self) -> Result<NewSource> {
        let name = trimmed(self.name).unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Invalid("Name is required.".into()));
        }

        let url = trimmed(self.url).unwrap_or_default();
        if url.is_empty() {
            return Err(Error::Invalid("Url is required.".into()));
        }

        let political_leaning = folded_or(self.political_leaning, "unknown");
        if !POLITICAL_LEANINGS.contains(&political_leaning.as_str()) {
            return Err(Error::Invalid(
                "Invalid PoliticalLeaning. Allowed values: pro-eu, pro-russia, neutral, unknown."
                    .into(),
            ));
        }

        Ok(NewSource {
            name,
            url,
            category: self.category.map(|c| c.trim().to_string()),
            is_active: self.is_active.unwrap_or(true),
            political_leaning,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRequest {
    #[serde(default)]
    pub source_id: i64,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub topic: Option<String>,
    pub tone: Option<String>,
    pub factuality_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub source_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub topic: Option<String>,
    pub tone: String,
    pub factuality_level: String,
}

impl ArticleRequest {
    pub fn validate(self) -> Result<NewArticle> {
        if self.source_id <= 0 {
            return Err(Error::Invalid(
                "SourceId must be a positive integer.".into(),
            ));
        }

        let title = trimmed(self.title).unwrap_or_default();
        if title.is_empty() {
            return Err(Error::Invalid("Title is required.".into()));
        }

        let tone = folded_or(self.tone, "unknown");
        if !TONES.contains(&tone.as_str()) {
            return Err(Error::Invalid(
                "Invalid Tone. Allowed values: positive, negative, neutral, sensationalist, unknown."
                    .into(),
            ));
        }

        let factuality_level = folded_or(self.factuality_level, "unknown");
        if !FACTUALITY_LEVELS.contains(&factuality_level.as_str()) {
            return Err(Error::Invalid(
                "Invalid Factuality Level. Allowed values: factual, mixed, opinion, propaganda, tabloid, unknown."
                    .into(),
            ));
        }

        Ok(NewArticle {
            source_id: self.source_id,
            title,
            summary: trimmed(self.summary),
            content: trimmed(self.content),
            url: trimmed(self.url),
            published_at: self.published_at,
            topic: trimmed(self.topic),
            tone,
            factuality_level,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub political_preference: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub political_preference: String,
}

impl UserRequest {
    pub fn validate(self) -> Result<NewUser> {
        let name = trimmed(self.name).unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Invalid("Name is required.".into()));
        }
        if name.chars().count() > MAX_USER_FIELD_CHARS {
            return Err(Error::Invalid("Name must be maximum 200 chars.".into()));
        }

        let email = trimmed(self.email).unwrap_or_default().to_lowercase();
        if email.is_empty() {
            return Err(Error::Invalid("Email is required.".into()));
        }
        if !is_well_formed_email(&email) {
            return Err(Error::Invalid("Invalid email format.".into()));
        }
        if email.chars().count() > MAX_USER_FIELD_CHARS {
            return Err(Error::Invalid("Email must be maximum 200 chars.".into()));
        }

        let political_preference = folded_or(self.political_preference, "none");
        if !POLITICAL_PREFERENCES.contains(&political_preference.as_str()) {
            return Err(Error::Invalid(
                "Invalid PoliticalPreference. Allowed values: none, pro-eu, pro-russia, neutral, unknown."
                    .into(),
            ));
        }

        Ok(NewUser {
            name,
            email,
            political_preference,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PreferenceRequest {
    pub topic: Option<String>,
}

impl PreferenceRequest {
    /// Returns the trimmed topic to store.
    pub fn validate(self) -> Result<String> {
        let topic =
            trimmed(self.topic).ok_or_else(|| Error::Invalid("Topic is required.".into()))?;
        if topic.chars().count() > MAX_TOPIC_CHARS {
            return Err(Error::Invalid("Topic must be maximum 100 chars.".into()));
        }
        Ok(topic)
    }
}
