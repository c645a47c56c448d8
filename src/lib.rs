//! News Platform - a news-aggregation backend
//!
//! This crate stores news sources, articles, users and their topic preferences,
//! and derives two views from them: a personalized feed per user and
//! political-bias analytics across sources and tones.

pub mod bias;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod grouping;
pub mod model;
pub mod routes;
pub mod store;
