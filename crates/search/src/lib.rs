//! Restaurant search provider integration.
//!
//! - **Client** (`client`) - client-credentials OAuth plus `/v3/businesses/search`
//!
//! The flow controller only sees the `RestaurantSearch` trait so tests can swap in a fake.

pub mod client;

use async_trait::async_trait;
use munchbot_core::SearchResults;
use thiserror::Error;

pub use client::{SearchClientConfig, YelpClient};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search provider request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("search provider rejected client credentials with status {status}")]
    Authentication { status: u16 },
    #[error("search provider returned an empty access token")]
    EmptyToken,
    #[error("search endpoint returned status {status}")]
    Status { status: u16 },
    #[error("failed to decode search provider response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl SearchError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::EmptyToken)
    }
}

#[async_trait]
pub trait RestaurantSearch: Send + Sync {
    async fn search(&self, zip: &str) -> Result<SearchResults, SearchError>;
}
