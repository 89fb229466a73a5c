use async_trait::async_trait;
use munchbot_core::config::SearchConfig;
use munchbot_core::SearchResults;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{RestaurantSearch, SearchError};

const TOKEN_PATH: &str = "/oauth2/token";
const SEARCH_PATH: &str = "/v3/businesses/search";

#[derive(Clone, Debug)]
pub struct SearchClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub term: String,
    pub limit: u32,
}

impl From<&SearchConfig> for SearchClientConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            term: config.term.clone(),
            limit: config.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Yelp Fusion style client. Every search fetches its own token; nothing is cached or retried.
#[derive(Clone)]
pub struct YelpClient {
    http: Client,
    config: SearchClientConfig,
}

impl YelpClient {
    pub fn new(config: SearchClientConfig) -> Self {
        Self::with_http_client(Client::new(), config)
    }

    pub fn with_http_client(http: Client, config: SearchClientConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn authenticate(&self) -> Result<SecretString, SearchError> {
        let response = self
            .http
            .post(self.endpoint(TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
            ])
            .send()
            .await
            .map_err(SearchError::Request)?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            warn!(
                event_name = "search.authenticate.rejected",
                status,
                "search provider token endpoint rejected client credentials"
            );
            return Err(SearchError::Authentication { status });
        }

        let token: OAuthTokenResponse = response.json().await.map_err(SearchError::Decode)?;
        if token.access_token.is_empty() {
            return Err(SearchError::EmptyToken);
        }
        debug!(
            event_name = "search.authenticate.succeeded",
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            expires_in = token.expires_in.unwrap_or_default(),
            "search provider token acquired"
        );

        Ok(token.access_token.into())
    }

    pub async fn search_with_token(
        &self,
        token: &SecretString,
        zip: &str,
    ) -> Result<SearchResults, SearchError> {
        let limit = self.config.limit.to_string();
        let response = self
            .http
            .get(self.endpoint(SEARCH_PATH))
            .bearer_auth(token.expose_secret())
            .query(&[
                ("location", zip),
                ("term", self.config.term.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(SearchError::Request)?;

        if !response.status().is_success() {
            return Err(SearchError::Status { status: response.status().as_u16() });
        }

        response.json::<SearchResults>().await.map_err(SearchError::Decode)
    }
}

#[async_trait]
impl RestaurantSearch for YelpClient {
    async fn search(&self, zip: &str) -> Result<SearchResults, SearchError> {
        let token = self.authenticate().await?;
        let results = self.search_with_token(&token, zip).await?;
        debug!(
            event_name = "search.completed",
            result_count = results.len(),
            total = results.total,
            "restaurant search completed"
        );
        Ok(results)
    }
}
