use async_trait::async_trait;
use munchbot_core::config::WorkspaceConfig;
use munchbot_core::ApplicationError;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::messages::OutboundMessage;

const TOKEN_PATH: &str = "/oauth/token";

#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("workspace request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("workspace rejected app credentials with status {status}")]
    Authentication { status: u16 },
    #[error("workspace returned an empty access token")]
    EmptyToken,
    #[error("workspace message post returned status {status}, expected 201")]
    UnexpectedStatus { status: u16 },
    #[error("workspace base url cannot address a space: {0}")]
    InvalidUrl(String),
}

impl From<MessengerError> for ApplicationError {
    fn from(error: MessengerError) -> Self {
        match error {
            MessengerError::Authentication { .. } | MessengerError::EmptyToken => {
                Self::Authentication(error.to_string())
            }
            MessengerError::Request(_)
            | MessengerError::UnexpectedStatus { .. }
            | MessengerError::InvalidUrl(_) => {
                Self::Integration(error.to_string())
            }
        }
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Posts `text` into `space_id` as a single titled card.
    async fn send(&self, space_id: &str, text: &str) -> Result<(), MessengerError>;
}

#[derive(Clone, Debug)]
pub struct WorkspaceClientConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_secret: SecretString,
    pub message_title: String,
    pub message_color: String,
}

impl From<&WorkspaceConfig> for WorkspaceClientConfig {
    fn from(config: &WorkspaceConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            message_title: config.message_title.clone(),
            message_color: config.message_color.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Every send runs its own client-credentials exchange; tokens are not cached.
#[derive(Clone)]
pub struct WorkspaceClient {
    http: Client,
    config: WorkspaceClientConfig,
}

impl WorkspaceClient {
    pub fn new(config: WorkspaceClientConfig) -> Self {
        Self::with_http_client(Client::new(), config)
    }

    pub fn with_http_client(http: Client, config: WorkspaceClientConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// `{base}/v1/spaces/{space_id}/messages` with the space id as one escaped segment.
    fn messages_url(&self, space_id: &str) -> Result<Url, MessengerError> {
        let mut url = Url::parse(&self.endpoint("/v1/spaces"))
            .map_err(|error| MessengerError::InvalidUrl(error.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| MessengerError::InvalidUrl(self.config.base_url.clone()))?
            .push(space_id)
            .push("messages");
        Ok(url)
    }

    pub async fn authenticate(&self) -> Result<SecretString, MessengerError> {
        let response = self
            .http
            .post(self.endpoint(TOKEN_PATH))
            .basic_auth(&self.config.app_id, Some(self.config.app_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(MessengerError::Request)?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            warn!(
                event_name = "workspace.authenticate.rejected",
                status, "workspace token endpoint rejected app credentials"
            );
            return Err(MessengerError::Authentication { status });
        }

        let token: AppTokenResponse = response.json().await.map_err(MessengerError::Request)?;
        if token.access_token.is_empty() {
            return Err(MessengerError::EmptyToken);
        }
        debug!(
            event_name = "workspace.authenticate.succeeded",
            expires_in = token.expires_in.unwrap_or_default(),
            "workspace app token acquired"
        );

        Ok(token.access_token.into())
    }

    pub async fn post_message(
        &self,
        token: &SecretString,
        space_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), MessengerError> {
        let url = self.messages_url(space_id)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(message)
            .send()
            .await
            .map_err(MessengerError::Request)?;

        if response.status() != StatusCode::CREATED {
            return Err(MessengerError::UnexpectedStatus { status: response.status().as_u16() });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for WorkspaceClient {
    async fn send(&self, space_id: &str, text: &str) -> Result<(), MessengerError> {
        let token = self.authenticate().await?;
        let message = OutboundMessage::generic(
            self.config.message_title.as_str(),
            self.config.message_color.as_str(),
            text,
        );
        self.post_message(&token, space_id, &message).await?;
        debug!(event_name = "workspace.message.sent", space_id, "message posted to space");
        Ok(())
    }
}
