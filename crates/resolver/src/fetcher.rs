//! Where UI resource definitions come from.

use async_trait::async_trait;
use tracing::debug;

use orderchat_config::UiConfig;
use orderchat_core::ui::UiResourceDefinition;

use crate::ResolveError;

/// One uncached fetch of a UI resource definition.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, resource_id: &str) -> Result<UiResourceDefinition, ResolveError>;
}

/// Fetches definitions from the gateway's `/api/ui-resources/{id}` endpoint.
pub struct HttpFetcher {
    base: String,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &UiConfig) -> Self {
        Self::new(config.api_base.clone())
    }

    pub fn url_for(&self, resource_id: &str) -> String {
        format!("{}/api/ui-resources/{resource_id}", self.base)
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, resource_id: &str) -> Result<UiResourceDefinition, ResolveError> {
        let url = self.url_for(resource_id);
        debug!(%url, "Fetching UI resource");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                "Failed to load UI resource".to_string()
            } else {
                body
            };
            return Err(ResolveError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ResolveError::Decode(e.to_string()))
    }
}
