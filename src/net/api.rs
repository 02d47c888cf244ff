//! Client traits for the template and render services, and their reqwest
//! implementation.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

use super::types::RenderRequest;
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Longest response body excerpt kept in [`ApiError::Status`].
const ERROR_BODY_LIMIT: usize = 512;

// =============================================================================
// TRAITS
// =============================================================================

/// Template service and asset origin.
#[async_trait::async_trait]
pub trait TemplateApi: Send + Sync {
    /// `GET /templates/{id}` as raw JSON.
    async fn fetch_template(&self, template_id: &str) -> Result<Value, ApiError>;

    /// Fetch an asset (background image, rendered result) by absolute URL,
    /// without credentials.
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

/// Render service.
#[async_trait::async_trait]
pub trait RenderApi: Send + Sync {
    /// `POST /render/generate-image` as raw JSON.
    async fn submit(&self, request: &RenderRequest) -> Result<Value, ApiError>;

    /// `GET /render/status/{id}` as raw JSON.
    async fn status(&self, job_id: &str) -> Result<Value, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpApi {
    /// Build a client with the configured timeouts and credential.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the TLS backend fails to initialize.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_base_url.clone(), auth_token: config.auth_token.clone() })
    }

    /// Absolute endpoint URL for `path` under the API base.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Decorate a REST call with the bearer credential and a JSON accept header.
    fn api_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(ACCEPT, "application/json");
        match &self.auth_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    /// Asset downloads go to other origins and never carry the credential.
    fn asset_request(&self, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.http.get(url)
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = self
            .api_request(request)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::Request(e.to_string()))?;
        debug!(status, bytes = text.len(), "api response");

        if !(200..300).contains(&status) {
            return Err(ApiError::Status { status, body: truncate(&text, ERROR_BODY_LIMIT) });
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl TemplateApi for HttpApi {
    async fn fetch_template(&self, template_id: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&format!("templates/{}", path_segment(template_id)?));
        self.send_json(self.http.get(url)).await
    }

    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
        let response = self
            .asset_request(parsed)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body: truncate(&body, ERROR_BODY_LIMIT) });
        }
        let bytes = response.bytes().await.map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl RenderApi for HttpApi {
    async fn submit(&self, request: &RenderRequest) -> Result<Value, ApiError> {
        let url = self.endpoint("render/generate-image");
        self.send_json(self.http.post(url).json(request)).await
    }

    async fn status(&self, job_id: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&format!("render/status/{}", path_segment(job_id)?));
        self.send_json(self.http.get(url)).await
    }
}

/// Reject ids that would escape their path segment.
fn path_segment(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::InvalidUrl(format!("invalid id: {id:?}")));
    }
    Ok(id)
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_owned();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
