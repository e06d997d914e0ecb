use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::{
    normalize_base_url, BackendFailure, BackendHealth, BackendResponse, ExtractRequest,
    TranscriptionBackend,
};
use crate::Result;

const EXTRACT_PATH: &str = "extract-text";
const HEALTH_PATH: &str = "health";

/// Transcription backend reached over HTTP
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, BackendFailure> {
        self.base_url
            .join(path)
            .map_err(|e| BackendFailure::transport(format!("Invalid endpoint {}: {}", path, e)))
    }
}

fn map_send_error(error: reqwest::Error) -> BackendFailure {
    if error.is_decode() {
        BackendFailure::decode(format!("Failed to decode backend response: {}", error))
    } else {
        BackendFailure::transport(format!("network error: {}", error))
    }
}

#[async_trait]
impl TranscriptionBackend for HttpBackend {
    async fn extract(&self, video_url: &str) -> std::result::Result<BackendResponse, BackendFailure> {
        let endpoint = self.endpoint(EXTRACT_PATH)?;
        tracing::debug!("POST {} for {}", endpoint, video_url);

        let response = self
            .client
            .post(endpoint)
            .json(&ExtractRequest {
                video_url: video_url.to_string(),
            })
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendFailure::status(status.as_u16()));
        }

        response
            .json::<BackendResponse>()
            .await
            .map_err(|e| BackendFailure::decode(format!("Failed to decode backend response: {}", e)))
    }

    async fn health(&self) -> std::result::Result<BackendHealth, BackendFailure> {
        let endpoint = self.endpoint(HEALTH_PATH)?;
        tracing::debug!("GET {}", endpoint);

        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendFailure::status(status.as_u16()));
        }

        response
            .json::<BackendHealth>()
            .await
            .map_err(|e| BackendFailure::decode(format!("Failed to decode health response: {}", e)))
    }
}
