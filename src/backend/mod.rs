use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::BackendConfig;
use crate::Result;

pub mod http;

pub use http::HttpBackend;

/// Request body for the extraction endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractRequest {
    pub video_url: String,
}

/// Successful response from the extraction endpoint.
///
/// Every field is optional; missing values get their defaults when the
/// controller builds an `ExtractionResult`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendResponse {
    /// Transcribed text
    #[serde(default)]
    pub text: Option<String>,

    /// Detected language
    #[serde(default)]
    pub language: Option<String>,

    /// Video title
    #[serde(default)]
    pub title: Option<String>,

    /// Optional summary generated by the backend
    #[serde(default)]
    pub summary: Option<String>,

    /// Video duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Backend health report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendHealth {
    pub status: String,

    #[serde(default)]
    pub model_loaded: bool,
}

/// Structured description of a failed backend call
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct BackendFailure {
    /// HTTP status, present only for non-success responses
    pub status: Option<u16>,

    /// The request never produced a response (connect, timeout, request errors)
    pub transport: bool,

    /// Description for logs
    pub message: String,
}

impl BackendFailure {
    pub fn status(code: u16) -> Self {
        Self {
            status: Some(code),
            transport: false,
            message: format!("HTTP error! status: {}", code),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            transport: true,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            status: None,
            transport: false,
            message: message.into(),
        }
    }
}

/// Port for the remote transcription service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Submit one video URL for transcription
    async fn extract(&self, video_url: &str) -> std::result::Result<BackendResponse, BackendFailure>;

    /// Query the service health endpoint
    async fn health(&self) -> std::result::Result<BackendHealth, BackendFailure>;
}

/// Parse and normalize the backend base URL so endpoint joins keep its path
pub fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut parsed = Url::parse(base_url)
        .map_err(|_| anyhow::anyhow!("Invalid backend URL: {}", base_url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("Backend URL must use HTTP or HTTPS protocol");
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

/// Build the HTTP backend described by the configuration
pub fn from_config(config: &BackendConfig) -> Result<HttpBackend> {
    HttpBackend::new(&config.base_url, Duration::from_secs(config.timeout_secs))
}
