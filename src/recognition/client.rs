//! RecognitionClient - talks to the vehicle recognition service over HTTP.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::error::RecognitionError;
use super::result::{parse_response, RecognitionResult};
use super::submit::{submit, Recognizer};
use crate::payload::ImagePayload;

/// Environment variable holding the service API key.
pub const API_KEY_ENV: &str = "CAR_SCANNER_API_KEY";

/// Service address used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Path of the recognition endpoint, relative to the base URL.
pub const RECOGNIZE_PATH: &str = "/v1/recognize";

/// Upper bound for one submission (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection establishment timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Request body for recognition.
#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    /// Base64 of the encoded image.
    image: String,
    mime: &'a str,
    width: u32,
    height: u32,
}

/// Client for the recognition service.
pub struct RecognitionClient {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl fmt::Debug for RecognitionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RecognitionClient {
    /// Create a client for the service at `base_url`, without an API key.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RecognitionError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            http_client,
        })
    }

    /// Create a client, taking the API key from `key_env` if it is set.
    pub fn from_env(base_url: impl Into<String>, key_env: &str) -> Result<Self, RecognitionError> {
        let client = Self::new(base_url)?;
        Ok(match std::env::var(key_env) {
            Ok(key) => client.with_api_key(key),
            Err(_) => client,
        })
    }

    /// Send `Authorization: Key <key>` with every request. Empty keys are ignored.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL of the recognition endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, RECOGNIZE_PATH)
    }

    /// Submit `payload`, bounded by this client's timeout and `cancel`.
    pub async fn submit(
        &self,
        payload: &ImagePayload,
        cancel: &CancellationToken,
    ) -> Result<RecognitionResult, RecognitionError> {
        submit(self, payload, cancel, self.timeout).await
    }
}

#[async_trait]
impl Recognizer for RecognitionClient {
    async fn recognize(
        &self,
        payload: &ImagePayload,
    ) -> Result<RecognitionResult, RecognitionError> {
        let url = self.endpoint();
        log::debug!(
            "submitting {} ({}x{}, {} bytes) to {}",
            payload.digest(),
            payload.width(),
            payload.height(),
            payload.bytes().len(),
            url
        );

        let request_body = RecognizeRequest {
            image: payload.to_base64(),
            mime: payload.mime(),
            width: payload.width(),
            height: payload.height(),
        };

        let mut request = self.http_client.post(&url).json(&request_body);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Key {}", api_key));
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::warn!("recognition service returned {}: {}", status, error_text);
            return Err(RecognitionError::Network {
                message: format!("service returned {}: {}", status, error_text.trim()),
                status: Some(status.as_u16()),
            });
        }

        let body = response.bytes().await?;
        parse_response(&body)
    }
}
