//! Client for a remote invoice OCR service.
//!
//! Request: `POST { image: <base64>, options: { language, type } }` with a
//! bearer token. Response: `{ code: 0, data: {...} }` on success,
//! `{ code: <non-zero>, message }` on failure.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{FapiaoError, OcrError};
use crate::invoice::RawOcrOutput;
use crate::models::config::ApiConfig;

use super::{validate_image, ImageSource, Recognizer};

/// HTTP client for the OCR service.
pub struct RemoteOcrClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    language: String,
    doc_type: String,
    max_image_bytes: usize,
}

impl RemoteOcrClient {
    /// Create a client. Fails when the endpoint or the API key is missing.
    pub fn new(config: &ApiConfig) -> crate::Result<Self> {
        let url = required(config.url.as_deref(), "OCR service URL (api.url) is not configured")?;
        let api_key = required(config.api_key.as_deref(), "API key (api.api_key) is not configured")?;

        Ok(Self {
            http: reqwest::Client::new(),
            url,
            api_key,
            language: config.language.clone(),
            doc_type: config.doc_type.clone(),
            max_image_bytes: config.max_image_bytes,
        })
    }

    /// JSON body sent for one image.
    pub fn request_body(&self, image: &[u8]) -> Value {
        json!({
            "image": base64::engine::general_purpose::STANDARD.encode(image),
            "options": {
                "language": self.language,
                "type": self.doc_type,
            }
        })
    }

    /// Send the image and return the raw response payload.
    pub async fn call(&self, image: &ImageSource) -> Result<Value, OcrError> {
        validate_image(&image.bytes, self.max_image_bytes)?;

        debug!("Posting {} ({} bytes) to {}", image.key, image.bytes.len(), self.url);

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&image.bytes))
            .send()
            .await
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| OcrError::Recognition(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl Recognizer for RemoteOcrClient {
    fn name(&self) -> &str {
        "remote"
    }

    async fn recognize(&self, image: &ImageSource) -> Result<RawOcrOutput, OcrError> {
        self.call(image).await.map(RawOcrOutput::Structured)
    }
}

fn required(value: Option<&str>, message: &str) -> crate::Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FapiaoError::Config(message.to_string()))
}
