//! OpenAI-compatible embeddings client.
//!
//! Works with OpenAI, Azure-style proxies, Ollama, vLLM, LM Studio, and other
//! endpoints that implement `POST /embeddings`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::embedder::{check_dimension, Embedder, Embedding, EmbeddingError, EmbeddingResult};

/// Default base URL for OpenAI API.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model, 1536 dimensions.
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Native output size of common OpenAI embedding models.
fn model_dimensions(model: &str) -> usize {
    match model {
        m if m.starts_with("text-embedding-3-large") => 3072,
        m if m.starts_with("text-embedding-3-small") => 1536,
        m if m.starts_with("text-embedding-ada-002") => 1536,
        _ => 1536,
    }
}

/// Models that accept a `dimensions` request field.
fn supports_dimensions(model: &str) -> bool {
    model.starts_with("text-embedding-3")
}

/// OpenAI embeddings request format.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// OpenAI embeddings response format.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

/// Embedder backed by an OpenAI-compatible HTTP API.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl OpenAiEmbedder {
    /// Creates an embedder for OpenAI's API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::custom(OPENAI_BASE_URL, Some(api_key.into()), model)
    }

    /// Creates an embedder for a custom endpoint.
    pub fn custom(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let dimensions = model_dimensions(&model);

        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model,
            dimensions,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the output dimensionality.
    ///
    /// For `text-embedding-3-*` models the value is sent with the request;
    /// for other models it must match what the endpoint returns.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the model identifier being used.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref api_key) = self.api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", api_key)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    fn build_request<'a>(&'a self, text: &'a str) -> EmbeddingsRequest<'a> {
        let dimensions = supports_dimensions(&self.model)
            .then_some(self.dimensions)
            .filter(|d| *d != model_dimensions(&self.model));

        EmbeddingsRequest {
            model: &self.model,
            input: vec![text],
            dimensions,
        }
    }

    fn parse_response(&self, response: EmbeddingsResponse) -> EmbeddingResult<Embedding> {
        let data = response
            .data
            .into_iter()
            .find(|d| d.index == 0)
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?;

        check_dimension(Embedding::new(data.embedding), self.dimensions)
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> EmbeddingError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());

            return EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            };
        }

        if let Ok(error) = response.json::<OpenAiError>().await {
            if status == 401 || error.error.code.as_deref() == Some("invalid_api_key") {
                return EmbeddingError::Authentication(error.error.message);
            }
            return EmbeddingError::Api {
                status,
                message: error.error.message,
            };
        }

        if status == 401 {
            return EmbeddingError::Authentication(format!("HTTP {}", status));
        }

        EmbeddingError::Api {
            status,
            message: format!("HTTP {}", status),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = self.build_request(text);

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else {
                    EmbeddingError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(self.handle_error_response(response).await);
        }

        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            EmbeddingError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        self.parse_response(parsed)
    }
}
