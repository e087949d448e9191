// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! One request per [`EmbeddingAdapter::embed`] call. Timeouts, non-success
//! statuses and malformed responses all surface as
//! [`MnemoError::Embedding`]; nothing is retried here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mnemo_config::model::EmbeddingConfig;
use mnemo_core::types::{EmbeddingInput, EmbeddingOutput};
use mnemo_core::{AdapterType, EmbeddingAdapter, HealthStatus, MnemoError, PluginAdapter};

/// Longest slice of an error body echoed back in an error message.
const ERROR_BODY_LIMIT: usize = 240;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Embedding adapter backed by a remote HTTP service.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: Option<usize>,
}

impl HttpEmbedder {
    /// Build a client from the `[embedding]` configuration section.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, MnemoError> {
        let api_base = config.api_base.trim().trim_end_matches('/');
        if api_base.is_empty() {
            return Err(MnemoError::Config(
                "embedding.api_base must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| MnemoError::Embedding {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{api_base}/embeddings"),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            dimensions: config.dimensions,
        })
    }

    /// The full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_error(e: reqwest::Error) -> MnemoError {
        let message = if e.is_timeout() {
            "embedding request timed out".to_string()
        } else {
            format!("embedding request failed: {e}")
        };
        MnemoError::Embedding {
            message,
            source: Some(Box::new(e)),
        }
    }

    fn into_output(
        &self,
        mut data: Vec<EmbeddingDatum>,
        expected: usize,
    ) -> Result<EmbeddingOutput, MnemoError> {
        if data.len() != expected {
            return Err(MnemoError::embedding(format!(
                "embedding response size mismatch: expected {expected}, got {}",
                data.len()
            )));
        }
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }

        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();
        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();
        if dimensions == 0 {
            return Err(MnemoError::embedding("embedding response contained an empty vector"));
        }
        if embeddings.iter().any(|e| e.len() != dimensions) {
            return Err(MnemoError::embedding(
                "embedding response vectors have inconsistent lengths",
            ));
        }
        if let Some(configured) = self.dimensions {
            if configured != dimensions {
                return Err(MnemoError::embedding(format!(
                    "embedding has {dimensions} dimensions, expected {configured}"
                )));
            }
        }

        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}

#[async_trait]
impl PluginAdapter for HttpEmbedder {
    fn name(&self) -> &str {
        "http-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        if self.api_key.is_none() {
            return Ok(HealthStatus::Degraded("no embedding API key configured".into()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for HttpEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: vec![],
                dimensions: self.dimensions.unwrap_or_default(),
            });
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: &input.texts,
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(Self::request_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MnemoError::embedding(format!(
                "embedding request failed with status {}: {}",
                status.as_u16(),
                body.chars().take(ERROR_BODY_LIMIT).collect::<String>()
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| MnemoError::Embedding {
            message: format!("failed to parse embedding response: {e}"),
            source: Some(Box::new(e)),
        })?;
        let output = self.into_output(parsed.data, input.texts.len())?;
        debug!(
            count = output.embeddings.len(),
            dimensions = output.dimensions,
            "embeddings received"
        );
        Ok(output)
    }
}
