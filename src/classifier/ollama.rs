//! HTTP client for an Ollama-compatible generate endpoint

use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::classifier::config::ClassifierConfig;
use crate::classifier::error::ClassifyError;
use crate::classifier::{JudgementFuture, JudgementService};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Non-streaming client for `/api/generate`
#[derive(Clone)]
pub struct OllamaClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Full URL of the generate endpoint
    endpoint: String,

    /// Sampling options sent with each request
    options: GenerateOptions,
}

impl OllamaClient {
    /// Create a client from the classifier configuration
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        let client = ReqwestClient::builder()
            .timeout(config.attempt_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            options: GenerateOptions {
                temperature: config.temperature,
                top_p: config.top_p,
            },
        })
    }

    /// Send one prompt and return the trimmed response text
    #[instrument(skip(self, prompt), level = "debug")]
    pub async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, ClassifyError> {
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: self.options,
        };

        debug!("Sending generate request to {}", self.endpoint);
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Judgement service error: {} - {}", status, response_text);
            return Err(ClassifyError::Service {
                status_code: status.as_u16(),
                message: response_text,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            ClassifyError::UnexpectedResponse(format!("Failed to parse response: {}", e))
        })?;
        Ok(parsed.response.trim().to_string())
    }
}

impl JudgementService for OllamaClient {
    fn generate<'a>(&'a self, model: &'a str, prompt: &'a str) -> JudgementFuture<'a> {
        Box::pin(self.generate_text(model, prompt))
    }
}
