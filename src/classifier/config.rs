//! # Classifier Configuration Module
//!
//! Configuration for the relevance classifier: where the judgement service
//! lives, which model it runs, and how hard each classification tries before
//! falling back. Uses the same builder shape as the other config structs in
//! the crate.

use std::time::Duration;

/// Default generate endpoint of a local Ollama server
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Configuration for the relevance classifier
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Full URL of the generate endpoint
    pub endpoint: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Extra attempts after the first failure
    pub retries: u32,

    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,

    /// Pause between failed attempts
    pub backoff: Duration,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling cut-off
    pub top_p: f32,

    /// Minimum score for a RELEVANT verdict to be accepted
    pub accept_threshold: u8,

    /// Client-side cap on judgement calls
    pub requests_per_minute: u32,

    /// Judgement calls in flight across the whole run
    pub max_in_flight: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            retries: 1,
            attempt_timeout: Duration::from_secs(20),
            backoff: Duration::from_millis(1200),
            temperature: 0.1,
            top_p: 0.9,
            accept_threshold: 60,
            requests_per_minute: 600,
            max_in_flight: 1,
        }
    }
}

/// Builder for ClassifierConfig
#[derive(Debug, Default)]
pub struct ClassifierConfigBuilder {
    config: ClassifierConfig,
}

impl ClassifierConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ClassifierConfig::default(),
        }
    }

    /// Set the generate endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the model identifier
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the number of retries after the first failed attempt
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the per-attempt timeout
    pub fn attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.config.attempt_timeout = attempt_timeout;
        self
    }

    /// Set the pause between attempts
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Set the acceptance threshold
    pub fn accept_threshold(mut self, accept_threshold: u8) -> Self {
        self.config.accept_threshold = accept_threshold;
        self
    }

    /// Set the client-side request quota
    pub fn requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.config.requests_per_minute = requests_per_minute;
        self
    }

    /// Set how many judgement calls may run at once
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.config.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ClassifierConfig {
        self.config
    }
}

impl ClassifierConfig {
    /// Create a new builder
    pub fn builder() -> ClassifierConfigBuilder {
        ClassifierConfigBuilder::new()
    }

    /// Default configuration with `ARKERESO_OLLAMA_URL` and `ARKERESO_MODEL`
    /// applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("ARKERESO_OLLAMA_URL") {
            config.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("ARKERESO_MODEL") {
            config.model = model;
        }
        config
    }

    /// Total attempts per classification
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}
