//! # Producer Configuration Module
//!
//! Controls how store search pages are fetched: pacing, retries, how many
//! products are taken per page and whether the run is in visible (debug)
//! mode.

use std::time::Duration;

/// Whether page interaction is paced for a human watching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Headless,
    Visible,
}

impl Visibility {
    /// `--debug 1` selects visible mode, anything else headless
    pub fn from_debug_flag(debug: u8) -> Self {
        if debug > 0 {
            Visibility::Visible
        } else {
            Visibility::Headless
        }
    }
}

/// Configuration for extraction producers
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Headless or visible mode
    pub visibility: Visibility,

    /// Products taken from the top of each result page
    pub max_products: usize,

    /// Timeout for a single page request
    pub request_timeout: Duration,

    /// Extra fetch attempts after the first failure
    pub retries: u32,

    /// Base delay between fetch attempts, doubled each time
    pub retry_delay: Duration,

    /// Pause before each page request in visible mode
    pub slow_mo: Duration,

    /// User agent to use for requests
    pub user_agent: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            visibility: Visibility::Headless,
            max_products: 5,
            request_timeout: Duration::from_secs(30),
            retries: 2,
            retry_delay: Duration::from_millis(500),
            slow_mo: Duration::from_millis(500),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

/// Builder for ProducerConfig
#[derive(Debug, Default)]
pub struct ProducerConfigBuilder {
    config: ProducerConfig,
}

impl ProducerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProducerConfig::default(),
        }
    }

    /// Set the visibility mode
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.config.visibility = visibility;
        self
    }

    /// Set how many products are taken per page
    pub fn max_products(mut self, max_products: usize) -> Self {
        self.config.max_products = max_products;
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config.request_timeout = request_timeout;
        self
    }

    /// Set the number of fetch retries
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the base retry delay
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.config.retry_delay = retry_delay;
        self
    }

    /// Set the visible-mode pause
    pub fn slow_mo(mut self, slow_mo: Duration) -> Self {
        self.config.slow_mo = slow_mo;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProducerConfig {
        self.config
    }
}

impl ProducerConfig {
    /// Create a new builder
    pub fn builder() -> ProducerConfigBuilder {
        ProducerConfigBuilder::new()
    }

    /// Pause applied before each page request
    pub fn pacing(&self) -> Option<Duration> {
        match self.visibility {
            Visibility::Visible if !self.slow_mo.is_zero() => Some(self.slow_mo),
            _ => None,
        }
    }
}
