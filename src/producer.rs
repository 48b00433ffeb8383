//! # Extraction Producer Module
//!
//! Searches one store for one term and turns the top of the result list into
//! `MatchRecord`s. One producer instance serves every term for its store;
//! the run driver treats each (store, term) call as an independently
//! lifecycled task.
//!
//! ## Key Components
//!
//! - `ExtractionProducer`: the seam the run driver works against
//! - `HttpProducer`: fetches the store's search page and reads it with CSS selectors
//! - `StoreProfile`: per-store search URL shape and selectors (Bauhaus, OBI, Praktiker)
//! - `ProducerConfig`: pacing, retries, product limit and visibility
//!
//! Fetch and parse failures stay inside the producer: they are logged and
//! reported upward as a failed result, which the driver treats the same as
//! an empty one.

mod config;
mod error;
mod extraction;
mod stores;

pub use config::{ProducerConfig, ProducerConfigBuilder, Visibility};
pub use error::ProducerError;
pub use extraction::{absolutize, clean_price, extract_matches};
pub use stores::{FieldSelector, SearchUrl, StoreProfile};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::record::MatchRecord;

/// Future returned by a producer run
pub type ProduceFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<MatchRecord>, ProducerError>> + Send + 'a>>;

/// Something that can search one store for a term
pub trait ExtractionProducer: Send + Sync {
    /// Display name of the store
    fn store(&self) -> &str;

    fn produce<'a>(&'a self, search_term: &'a str) -> ProduceFuture<'a>;
}

/// Producer that reads a store's server-rendered search page
#[derive(Clone)]
pub struct HttpProducer {
    client: Client,
    profile: StoreProfile,
    config: ProducerConfig,
}

impl HttpProducer {
    pub fn new(profile: StoreProfile, config: ProducerConfig) -> Result<Self, ProducerError> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ProducerError::Other(format!("Invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            profile,
            config,
        })
    }

    /// One producer per default store
    pub fn for_all_stores(
        config: &ProducerConfig,
    ) -> Result<Vec<Arc<dyn ExtractionProducer>>, ProducerError> {
        StoreProfile::all()
            .into_iter()
            .map(|profile| {
                Self::new(profile, config.clone())
                    .map(|producer| Arc::new(producer) as Arc<dyn ExtractionProducer>)
            })
            .collect()
    }

    pub fn profile(&self) -> &StoreProfile {
        &self.profile
    }

    /// Fetch a page, retrying failed requests and non-success statuses
    /// with a doubling delay.
    async fn fetch_with_retries(&self, url: &Url) -> Result<String, ProducerError> {
        let attempts = self.config.retries + 1;
        for attempt in 0..attempts {
            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.text().await?);
                }
                Ok(response) => {
                    warn!(
                        "Request to {} failed with status: {} (attempt {}/{})",
                        url,
                        response.status(),
                        attempt + 1,
                        attempts
                    );
                }
                Err(e) => {
                    warn!(
                        "Request to {} failed: {} (attempt {}/{})",
                        url,
                        e,
                        attempt + 1,
                        attempts
                    );
                }
            }

            if attempt + 1 < attempts && !self.config.retry_delay.is_zero() {
                tokio::time::sleep(self.config.retry_delay * 2_u32.pow(attempt)).await;
            }
        }

        Err(ProducerError::MaxRetriesExceeded(url.to_string()))
    }

    #[instrument(skip(self), fields(store = %self.profile.name))]
    async fn search(&self, search_term: &str) -> Result<Vec<MatchRecord>, ProducerError> {
        let search_term = search_term.trim();
        if search_term.is_empty() {
            warn!("No search term given to {}", self.profile.name);
            return Ok(Vec::new());
        }

        let url = self.profile.search_url(search_term)?;
        if let Some(pause) = self.config.pacing() {
            tokio::time::sleep(pause).await;
        }

        info!("Searching {} for '{}'", self.profile.name, search_term);
        let body = self.fetch_with_retries(&url).await?;
        debug!("Fetched {} ({} bytes)", url, body.len());

        let records = extract_matches(
            &body,
            &url,
            &self.profile,
            search_term,
            self.config.max_products,
        )?;
        if records.is_empty() {
            warn!("No results on {} for '{}'", self.profile.name, search_term);
        } else {
            info!(
                "Found {} products on {} for '{}'",
                records.len(),
                self.profile.name,
                search_term
            );
        }
        Ok(records)
    }
}

impl ExtractionProducer for HttpProducer {
    fn store(&self) -> &str {
        &self.profile.name
    }

    fn produce<'a>(&'a self, search_term: &'a str) -> ProduceFuture<'a> {
        Box::pin(self.search(search_term))
    }
}
