//! # Run Driver
//!
//! Fans the search terms out over every store, wires each producer's
//! lifecycle into the aggregator and routes every scraped record through
//! the classifier before the aggregator sees it.
//!
//! All starts are announced before any producer is spawned, so the open
//! counter cannot reach zero while work is still queued. Each producer runs
//! in its own task under a supervisor that always sends the matching stop,
//! also when the producer fails or panics. The stop runs on the blocking
//! pool because the last one writes the report file.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span, warn};

use crate::aggregator::{Aggregator, ProducerObserver, RunOutcome};
use crate::classifier::Classifier;
use crate::error::{Error, Result};
use crate::producer::{ExtractionProducer, HttpProducer, ProducerConfig};

/// Drives one run over a set of producers
pub struct RunDriver {
    producers: Vec<Arc<dyn ExtractionProducer>>,
    classifier: Arc<Classifier>,
    aggregator: Arc<Aggregator>,
    ai_enabled: bool,
    classify_concurrency: usize,
    progress: ProgressBar,
}

impl RunDriver {
    pub fn new(
        producers: Vec<Arc<dyn ExtractionProducer>>,
        classifier: Arc<Classifier>,
        aggregator: Arc<Aggregator>,
    ) -> Self {
        Self {
            producers,
            classifier,
            aggregator,
            ai_enabled: true,
            classify_concurrency: 4,
            progress: ProgressBar::hidden(),
        }
    }

    /// Driver over an `HttpProducer` for every default store
    pub fn with_http_stores(
        config: &ProducerConfig,
        classifier: Arc<Classifier>,
        aggregator: Arc<Aggregator>,
    ) -> Result<Self> {
        let producers = HttpProducer::for_all_stores(config)?;
        Ok(Self::new(producers, classifier, aggregator))
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Switch relevance validation on or off
    pub fn ai_enabled(mut self, ai_enabled: bool) -> Self {
        self.ai_enabled = ai_enabled;
        self
    }

    /// Records of one producer queued for judgement at a time. The number of
    /// calls actually running is bounded run-wide by the classifier.
    pub fn classify_concurrency(mut self, concurrency: usize) -> Self {
        self.classify_concurrency = concurrency.max(1);
        self
    }

    /// Report finished producers on this bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Search every term in every store and return the report outcome
    pub async fn run(&self, terms: &[String]) -> Result<RunOutcome> {
        let jobs: Vec<(Arc<dyn ExtractionProducer>, String)> = terms
            .iter()
            .flat_map(|term| {
                self.producers
                    .iter()
                    .map(move |producer| (Arc::clone(producer), term.clone()))
            })
            .collect();

        if jobs.is_empty() {
            warn!("Nothing to search");
            return Ok(RunOutcome::Empty);
        }

        for (producer, term) in &jobs {
            self.aggregator.on_producer_started(producer.store(), term)?;
        }

        self.progress.set_length(jobs.len() as u64);
        info!("Starting {} producers for {} terms", jobs.len(), terms.len());

        let mut supervisors = JoinSet::new();
        for (producer, term) in jobs {
            let classifier = Arc::clone(&self.classifier);
            let aggregator = Arc::clone(&self.aggregator);
            let progress = self.progress.clone();
            let ai_enabled = self.ai_enabled;
            let concurrency = self.classify_concurrency;
            let span = info_span!("producer", store = %producer.store(), term = %term);

            supervisors.spawn(
                async move {
                    let store = producer.store().to_string();
                    let worker = tokio::spawn({
                        let aggregator = Arc::clone(&aggregator);
                        let term = term.clone();
                        async move {
                            run_producer(
                                producer,
                                &term,
                                &classifier,
                                aggregator.as_ref(),
                                ai_enabled,
                                concurrency,
                            )
                            .await
                        }
                        .in_current_span()
                    });

                    if let Err(e) = worker.await {
                        error!("Producer task for {} / '{}' aborted: {}", store, term, e);
                    }
                    let stopped = tokio::task::spawn_blocking({
                        let store = store.clone();
                        let term = term.clone();
                        move || aggregator.on_producer_stopped(&store, &term)
                    })
                    .await;
                    match stopped {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => error!("{}", e),
                        Err(e) => error!("Stop of {} / '{}' failed: {}", store, term, e),
                    }
                    progress.inc(1);
                    progress.set_message(format!("{} / {}", store, term));
                }
                .instrument(span),
            );
        }

        while let Some(joined) = supervisors.join_next().await {
            if let Err(e) = joined {
                error!("Supervisor task failed: {}", e);
            }
        }
        self.progress.finish_with_message("all stores searched");

        self.aggregator.outcome().cloned().ok_or_else(|| {
            Error::Other(format!(
                "run did not finish, {} producers still open",
                self.aggregator.open_producers()
            ))
        })
    }
}

async fn run_producer(
    producer: Arc<dyn ExtractionProducer>,
    term: &str,
    classifier: &Classifier,
    observer: &dyn ProducerObserver,
    ai_enabled: bool,
    concurrency: usize,
) {
    let records = match producer.produce(term).await {
        Ok(records) => records,
        Err(e) => {
            error!("Search failed on {} for '{}': {}", producer.store(), term, e);
            return;
        }
    };

    let mut classified = stream::iter(records)
        .map(|record| classifier.classify(record, ai_enabled))
        .buffered(concurrency);

    while let Some(record) = classified.next().await {
        if let Err(e) = observer.on_record_received(record) {
            error!("{}", e);
        }
    }
}
