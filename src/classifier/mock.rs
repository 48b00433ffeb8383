//! # Mock Judgement Service for Testing
//!
//! Provides a `MockJudge` that implements `JudgementService` with scripted
//! replies, so classifier and run tests never touch a real model server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::classifier::error::ClassifyError;
use crate::classifier::{JudgementFuture, JudgementService};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Failure(String),
}

/// A judgement service with scripted replies.
/// Replies are consumed in order; the last one repeats forever.
#[derive(Debug, Clone)]
pub struct MockJudge {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

/// Counts a call as in flight until dropped
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockJudge {
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Always answer with `text`
    pub fn replying(text: &str) -> Self {
        Self::scripted(vec![MockReply::Text(text.to_string())])
    }

    /// Always fail
    pub fn failing() -> Self {
        Self::scripted(vec![MockReply::Failure("connection refused".to_string())])
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most calls that were ever running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> MockReply {
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        if replies.len() > 1 {
            replies.pop_front().unwrap_or(MockReply::Text(String::new()))
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or(MockReply::Text(String::new()))
        }
    }
}

impl JudgementService for MockJudge {
    fn generate<'a>(&'a self, _model: &'a str, _prompt: &'a str) -> JudgementFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.next_reply();
        let delay = self.delay;
        let in_flight = Arc::clone(&self.in_flight);
        let peak_in_flight = Arc::clone(&self.peak_in_flight);
        Box::pin(async move {
            let running = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = InFlight(in_flight);
            peak_in_flight.fetch_max(running, Ordering::SeqCst);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match reply {
                MockReply::Text(text) => Ok(text),
                MockReply::Failure(reason) => Err(ClassifyError::Other(reason)),
            }
        })
    }
}
