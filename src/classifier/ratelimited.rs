use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::{Instrument, debug_span};

use crate::classifier::{JudgementFuture, JudgementService};

/// Wraps a judgement service with a client-side request quota
#[derive(Clone)]
pub struct RateLimitedJudge<J: JudgementService> {
    inner: J,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<J> RateLimitedJudge<J>
where
    J: JudgementService,
{
    pub fn new(inner: J, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            inner,
            limiter: Arc::new(limiter),
        }
    }

    pub fn per_minute(inner: J, requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute);
        Self::new(inner, RateLimiter::direct(quota))
    }
}

impl<J: JudgementService> JudgementService for RateLimitedJudge<J> {
    fn generate<'a>(&'a self, model: &'a str, prompt: &'a str) -> JudgementFuture<'a> {
        Box::pin(async move {
            self.limiter.until_ready().instrument(debug_span!("limiter")).await;
            self.inner.generate(model, prompt).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::mock::MockJudge;

    #[tokio::test]
    async fn test_passes_through_within_quota() {
        let judge = RateLimitedJudge::per_minute(MockJudge::replying("ok"), 600);
        assert_eq!(judge.generate("m", "p").await.unwrap(), "ok");
        assert_eq!(judge.generate("m", "p").await.unwrap(), "ok");
    }
}
