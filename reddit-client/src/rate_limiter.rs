use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub time_window: Duration,
    pub burst_allowance: u32,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            max_requests: 100, // Reddit allows 100 requests per minute per OAuth client
            time_window: Duration::from_secs(60),
            burst_allowance: 10,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = config.burst_allowance as f64;
        let refill_rate = config.max_requests as f64 / config.time_window.as_secs_f64();

        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate,
        }
    }

    /// Takes `tokens_needed` tokens, or returns how long until they are available.
    pub async fn acquire(&self, tokens_needed: f64) -> Result<(), Duration> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= tokens_needed {
            state.tokens -= tokens_needed;
            Ok(())
        } else {
            let missing = tokens_needed - state.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }

    #[cfg(test)]
    async fn available_tokens(&self) -> f64 {
        let state = self.state.lock().await;
        let elapsed = state.last_refill.elapsed();
        (state.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity)
    }
}

// Reddit windows are ten minutes long.
const MAX_RESET_SECS: f64 = 600.0;

/// Budget Reddit reported on its last response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerBudget {
    pub remaining: f64,
    pub reset_after: Duration,
}

impl ServerBudget {
    /// Reads `x-ratelimit-remaining` and `x-ratelimit-reset`; `None` if either is absent.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        let remaining = read("x-ratelimit-remaining")?;
        let reset = read("x-ratelimit-reset")?;
        Some(Self {
            remaining,
            reset_after: Duration::from_secs_f64(reset.clamp(0.0, MAX_RESET_SECS)),
        })
    }
}

/// Client-side throttle in front of every Reddit request.
///
/// A local token bucket smooths bursts, and when Reddit reports an exhausted
/// budget the next request waits for the server-side window to reset.
#[derive(Debug)]
pub struct RateLimiter {
    token_bucket: TokenBucket,
    paused_until: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            token_bucket: TokenBucket::new(&config),
            paused_until: Mutex::new(None),
        }
    }

    /// Waits until a request may be sent. Returns the time spent waiting.
    pub async fn acquire_permit(&self) -> Duration {
        let start_time = Instant::now();

        let pause = self.paused_until.lock().await.take();
        if let Some(until) = pause {
            let now = Instant::now();
            if until > now {
                debug!("Reddit budget exhausted, waiting {:?}", until - now);
                sleep(until - now).await;
            }
        }

        loop {
            match self.token_bucket.acquire(1.0).await {
                Ok(()) => break,
                Err(wait_time) => {
                    debug!("Rate limit reached, waiting {:?}", wait_time);
                    sleep(wait_time).await;
                }
            }
        }

        start_time.elapsed()
    }

    /// Records the budget from a response; an exhausted budget pauses the next request.
    pub async fn observe(&self, budget: ServerBudget) {
        if budget.remaining < 1.0 {
            warn!(
                "Reddit rate limit budget exhausted, pausing for {:?}",
                budget.reset_after
            );
            *self.paused_until.lock().await = Some(Instant::now() + budget.reset_after);
        }
    }

    #[cfg(test)]
    async fn is_paused(&self) -> bool {
        matches!(*self.paused_until.lock().await, Some(until) if until > Instant::now())
    }
}
