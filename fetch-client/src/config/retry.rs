//! Opt-in retries for transient failures.
//!
//! A [`FetchClient`](crate::FetchClient) sends every call exactly once. To
//! retry, wrap the call:
//!
//! ```ignore
//! use fetch_client::{RetryPolicy, retry_with_policy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new()
//!     .max_retries(5)
//!     .base_delay(Duration::from_millis(100));
//!
//! let payload = retry_with_policy(&policy, || client.get("/ping", Default::default())).await?;
//! ```
//!
//! Whether an error is worth another attempt is decided by
//! [`ClientError::is_retryable`].

use std::future::Future;
use std::time::Duration;

use crate::ClientError;

/// Values used by [`RetryPolicy::default`].
pub mod defaults {
    use std::time::Duration;

    pub const BASE_DELAY: Duration = Duration::from_secs(1);
    pub const MULTIPLIER: f64 = 1.6;
    /// Spread applied to each delay; 0.2 means the delay varies by up to 20%.
    pub const JITTER: f64 = 0.2;
    pub const MAX_DELAY: Duration = Duration::from_secs(120);
    pub const MAX_RETRIES: u32 = 3;
}

/// How many times to retry and how long to wait in between.
///
/// The wait before retry `n` (counting from zero) is
/// `base_delay * multiplier^n`, capped at `max_delay`, then spread by
/// `jitter`.
///
/// ```
/// use fetch_client::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new()
///     .jitter(0.0)
///     .base_delay(Duration::from_millis(125))
///     .multiplier(2.0);
/// assert_eq!(policy.delay_for(2), Duration::from_millis(500));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            base_delay: defaults::BASE_DELAY,
            max_delay: defaults::MAX_DELAY,
            multiplier: defaults::MULTIPLIER,
            jitter: defaults::JITTER,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that makes a single attempt.
    pub fn no_retry() -> Self {
        Self::default().max_retries(0)
    }

    /// Retries after the first attempt. Zero disables retrying.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Growth factor between consecutive delays.
    ///
    /// # Panics
    ///
    /// If `multiplier` is below 1.0, since delays would then shrink.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier >= 1.0, "retry multiplier must be at least 1.0");
        self.multiplier = multiplier;
        self
    }

    /// Randomize each delay by up to `jitter` of its value in either direction.
    ///
    /// # Panics
    ///
    /// If `jitter` falls outside `0.0..=1.0`.
    pub fn jitter(mut self, jitter: f64) -> Self {
        assert!((0.0..=1.0).contains(&jitter), "retry jitter must be within 0.0..=1.0");
        self.jitter = jitter;
        self
    }

    pub fn get_max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Reject combinations the builder methods cannot catch on their own.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.base_delay > self.max_delay {
            Err("base_delay is larger than max_delay")
        } else if self.multiplier < 1.0 {
            Err("multiplier is below 1.0")
        } else if !(0.0..=1.0).contains(&self.jitter) {
            Err("jitter is outside 0.0..=1.0")
        } else {
            Ok(())
        }
    }

    /// The un-jittered wait before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let cap = self.max_delay.as_secs_f64();
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // powi overflows to infinity for large exponents; min() clamps it,
        // and a cap near Duration::MAX may still round past what fits.
        Duration::try_from_secs_f64(secs.min(cap)).unwrap_or(self.max_delay)
    }

    /// A fresh delay sequence for one logical call.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.clone())
    }
}

/// The delays of one retry loop, in order.
///
/// Also an [`Iterator`] that ends once the policy's retries are used up.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    policy: RetryPolicy,
    attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.policy.max_retries
    }

    /// The next jittered delay. Keeps growing even past `max_retries`;
    /// use [`can_retry`](Self::can_retry) or the iterator to stop.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.policy.delay_for(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        spread(base, self.policy.jitter, self.policy.max_delay)
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.can_retry().then(|| self.next_delay())
    }
}

fn spread(delay: Duration, jitter: f64, cap: Duration) -> Duration {
    if jitter == 0.0 {
        return delay.min(cap);
    }
    // Uniform in [1 - jitter, 1 + jitter).
    let factor = 1.0 + jitter * (2.0 * rand::random::<f64>() - 1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor.max(0.0))
        .map_or(cap, |jittered| jittered.min(cap))
}

/// [`retry_with_policy`] with [`RetryPolicy::default`].
pub async fn retry<F, Fut, T>(op: F) -> Result<T, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    retry_with_policy(&RetryPolicy::default(), op).await
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of retries. The error from the last attempt is returned
/// as is.
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, op: F) -> Result<T, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    policy
        .validate()
        .map_err(|reason| ClientError::InvalidRequest(format!("retry policy: {}", reason)))?;

    let mut delays = policy.backoff();
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retryable() {
            return Err(err);
        }
        let Some(delay) = delays.next() else {
            return Err(err);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            error = %err,
            retry = delays.attempts(),
            delay = ?delay,
            "transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy_is_valid() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.get_max_retries(), defaults::MAX_RETRIES);
        assert_eq!(policy.delay_for(0), defaults::BASE_DELAY);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_base_above_max_is_rejected() {
        let policy = RetryPolicy::new()
            .base_delay(Duration::from_secs(10))
            .max_delay(Duration::from_secs(1));
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_delays_grow_until_capped() {
        let policy = RetryPolicy::new()
            .jitter(0.0)
            .multiplier(2.0)
            .base_delay(Duration::from_millis(125))
            .max_delay(Duration::from_millis(375));
        let mut backoff = policy.backoff();

        assert_eq!(backoff.next_delay(), Duration::from_millis(125));
        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
        assert_eq!(backoff.next_delay(), Duration::from_millis(375));
        assert_eq!(backoff.attempts(), 3);
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(375));
    }

    #[test]
    fn test_huge_max_delay_does_not_overflow() {
        let policy = RetryPolicy::new()
            .max_delay(Duration::MAX)
            .multiplier(10.0)
            .jitter(0.0);
        assert_eq!(policy.delay_for(40), Duration::MAX);

        let mut backoff = policy.clone().jitter(0.2).backoff();
        let last = (0..50).map(|_| backoff.next_delay()).last().unwrap();
        assert!(last > Duration::from_secs(u64::MAX / 2));
    }

    #[test]
    fn test_iterator_stops_at_max_retries() {
        let policy = RetryPolicy::new().max_retries(2).jitter(0.0);
        assert_eq!(policy.backoff().count(), 2);
        assert_eq!(RetryPolicy::no_retry().backoff().next(), None);
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::new().base_delay(Duration::from_secs(1)).jitter(0.2);
        for _ in 0..100 {
            let secs = policy.backoff().next_delay().as_secs_f64();
            assert!((0.8..=1.2).contains(&secs), "delay out of range: {secs}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new().base_delay(Duration::from_millis(10)).jitter(0.0);

        let result = retry_with_policy(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ClientError::http(StatusCode::SERVICE_UNAVAILABLE, "busy"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_policy(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::http(StatusCode::NOT_FOUND, "missing")) }
        })
        .await;

        assert_eq!(result.unwrap_err().status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_error_after_retries_run_out() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new().max_retries(2).base_delay(Duration::from_millis(5));
        let result: Result<(), _> = retry_with_policy(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::Timeout) }
        })
        .await;

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
