// ABOUTME: The polling loop: attempt, judge, wait a fixed interval, repeat until ready or out of budget.
// ABOUTME: Attempts never overlap; a hung attempt is cut off by the per-attempt timeout.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::PollError;
use super::probe::{Probe, Readiness};

/// Timing budget for one polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    /// Overall budget; determines the attempt count together with `interval`.
    pub timeout: Duration,
    /// Fixed spacing between attempts.
    pub interval: Duration,
    /// Cap on a single attempt. Without one, an attempt may take at most
    /// the overall budget (or one interval, if that is longer).
    pub attempt_timeout: Option<Duration>,
}

impl PollSpec {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            attempt_timeout: None,
        }
    }

    pub fn attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = Some(attempt_timeout);
        self
    }

    /// Limit applied to each attempt; every attempt is bounded.
    pub fn attempt_limit(&self) -> Duration {
        self.attempt_timeout
            .unwrap_or_else(|| self.timeout.max(self.interval))
    }

    /// `ceil(timeout / interval) + 1`, computed in whole milliseconds.
    pub fn max_attempts(&self) -> u32 {
        let timeout_ms = self.timeout.as_millis();
        let interval_ms = self.interval.as_millis().max(1);
        let attempts = timeout_ms.div_ceil(interval_ms) + 1;
        u32::try_from(attempts).unwrap_or(u32::MAX)
    }

    pub fn validate(&self) -> Result<(), PollError> {
        if self.interval.as_millis() == 0 {
            return Err(PollError::InvalidSpec(
                "interval must be at least 1ms".to_string(),
            ));
        }
        if self.attempt_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PollError::InvalidSpec(
                "attempt timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Poll `probe` until it reports ready, reports a terminal failure, or the
/// attempt budget derived from `spec` is spent.
///
/// Probe errors and per-attempt timeouts only fail the current attempt. No
/// delay follows the final attempt.
///
/// # Errors
///
/// - `PollError::Timeout` once every attempt has been used.
/// - `PollError::Failed` as soon as the probe classifies a result as terminal.
/// - `PollError::InvalidSpec` if `spec` is unusable.
pub async fn poll_until_ready<P>(probe: &P, spec: &PollSpec) -> Result<P::Output, PollError>
where
    P: Probe + ?Sized,
{
    spec.validate()?;
    let target = probe.target();
    let max_attempts = spec.max_attempts();
    let mut last: Option<String> = None;

    for attempt in 1..=max_attempts {
        let limit = spec.attempt_limit();
        let result = match tokio::time::timeout(limit, probe.attempt()).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_elapsed) => Err(format!("attempt timed out after {limit:?}")),
        };

        match result {
            Ok(output) => match probe.check(&output) {
                Readiness::Ready => {
                    info!(probe = %target, attempt, "ready");
                    return Ok(output);
                }
                Readiness::Failed(reason) => {
                    warn!(probe = %target, attempt, reason = %reason, "terminal failure");
                    return Err(PollError::Failed { target, reason });
                }
                Readiness::NotReady(reason) => {
                    debug!(probe = %target, attempt, max_attempts, reason = %reason, "not ready");
                    last = Some(reason);
                }
            },
            Err(reason) => {
                debug!(probe = %target, attempt, max_attempts, error = %reason, "probe attempt failed");
                last = Some(reason);
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(spec.interval).await;
        }
    }

    Err(PollError::Timeout {
        target,
        timeout: spec.timeout,
        attempts: max_attempts,
        last,
    })
}
