// ABOUTME: Probe capability trait consumed by the polling loop.
// ABOUTME: A probe performs one attempt and judges whether its result means ready, pending, or failed.

use async_trait::async_trait;
use std::future::Future;

use super::error::ProbeError;

/// How a successful attempt's result should be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// The target is ready; stop polling.
    Ready,
    /// Not ready yet; try again after the interval.
    NotReady(String),
    /// The target reached a state it will not recover from; stop polling.
    Failed(String),
}

/// One readiness check, invoked repeatedly by [`poll_until_ready`](super::poll_until_ready).
#[async_trait]
pub trait Probe: Send + Sync {
    type Output: Send;

    /// Human-readable name of what is being waited on.
    fn target(&self) -> String;

    /// Perform one attempt. Errors are treated as "not ready".
    async fn attempt(&self) -> Result<Self::Output, ProbeError>;

    /// Expected condition and terminal-failure predicate over an attempt's result.
    fn check(&self, _output: &Self::Output) -> Readiness {
        Readiness::Ready
    }
}

/// Probe built from a closure, for ad-hoc checks.
pub struct FnProbe<F> {
    target: String,
    attempt: F,
}

/// Wrap an async closure as a [`Probe`] whose every successful attempt is ready.
pub fn probe_fn<F, Fut, T>(target: impl Into<String>, attempt: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ProbeError>> + Send,
    T: Send,
{
    FnProbe {
        target: target.into(),
        attempt,
    }
}

#[async_trait]
impl<F, Fut, T> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ProbeError>> + Send,
    T: Send,
{
    type Output = T;

    fn target(&self) -> String {
        self.target.clone()
    }

    async fn attempt(&self) -> Result<T, ProbeError> {
        (self.attempt)().await
    }
}
