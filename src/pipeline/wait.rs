//! Condition polling with a bounded timeout and cancellation

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::common::config::Config;
use crate::common::{Error, Result};

/// How long and how often to probe a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(100),
        }
    }
}

impl WaitPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.wait_timeout(),
            interval: config.poll_interval(),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

/// Running wait bound, advanced once per failed probe
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    policy: WaitPolicy,
}

impl Deadline {
    pub fn start(policy: WaitPolicy) -> Self {
        Self {
            start: Instant::now(),
            policy,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Sleep until the next probe is due
    ///
    /// Fails with [`Error::WaitTimeout`] once the bound has passed and with
    /// [`Error::Cancelled`] if `cancel` fires first.
    pub async fn tick(&self, condition: &str, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let deadline = self.start + self.policy.timeout;
        let now = Instant::now();
        if now >= deadline {
            return Err(Error::WaitTimeout {
                condition: condition.to_string(),
                elapsed_ms: self.elapsed_ms(),
            });
        }
        let next = (now + self.policy.interval).min(deadline);
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep_until(next) => Ok(()),
        }
    }
}

/// Probe until it yields `Some`, the policy times out, or `cancel` fires
///
/// The probe runs at least once. Probe errors end the wait immediately.
pub async fn until<T, F, Fut>(
    condition: &str,
    policy: WaitPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Deadline::start(policy);
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(value) = probe().await? {
            tracing::trace!(condition, elapsed_ms = deadline.elapsed_ms(), "Condition met");
            return Ok(value);
        }
        deadline.tick(condition, cancel).await?;
    }
}

/// Fixed delay that still honours cancellation
///
/// Prefer [`until`]; this exists for pages that expose no observable
/// readiness signal.
pub async fn settle(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
