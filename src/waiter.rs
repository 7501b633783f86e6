//! Polling bridge between asynchronous page rendering and validator
//! attachment.
//!
//! [`wait_until`] is the generic observe-until-predicate loop; it knows
//! nothing about selectors.  [`ElementWaiter`] specialises it to "first
//! element matching a selector".  Neither can be cancelled: a caller that
//! loses interest drops the future or ignores the result.

use std::sync::Arc;
use std::time::Duration;

use crate::dom::{Dom, Element};
use crate::error::NotFoundError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait::async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// The budget was spent without the predicate producing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut {
    pub attempts: u32,
}

/// Poll `predicate` every `interval` until it yields a value or `timeout`
/// has elapsed.  The first poll happens after one interval, so at most
/// `timeout / interval` polls run (at least one).
pub async fn wait_until<T, F>(
    mut predicate: F,
    timeout: Duration,
    interval: Duration,
    clock: &dyn Clock,
) -> Result<T, TimedOut>
where
    F: FnMut() -> Option<T>,
{
    let max_attempts = max_attempts(timeout, interval);
    for attempt in 1..=max_attempts {
        clock.sleep(interval).await;
        if let Some(found) = predicate() {
            tracing::trace!(attempt, "predicate satisfied");
            return Ok(found);
        }
    }
    Err(TimedOut {
        attempts: max_attempts,
    })
}

fn max_attempts(timeout: Duration, interval: Duration) -> u32 {
    if interval.is_zero() {
        return 1;
    }
    let n = timeout.as_millis() / interval.as_millis().max(1);
    n.clamp(1, u32::MAX as u128) as u32
}

/// Waits for a selector to resolve against the page.
#[derive(Clone)]
pub struct ElementWaiter {
    dom: Arc<dyn Dom>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    interval: Duration,
}

impl ElementWaiter {
    pub fn new(dom: Arc<dyn Dom>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dom,
            clock,
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_timing(mut self, timeout: Duration, interval: Duration) -> Self {
        self.timeout = timeout;
        self.interval = interval;
        self
    }

    pub async fn wait(&self, selector: &str) -> Result<Element, NotFoundError> {
        let dom = &self.dom;
        wait_until(
            || dom.query(selector),
            self.timeout,
            self.interval,
            self.clock.as_ref(),
        )
        .await
        .map_err(|_| NotFoundError {
            selector: selector.to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        })
    }
}
