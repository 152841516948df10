//! Bounded retry policy shared by every call site that retries

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Timeouts;

/// Attempt budget for session establishment
pub const LOGIN_ATTEMPTS: u32 = 30;

/// Attempt budget for one (product, plan, age) request
pub const REQUEST_ATTEMPTS: u32 = 3;

/// Attempt budget for interruption dismissal
pub const DISMISS_ATTEMPTS: u32 = 2;

/// Attempt budget for activating the result tab
pub const RESULT_TAB_ATTEMPTS: u32 = 3;

/// How many times to try, how long to pause between tries, and whether the
/// page is reloaded before each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub reload_between: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, reload_between: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            reload_between,
        }
    }

    /// Login: 30 attempts, fixed backoff, no reload
    pub fn login(timeouts: &Timeouts) -> Self {
        Self::new(LOGIN_ATTEMPTS, timeouts.login_backoff(), false)
    }

    /// Per-age request: 3 attempts, no pause, reload before each retry
    pub fn request() -> Self {
        Self::new(REQUEST_ATTEMPTS, Duration::ZERO, true)
    }

    /// Interruption dismissal: 2 attempts, fixed backoff, no reload
    pub fn dismissal(timeouts: &Timeouts) -> Self {
        Self::new(DISMISS_ATTEMPTS, timeouts.dismiss_backoff(), false)
    }

    /// Result tab activation: 3 attempts, fixed pause, no reload
    pub fn result_tab(timeouts: &Timeouts) -> Self {
        Self::new(RESULT_TAB_ATTEMPTS, timeouts.result_tab_pause(), false)
    }

    /// Run `op` until it succeeds or the budget is spent, returning the last
    /// error on exhaustion. Attempts are numbered from 1.
    pub async fn retry<T, E, Op, Fut>(&self, what: &str, op: Op) -> Result<T, E>
    where
        E: Display,
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(what, op, || async {}).await
    }

    /// Like [`retry`](Self::retry), calling `recover` before each retry when
    /// the policy reloads between attempts.
    pub async fn run<T, E, Op, Fut, Rec, RecFut>(
        &self,
        what: &str,
        mut op: Op,
        mut recover: Rec,
    ) -> Result<T, E>
    where
        E: Display,
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Rec: FnMut() -> RecFut,
        RecFut: Future<Output = ()>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}/{}", what, attempt, self.max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= self.max_attempts => {
                    debug!("{} exhausted {} attempt(s): {}", what, self.max_attempts, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        "{} failed, retrying: {}",
                        what,
                        e
                    );
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                    if self.reload_between {
                        recover().await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
