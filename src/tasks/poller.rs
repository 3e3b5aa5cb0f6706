//! Fixed-interval status polling.
//!
//! A poll fetches the resource, then checks the ready predicate, then the
//! failure predicate, then the deadline. Only when none of them ends the
//! poll does it sleep for one interval and fetch again. The last sleep is
//! cut short so the final fetch lands on the deadline, never after it.

use log::debug;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use super::clock::{Clock, TokioClock};

/// Why a poll ended without reaching the target condition
#[derive(Debug, Error)]
pub enum PollError<S, E> {
    #[error("{resource} entered a failure state: {state:?}")]
    Terminal { resource: String, state: S },

    #[error("timed out after {waited:?} waiting for {resource}, last state: {last:?}")]
    TimedOut {
        resource: String,
        waited: Duration,
        last: S,
    },

    #[error("failed to fetch {resource}: {error}")]
    Fetch { resource: String, error: E },
}

impl<S, E> PollError<S, E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::TimedOut { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PollError::Terminal { .. })
    }

    /// Last state observed before the poll ended, if one was fetched
    pub fn last_state(&self) -> Option<&S> {
        match self {
            PollError::Terminal { state, .. } => Some(state),
            PollError::TimedOut { last, .. } => Some(last),
            PollError::Fetch { .. } => None,
        }
    }
}

/// Polls a resource at a fixed interval until a condition or a deadline
#[derive(Debug, Clone)]
pub struct StatusPoller<C = TokioClock> {
    interval: Duration,
    timeout: Duration,
    clock: C,
}

impl StatusPoller<TokioClock> {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            clock: TokioClock,
        }
    }
}

impl<C: Clock> StatusPoller<C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> StatusPoller<C2> {
        StatusPoller {
            interval: self.interval,
            timeout: self.timeout,
            clock,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch until `is_ready` holds, `is_failed` holds, the fetch errors, or the timeout elapses
    pub async fn poll_until<S, E, F, Fut, R, X>(
        &self,
        resource: &str,
        mut fetch: F,
        is_ready: R,
        is_failed: X,
    ) -> Result<S, PollError<S, E>>
    where
        S: Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, E>>,
        R: Fn(&S) -> bool,
        X: Fn(&S) -> bool,
    {
        let started = self.clock.now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let state = fetch().await.map_err(|error| PollError::Fetch {
                resource: resource.to_string(),
                error,
            })?;
            debug!("[{}] poll #{}: {:?}", resource, attempts, state);

            if is_ready(&state) {
                return Ok(state);
            }
            if is_failed(&state) {
                return Err(PollError::Terminal {
                    resource: resource.to_string(),
                    state,
                });
            }

            let waited = self.clock.now().saturating_duration_since(started);
            if waited >= self.timeout {
                return Err(PollError::TimedOut {
                    resource: resource.to_string(),
                    waited,
                    last: state,
                });
            }

            self.clock.sleep(self.interval.min(self.timeout - waited)).await;
        }
    }

    /// Wait for a status string, compared case-insensitively
    pub async fn wait_for_status<E, F, Fut>(
        &self,
        resource: &str,
        fetch: F,
        target: &str,
        failure_statuses: &[&str],
    ) -> Result<String, PollError<String, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        self.poll_until(
            resource,
            fetch,
            |status: &String| status.eq_ignore_ascii_case(target),
            |status: &String| failure_statuses.iter().any(|f| status.eq_ignore_ascii_case(f)),
        )
        .await
    }
}

/// Poll with real time
pub async fn poll_until<S, E, F, Fut, R, X>(
    resource: &str,
    fetch: F,
    is_ready: R,
    is_failed: X,
    interval: Duration,
    timeout: Duration,
) -> Result<S, PollError<S, E>>
where
    S: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, E>>,
    R: Fn(&S) -> bool,
    X: Fn(&S) -> bool,
{
    StatusPoller::new(interval, timeout)
        .poll_until(resource, fetch, is_ready, is_failed)
        .await
}
