//! Poll-until-terminal primitives.
//!
//! Provider-side operations such as copying a snapshot or registering an
//! image complete asynchronously. The caller observes them by fetching the
//! resource state at a fixed interval until it leaves its pending state.
//!
//! - **Interval**: fixed delay between state lookups, no backoff.
//! - **Deadline**: optional upper bound on the total wait.
//! - **Cancellation**: a `watch` channel; `true` stops the wait.
//!
//! # Invariants
//!
//! - The fetch closure is called once per iteration, and never again after a
//!   non-pending state is observed
//! - A wait never terminates the process; every outcome is returned

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default delay between state lookups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Wait errors.
#[derive(Debug, Error)]
pub enum WaitError<E> {
    /// Looking up the current state failed.
    #[error("state lookup failed: {0}")]
    Fetch(E),

    /// The deadline passed while the resource was still pending.
    #[error("timeout after {elapsed:?} waiting for {resource}")]
    Timeout { resource: String, elapsed: Duration },

    /// The wait was cancelled.
    #[error("cancelled while waiting for {resource}")]
    Cancelled { resource: String },
}

/// State of a provider resource that moves through a pending phase.
pub trait LifecycleState: fmt::Display {
    /// Returns true while the provider is still working on the resource.
    fn is_pending(&self) -> bool;

    /// Returns true for the failure terminal state.
    fn is_failed(&self) -> bool;
}

/// Terminal outcome of a wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal<S> {
    /// The resource left the pending state in a non-failure state.
    Succeeded(S),

    /// The resource reached its failure state.
    Failed(S),
}

impl<S> Terminal<S> {
    /// Returns true if the resource settled successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Wait configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay between state lookups.
    pub interval: Duration,

    /// Maximum total wait. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Polls resources until they reach a terminal state.
#[derive(Debug)]
pub struct Waiter {
    config: WaitConfig,
    cancel: watch::Receiver<bool>,
}

impl Waiter {
    /// Create a waiter that stops when `cancel` becomes `true`.
    pub fn new(config: WaitConfig, cancel: watch::Receiver<bool>) -> Self {
        Self { config, cancel }
    }

    /// Create a waiter that can only stop on its deadline.
    pub fn without_cancellation(config: WaitConfig) -> Self {
        let (_tx, cancel) = watch::channel(false);
        Self { config, cancel }
    }

    /// Fetch the state of `resource` until it is no longer pending.
    ///
    /// The first lookup happens immediately. Each pending observation is
    /// followed by one interval of sleep, cut short by the deadline or by
    /// cancellation.
    pub async fn wait_for_terminal<S, E, F, Fut>(
        &mut self,
        resource: &str,
        mut fetch: F,
    ) -> Result<Terminal<S>, WaitError<E>>
    where
        S: LifecycleState,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, E>>,
    {
        let started = Instant::now();
        let deadline = self.config.timeout.map(|timeout| started + timeout);
        let mut attempt: u32 = 0;

        loop {
            if *self.cancel.borrow() {
                warn!(resource, "Wait cancelled");
                return Err(WaitError::Cancelled {
                    resource: resource.to_string(),
                });
            }

            attempt += 1;
            let state = fetch().await.map_err(WaitError::Fetch)?;

            if !state.is_pending() {
                debug!(resource, attempt, state = %state, "Resource settled");
                return Ok(if state.is_failed() {
                    Terminal::Failed(state)
                } else {
                    Terminal::Succeeded(state)
                });
            }

            let nap = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let elapsed = now.duration_since(started);
                        warn!(resource, elapsed_secs = elapsed.as_secs(), "Wait timed out");
                        return Err(WaitError::Timeout {
                            resource: resource.to_string(),
                            elapsed,
                        });
                    }
                    (deadline - now).min(self.config.interval)
                }
                None => self.config.interval,
            };

            debug!(resource, attempt, state = %state, "Waiting for completion");

            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = cancelled(&mut self.cancel) => {
                    warn!(resource, "Wait cancelled");
                    return Err(WaitError::Cancelled {
                        resource: resource.to_string(),
                    });
                }
            }
        }
    }
}

/// Resolves once cancellation is signalled. Never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let signalled = cancel.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
