//! The submit → poll → terminal-state loop shared by every asynchronous
//! backend.
//!
//! The loop sleeps the policy interval, issues one status request through a
//! [`StatusSource`], and feeds the observation into the task's state machine.
//! Only the status query differs between backends; the loop shape is identical.
//! Sleeping is a `tokio` timer, so a waiting request yields its worker thread
//! to other requests.

use std::time::Duration;

use async_trait::async_trait;
use generation::{
    Advance, GenerationError, GenerationTask, PollObservation, PollPolicy, RetryPolicy, TaskId,
};
use tracing::{debug, info, warn};

/// Builds the poll policy for a submit, naming which input is unusable.
pub fn poll_policy(interval: Duration, timeout: Duration) -> Result<PollPolicy, GenerationError> {
    if interval.as_millis() == 0 {
        return Err(GenerationError::validation(
            "Poll interval must be at least one millisecond.",
        ));
    }
    if timeout.is_zero() {
        return Err(GenerationError::validation("Timeout must be positive."));
    }
    PollPolicy::with_interval(interval, timeout).ok_or_else(|| {
        GenerationError::validation(format!(
            "Timeout of {} seconds is too large.",
            timeout.as_secs()
        ))
    })
}

/// One backend's status request.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Queries the provider for the current status of `task_id`.
    ///
    /// Errors with [`RetryPolicy::Retryable`] consume the attempt and are not
    /// surfaced; any other error ends the loop.
    async fn fetch_status(&self, task_id: &TaskId) -> Result<PollObservation, GenerationError>;
}

/// Polls `task` until it reaches a terminal state and returns the image URL.
pub async fn await_task<P>(source: &P, mut task: GenerationTask) -> Result<String, GenerationError>
where
    P: StatusSource + ?Sized,
{
    let max_attempts = task.policy().max_attempts();
    info!(
        task_id = %task.id(),
        backend = %task.backend(),
        submitted_at = %task.submitted_at(),
        max_attempts,
        timeout_secs = task.policy().timeout().as_secs_f64(),
        "polling task"
    );

    while let Some(attempt) = task.begin_attempt() {
        tokio::time::sleep(task.policy().interval()).await;
        debug!(task_id = %task.id(), attempt, max_attempts, "requesting task status");

        let observation = match source.fetch_status(task.id()).await {
            Ok(observation) => observation,
            Err(err) if err.retry_policy() == RetryPolicy::Retryable => {
                warn!(
                    task_id = %task.id(),
                    attempt,
                    error = %err,
                    "status request failed; continuing to poll"
                );
                PollObservation::Unavailable
            }
            Err(err) => return Err(err),
        };

        if let Advance::Done(url) = task.observe(observation)? {
            info!(task_id = %task.id(), attempt, "task succeeded");
            return Ok(url);
        }
    }

    let err = task.expire();
    warn!(task_id = %task.id(), attempts = task.attempts_used(), "task timed out");
    Err(err)
}
