//! The asynchronous generation task and its state machine.
//!
//! ```text
//! Pending (submitted) ──begin_attempt──▶ Running (polling) ──observe──▶ Succeeded
//!                                            │                    └──▶ Failed
//!                                            └──expire──────────────▶ TimedOut
//! ```
//!
//! Terminal states are absorbing: once a task is `Succeeded`, `Failed`, or
//! `TimedOut`, later observations are ignored and every query returns the
//! outcome the task finished with.

use tracing::debug;

use crate::{BackendKind, GenerationError, PollPolicy, TaskId, Timestamp};

/// Lifecycle state of a [`GenerationTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Accepted by the provider; no status request issued yet.
    Pending,
    /// At least one status request issued; no terminal status seen.
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl TaskStatus {
    /// `true` for `Succeeded`, `Failed`, and `TimedOut`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

/// What one status request told us, already mapped from the provider's field
/// names onto the shared vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollObservation {
    /// The provider has queued the task but not started it.
    Pending,
    /// The provider is still working on the task.
    Running,
    /// The status call failed transiently; the attempt is spent, nothing
    /// else changes.
    Unavailable,
    /// The provider reported success. `result_url` is `None` when the success
    /// marker came without an image.
    Succeeded { result_url: Option<String> },
    /// The provider reported failure, with its message if it sent one.
    Failed { message: Option<String> },
}

/// Result of feeding one observation into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Keep polling.
    Continue,
    /// The task succeeded with this image URL.
    Done(String),
}

/// One submitted asynchronous task, owned by the poll loop that created it.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    id: TaskId,
    backend: BackendKind,
    submitted_at: Timestamp,
    policy: PollPolicy,
    status: TaskStatus,
    attempts_used: u32,
    result_url: Option<String>,
    failure: Option<Failure>,
}

/// Why a task ended in [`TaskStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Failure {
    Reported(String),
    MissingResult,
}

impl Failure {
    fn message(&self) -> &str {
        match self {
            Self::Reported(message) => message,
            Self::MissingResult => "task succeeded but returned no image",
        }
    }
}

impl GenerationTask {
    /// Records a task the provider has just accepted.
    pub fn submitted(id: TaskId, backend: BackendKind, policy: PollPolicy) -> Self {
        Self {
            id,
            backend,
            submitted_at: Timestamp::now(),
            policy,
            status: TaskStatus::Pending,
            attempts_used: 0,
            result_url: None,
            failure: None,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(Failure::message)
    }

    /// Claims the next attempt from the budget.
    ///
    /// Returns the 1-based attempt number, or `None` once the budget is spent
    /// or the task is terminal.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.status.is_terminal() || self.attempts_used >= self.policy.max_attempts() {
            return None;
        }
        self.attempts_used += 1;
        Some(self.attempts_used)
    }

    /// Applies one observation.
    ///
    /// A success without an image URL is a protocol violation and fails the
    /// task; it is never retried. On a terminal task the observation is
    /// ignored and the stored outcome is returned again.
    pub fn observe(&mut self, observation: PollObservation) -> Result<Advance, GenerationError> {
        if self.status.is_terminal() {
            return self.terminal_outcome();
        }

        match observation {
            PollObservation::Pending | PollObservation::Running | PollObservation::Unavailable => {
                self.status = TaskStatus::Running;
            }
            PollObservation::Succeeded {
                result_url: Some(url),
            } => {
                self.status = TaskStatus::Succeeded;
                self.result_url = Some(url);
            }
            PollObservation::Succeeded { result_url: None } => {
                self.status = TaskStatus::Failed;
                self.failure = Some(Failure::MissingResult);
            }
            PollObservation::Failed { message } => {
                self.status = TaskStatus::Failed;
                self.failure = Some(Failure::Reported(
                    message.unwrap_or_else(|| "Unknown error".to_string()),
                ));
            }
        }

        debug!(
            task_id = %self.id,
            backend = %self.backend,
            status = ?self.status,
            attempt = self.attempts_used,
            "task observed"
        );

        if self.status.is_terminal() {
            self.terminal_outcome()
        } else {
            Ok(Advance::Continue)
        }
    }

    /// Marks the task timed out and returns the timeout error.
    ///
    /// Has no effect on a task that already reached a terminal state.
    pub fn expire(&mut self) -> GenerationError {
        if !self.status.is_terminal() {
            self.status = TaskStatus::TimedOut;
        }
        self.timeout_error()
    }

    fn timeout_error(&self) -> GenerationError {
        GenerationError::TaskTimeout {
            backend: self.backend,
            timeout: self.policy.timeout(),
        }
    }

    fn terminal_outcome(&self) -> Result<Advance, GenerationError> {
        match (self.status, &self.result_url, &self.failure) {
            (TaskStatus::Succeeded, Some(url), _) => Ok(Advance::Done(url.clone())),
            (TaskStatus::TimedOut, _, _) => Err(self.timeout_error()),
            (_, _, Some(Failure::Reported(message))) => Err(GenerationError::TaskFailed {
                backend: self.backend,
                message: message.clone(),
            }),
            (_, _, failure) => Err(GenerationError::protocol(
                self.backend,
                failure
                    .as_ref()
                    .map_or("task ended without a result", Failure::message),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn task(timeout_secs: u64) -> GenerationTask {
        GenerationTask::submitted(
            TaskId::new("abc123").unwrap(),
            BackendKind::Volcengine,
            PollPolicy::new(Duration::from_secs(timeout_secs)).unwrap(),
        )
    }

    #[test]
    fn new_task_is_pending_with_no_attempts() {
        let t = task(180);
        assert_eq!(t.status(), TaskStatus::Pending);
        assert_eq!(t.attempts_used(), 0);
        assert_eq!(t.policy().max_attempts(), 36);
    }

    #[test]
    fn running_observations_keep_polling() {
        let mut t = task(180);
        t.begin_attempt();
        assert_eq!(t.observe(PollObservation::Running).unwrap(), Advance::Continue);
        assert_eq!(t.status(), TaskStatus::Running);
        assert_eq!(t.observe(PollObservation::Unavailable).unwrap(), Advance::Continue);
    }

    #[test]
    fn success_yields_the_result_url() {
        let mut t = task(180);
        t.begin_attempt();
        let advance = t
            .observe(PollObservation::Succeeded {
                result_url: Some("https://x/img.png".into()),
            })
            .unwrap();
        assert_eq!(advance, Advance::Done("https://x/img.png".into()));
        assert_eq!(t.status(), TaskStatus::Succeeded);
        assert_eq!(t.result_url(), Some("https://x/img.png"));
    }

    #[test]
    fn success_without_url_is_a_protocol_error() {
        let mut t = task(180);
        t.begin_attempt();
        let err = t
            .observe(PollObservation::Succeeded { result_url: None })
            .unwrap_err();
        assert!(matches!(err, GenerationError::Protocol { .. }));
        assert_eq!(t.status(), TaskStatus::Failed);
    }

    #[test]
    fn failure_carries_provider_message() {
        let mut t = task(180);
        t.begin_attempt();
        let err = t
            .observe(PollObservation::Failed {
                message: Some("content rejected".into()),
            })
            .unwrap_err();
        match err {
            GenerationError::TaskFailed { message, .. } => assert_eq!(message, "content rejected"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn failure_without_message_uses_a_placeholder() {
        let mut t = task(180);
        let err = t.observe(PollObservation::Failed { message: None }).unwrap_err();
        assert_eq!(err.to_string(), "Volcengine task failed: Unknown error");
    }

    #[test]
    fn terminal_states_are_absorbing() {
        let mut t = task(180);
        t.observe(PollObservation::Succeeded {
            result_url: Some("https://x/a.png".into()),
        })
        .unwrap();

        let again = t.observe(PollObservation::Failed { message: None }).unwrap();
        assert_eq!(again, Advance::Done("https://x/a.png".into()));
        assert_eq!(t.status(), TaskStatus::Succeeded);
        assert_eq!(t.begin_attempt(), None);

        t.expire();
        assert_eq!(t.status(), TaskStatus::Succeeded);
    }

    #[test]
    fn failed_task_ignores_later_success() {
        let mut t = task(180);
        let _ = t.observe(PollObservation::Failed {
            message: Some("boom".into()),
        });
        let err = t
            .observe(PollObservation::Succeeded {
                result_url: Some("https://x/late.png".into()),
            })
            .unwrap_err();
        assert!(matches!(err, GenerationError::TaskFailed { .. }));
        assert_eq!(t.result_url(), None);
    }

    #[test]
    fn budget_is_enforced_and_expiry_is_terminal() {
        let mut t = task(10);
        assert_eq!(t.begin_attempt(), Some(1));
        assert_eq!(t.begin_attempt(), Some(2));
        assert_eq!(t.begin_attempt(), None);

        let err = t.expire();
        assert!(matches!(err, GenerationError::TaskTimeout { .. }));
        assert_eq!(t.status(), TaskStatus::TimedOut);

        let after = t.observe(PollObservation::Succeeded {
            result_url: Some("https://x/late.png".into()),
        });
        assert!(matches!(after, Err(GenerationError::TaskTimeout { .. })));
        assert_eq!(t.status(), TaskStatus::TimedOut);
    }
}
