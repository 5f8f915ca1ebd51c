//! Error and retry-policy types for the generation domain.
//!
//! [`GenerationError`] is the single error type flowing out of every backend
//! adapter. The gateway maps each variant to an HTTP status code; nothing here
//! is fatal to the process.
//!
//! [`RetryPolicy`] is a cross-cutting concern: the task poller asks every
//! status-call failure for its policy and swallows only the retryable ones.

use std::time::Duration;

use thiserror::Error;

use crate::{BackendKind, CredentialError};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry on the next poll attempt.
///
/// ## Rules
///
/// - `Retryable`: non-2xx responses and network failures.
/// - `NonRetryable`: validation, protocol violations, provider-reported task
///   failure, timeout, signing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// The failed call may be repeated; the attempt is consumed.
    Retryable,
    /// The failure must be surfaced to the caller.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Generation errors
// ---------------------------------------------------------------------------

/// Every way a generation request can fail.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The inbound request is unusable: missing prompt, out-of-range
    /// resolution, malformed credential string, text where an image was
    /// expected.
    ///
    /// Always detected before (or instead of) a provider round-trip.
    #[error("{message}")]
    Validation {
        /// Human-readable description returned to the caller as-is.
        message: String,
    },

    /// Neither the request nor the server configuration supplies a key.
    #[error("{backend} API key is not set.")]
    MissingCredential {
        /// Backend whose key is missing.
        backend: BackendKind,
    },

    /// A provider answered a call with a non-2xx status.
    #[error("{backend} API error: {status} - {body}")]
    Upstream {
        /// Backend that produced the response.
        backend: BackendKind,
        /// HTTP status code.
        status: u16,
        /// Response body text, for diagnostics.
        body: String,
    },

    /// The provider could not be reached or the response body could not be
    /// read.
    #[error("{backend} transport error: {message}")]
    Transport {
        /// Backend being called.
        backend: BackendKind,
        /// Underlying I/O failure description.
        message: String,
    },

    /// A response lacked a field the protocol requires, e.g. no task id after
    /// submit or no image URL after a success marker.
    #[error("{backend} protocol error: {message}")]
    Protocol {
        /// Backend that produced the response.
        backend: BackendKind,
        /// What was missing or malformed.
        message: String,
    },

    /// The provider explicitly reported the task as failed.
    #[error("{backend} task failed: {message}")]
    TaskFailed {
        /// Backend that ran the task.
        backend: BackendKind,
        /// Provider-supplied error message, or `"Unknown error"`.
        message: String,
    },

    /// The attempt budget ran out before a terminal status was observed.
    #[error("{backend} task timed out after {} seconds", .timeout.as_secs_f64())]
    TaskTimeout {
        /// Backend that ran the task.
        backend: BackendKind,
        /// The configured timeout the budget was derived from.
        timeout: Duration,
    },

    /// A cryptographic primitive failed while signing a request.
    #[error("request signing failed: {message}")]
    Signing {
        /// Description of the failure.
        message: String,
    },
}

impl GenerationError {
    /// Convenience constructor for [`GenerationError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`GenerationError::Protocol`].
    pub fn protocol(backend: BackendKind, message: impl Into<String>) -> Self {
        Self::Protocol {
            backend,
            message: message.into(),
        }
    }

    /// Whether a status call that failed this way may be retried.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Upstream { .. } | Self::Transport { .. } => RetryPolicy::Retryable,
            Self::Validation { .. }
            | Self::MissingCredential { .. }
            | Self::Protocol { .. }
            | Self::TaskFailed { .. }
            | Self::TaskTimeout { .. }
            | Self::Signing { .. } => RetryPolicy::NonRetryable,
        }
    }
}

impl From<CredentialError> for GenerationError {
    fn from(err: CredentialError) -> Self {
        Self::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        let upstream = GenerationError::Upstream {
            backend: BackendKind::ModelScope,
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(upstream.retry_policy(), RetryPolicy::Retryable);

        let protocol = GenerationError::protocol(BackendKind::Volcengine, "no image url");
        assert_eq!(protocol.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn timeout_message_names_the_budget() {
        let err = GenerationError::TaskTimeout {
            backend: BackendKind::Volcengine,
            timeout: Duration::from_secs(180),
        };
        assert_eq!(err.to_string(), "Volcengine task timed out after 180 seconds");
    }

    #[test]
    fn credential_errors_become_validation_errors() {
        let err: GenerationError = CredentialError::MissingSeparator.into();
        assert!(matches!(err, GenerationError::Validation { .. }));
    }
}
