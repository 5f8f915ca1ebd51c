//! Core domain for the image generation relay.
//!
//! This crate contains every domain concept, newtype identifier, value type,
//! and error type used throughout the relay. Infrastructure crates implement
//! the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a backend must do; the `providers` crate defines *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`TaskId`, `RequestId`) |
//! | [`types`] | Value types with invariants (`PollPolicy`, `Resolution`, `Timestamp`) |
//! | [`credentials`] | Access-key pairs for the signed backend |
//! | [`task`] | The asynchronous task state machine |
//! | [`backend`] | Backend selection, request/outcome shapes, the port trait |
//! | [`errors`] | `GenerationError` and `RetryPolicy` |

pub mod backend;
pub mod credentials;
pub mod errors;
pub mod identifiers;
pub mod task;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use backend::{
    BackendKind, GenerationBackend, GenerationOutcome, GenerationRequest, Submission,
};
pub use credentials::{diagnostic_prefix, CredentialError, Credentials};
pub use errors::{GenerationError, RetryPolicy};
pub use identifiers::{RequestId, TaskId};
pub use task::{Advance, GenerationTask, PollObservation, TaskStatus};
pub use types::{
    PollPolicy, Resolution, Timestamp, DEFAULT_POLL_INTERVAL, MAX_RESOLUTION_AREA,
    MIN_RESOLUTION_AREA,
};
