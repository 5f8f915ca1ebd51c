//! The backend port: inbound request shape, backend selection, and the
//! `{submit, await_result}` capability every provider adapter implements.
//!
//! ## Architectural Layer
//!
//! **Port definition.** The [`GenerationBackend`] trait is implemented by the
//! `providers` crate; the gateway only ever sees this trait and
//! [`BackendKind`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{GenerationError, GenerationTask};

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// The closed set of provider backends.
///
/// Adding a backend means adding a variant here; every dispatch site is an
/// exhaustive `match`, so the compiler lists what else must change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Synchronous chat-completion backend; one round-trip, no polling.
    OpenRouter,
    /// Asynchronous backend with bearer-token submit and unsigned polling.
    ModelScope,
    /// Asynchronous backend where every call is request-signed.
    Volcengine,
}

impl BackendKind {
    /// Model identifier that routes to [`BackendKind::OpenRouter`].
    pub const OPENROUTER_MODEL: &'static str = "nanobanana";

    /// Model identifier that routes to [`BackendKind::Volcengine`].
    pub const VOLCENGINE_MODEL: &'static str = "volcengine";

    /// Selects the backend for a caller-supplied model identifier.
    ///
    /// Any identifier other than the two reserved names is a ModelScope model
    /// and is forwarded upstream unchanged.
    pub fn for_model(model: &str) -> Self {
        match model {
            Self::OPENROUTER_MODEL => Self::OpenRouter,
            Self::VOLCENGINE_MODEL => Self::Volcengine,
            _ => Self::ModelScope,
        }
    }

    /// Whether the backend's calls are individually request-signed.
    pub fn is_signed(self) -> bool {
        matches!(self, Self::Volcengine)
    }

    /// Whether the backend returns a task id that must be polled.
    pub fn is_async(self) -> bool {
        !matches!(self, Self::OpenRouter)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OpenRouter => "OpenRouter",
            Self::ModelScope => "ModelScope",
            Self::Volcengine => "Volcengine",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// Body of `POST /generate`.
///
/// Which fields matter depends on the backend: the chat backend reads
/// `prompt` and `images`; the asynchronous backends read
/// `parameters.prompt` and forward the rest of `parameters`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier; selects the backend.
    #[serde(default)]
    pub model: String,

    /// Caller-supplied key. Falls back to the server-side default when absent.
    #[serde(default)]
    pub apikey: Option<String>,

    /// Prompt for the chat backend.
    #[serde(default)]
    pub prompt: Option<String>,

    /// Reference images (URLs or data URLs) for the chat backend.
    #[serde(default)]
    pub images: Option<Vec<String>>,

    /// Provider parameters for the asynchronous backends.
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,

    /// Timeout in seconds for asynchronous backends. `0` means "use default".
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl GenerationRequest {
    /// The backend this request routes to.
    pub fn backend_kind(&self) -> BackendKind {
        BackendKind::for_model(&self.model)
    }

    /// A string entry of `parameters`, if present and non-empty.
    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters
            .as_ref()?
            .get(key)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Whether `parameters` has an entry for `key`, whatever its value.
    pub fn has_parameter(&self, key: &str) -> bool {
        self.parameters
            .as_ref()
            .is_some_and(|parameters| parameters.contains_key(key))
    }

    /// An unsigned integer entry of `parameters`.
    ///
    /// Accepts JSON numbers and numeric strings, since browser forms often
    /// send the latter.
    pub fn parameter_u64(&self, key: &str) -> Option<u64> {
        match self.parameters.as_ref()?.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The explicit timeout, treating `0` as absent.
    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout.filter(|t| *t > 0)
    }
}

/// Successful result of a generation request, serialised as the
/// `POST /generate` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    /// URL (or data URL) of the generated image.
    pub image_url: String,

    /// Text the model returned alongside the image, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl GenerationOutcome {
    pub fn image(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            content: None,
        }
    }
}

/// What a backend's `submit` produced.
#[derive(Debug)]
pub enum Submission {
    /// A synchronous backend finished in one round-trip.
    Completed(GenerationOutcome),
    /// An asynchronous backend accepted a task that must be polled.
    Accepted(GenerationTask),
}

// ---------------------------------------------------------------------------
// Port trait
// ---------------------------------------------------------------------------

/// The capability pair every provider adapter implements.
///
/// `submit` validates the request before any network call and then issues the
/// initial provider request. `await_result` drives an accepted task to a
/// terminal state; for a completed submission it returns immediately.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Which backend this adapter talks to.
    fn kind(&self) -> BackendKind;

    /// Validates `request` and issues the initial provider call.
    async fn submit(&self, request: &GenerationRequest) -> Result<Submission, GenerationError>;

    /// Waits for a submission to produce an image.
    async fn await_result(&self, submission: Submission)
        -> Result<GenerationOutcome, GenerationError>;

    /// Submits and waits in one step.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let submission = self.submit(request).await?;
        self.await_result(submission).await
    }
}
