//! Provider adapters for the image-generation relay.
//!
//! Implements the [`generation::GenerationBackend`] port once per upstream
//! provider and selects between them through the closed [`Backend`] enum.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response
//! parsing, and task polling live here. The gateway sees only [`Backend`] and
//! the [`generation`] types.
//!
//! | Module | Backend | Shape |
//! |--------|---------|-------|
//! | [`openrouter`] | `nanobanana` | one chat-completion round-trip |
//! | [`modelscope`] | any other model | bearer submit, then poll |
//! | [`volcengine`] | `volcengine` | signed submit, then signed polls |
//!
//! The asynchronous adapters share [`poller::await_task`].

mod dispatch;
mod http;
mod settings;

pub mod modelscope;
pub mod openrouter;
pub mod poller;
pub mod volcengine;

pub use dispatch::Backend;
pub use modelscope::ModelScopeBackend;
pub use openrouter::OpenRouterBackend;
pub use poller::{await_task, poll_policy, StatusSource};
pub use settings::{
    ProviderSettings, UnknownProtocol, VolcengineProtocol, DEFAULT_MODELSCOPE_BASE_URL,
    DEFAULT_OPENROUTER_BASE_URL, DEFAULT_OPENROUTER_MODEL, DEFAULT_VOLCENGINE_ENDPOINT,
};
pub use volcengine::VolcengineBackend;
