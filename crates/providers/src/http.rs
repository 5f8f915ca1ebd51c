//! Shared HTTP plumbing for the provider adapters.

use generation::{BackendKind, GenerationError};
use reqwest::Response;
use serde_json::Value;

/// Longest upstream body excerpt carried in an error message.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Builds a client that keeps no idle connections: every call opens its own.
pub(crate) fn http_client(backend: BackendKind) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|e| transport_error(backend, &e))
}

pub(crate) fn transport_error(backend: BackendKind, err: &reqwest::Error) -> GenerationError {
    GenerationError::Transport {
        backend,
        message: err.to_string(),
    }
}

/// Reads a JSON body, turning non-2xx statuses into [`GenerationError::Upstream`]
/// and undecodable bodies into [`GenerationError::Protocol`].
pub(crate) async fn response_json_or_error(
    backend: BackendKind,
    response: Response,
) -> Result<Value, GenerationError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(backend, &e))?;
    if !status.is_success() {
        return Err(GenerationError::Upstream {
            backend,
            status: status.as_u16(),
            body: truncate_text(&body, MAX_ERROR_BODY_CHARS),
        });
    }
    serde_json::from_str(&body).map_err(|e| {
        GenerationError::protocol(backend, format!("response is not valid JSON: {e}"))
    })
}

/// Joins a base URL and a relative path with exactly one `/` between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// First string at `pointer`, also accepting a number (some providers send
/// numeric task ids).
pub(crate) fn string_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
