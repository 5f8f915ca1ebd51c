//! Route handlers.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use generation::{
    BackendKind, GenerationBackend, GenerationOutcome, GenerationRequest, RequestId,
};
use providers::Backend;
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};

use crate::{error::ApiError, GatewayConfig};

pub type AppState = Arc<GatewayConfig>;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatus {
    pub is_set: bool,
}

/// `POST /generate`
pub async fn generate(
    State(config): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationOutcome>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        let err = ApiError::from(rejection);
        error!(error = %err, "rejected request body");
        err
    })?;

    let kind = request.backend_kind();
    let span = info_span!(
        "generate",
        request_id = %RequestId::new_random(),
        model = %request.model,
        backend = %kind,
        polled = kind.is_async(),
        signed = kind.is_signed(),
    );

    async move {
        let result = run(&config, kind, &request).await;
        match &result {
            Ok(_) => info!("request completed"),
            Err(err) => error!(error = %err, "request failed"),
        }
        result.map(Json).map_err(ApiError::from)
    }
    .instrument(span)
    .await
}

async fn run(
    config: &GatewayConfig,
    kind: BackendKind,
    request: &GenerationRequest,
) -> Result<GenerationOutcome, generation::GenerationError> {
    let api_key = request
        .apikey
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| config.default_key(kind));
    let backend = Backend::build(kind, api_key, &config.providers)?;
    backend.generate(request).await
}

/// `GET /api/key-status`
pub async fn openrouter_key_status(State(config): State<AppState>) -> Json<KeyStatus> {
    key_status(&config, BackendKind::OpenRouter)
}

/// `GET /api/modelscope-key-status`
pub async fn modelscope_key_status(State(config): State<AppState>) -> Json<KeyStatus> {
    key_status(&config, BackendKind::ModelScope)
}

/// `GET /api/volcengine-key-status`
pub async fn volcengine_key_status(State(config): State<AppState>) -> Json<KeyStatus> {
    key_status(&config, BackendKind::Volcengine)
}

fn key_status(config: &GatewayConfig, kind: BackendKind) -> Json<KeyStatus> {
    Json(KeyStatus {
        is_set: config.default_key(kind).is_some(),
    })
}
