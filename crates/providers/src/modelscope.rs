//! Bearer-token asynchronous backend (ModelScope inference API).

use std::time::Duration;

use async_trait::async_trait;
use generation::{
    diagnostic_prefix, BackendKind, GenerationBackend, GenerationError, GenerationOutcome,
    GenerationRequest, GenerationTask, PollObservation, Submission, TaskId,
};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::{
    http::{http_client, join_url, response_json_or_error, string_at, transport_error},
    poller::{await_task, poll_policy, StatusSource},
    ProviderSettings,
};

const BACKEND: BackendKind = BackendKind::ModelScope;

pub const ASYNC_MODE_HEADER: &str = "X-ModelScope-Async-Mode";
pub const TASK_TYPE_HEADER: &str = "X-ModelScope-Task-Type";
pub const TASK_TYPE_IMAGE_GENERATION: &str = "image_generation";

/// Models whose name contains this marker get the shorter default timeout.
const FAST_MODEL_MARKER: &str = "Qwen";
const FAST_MODEL_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Default timeout for `model` when the request names none.
pub fn default_timeout(model: &str) -> Duration {
    if model.contains(FAST_MODEL_MARKER) {
        FAST_MODEL_TIMEOUT
    } else {
        DEFAULT_TIMEOUT
    }
}

#[derive(Debug)]
pub struct ModelScopeBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
}

impl ModelScopeBackend {
    pub fn new(
        api_key: impl Into<String>,
        settings: &ProviderSettings,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(BACKEND)?,
            base_url: settings.modelscope_base_url.clone(),
            api_key: api_key.into(),
            poll_interval: settings.poll_interval,
        })
    }

    /// `{model, ...parameters}`; the caller's parameters are forwarded as-is.
    fn submit_body(request: &GenerationRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), Value::String(request.model.clone()));
        if let Some(parameters) = &request.parameters {
            for (key, value) in parameters {
                body.insert(key.clone(), value.clone());
            }
        }
        Value::Object(body)
    }
}

/// Maps a `v1/tasks/{id}` response onto the shared poll vocabulary.
pub fn parse_status(payload: &Value) -> PollObservation {
    match payload.get("task_status").and_then(Value::as_str) {
        Some("SUCCEED") => PollObservation::Succeeded {
            result_url: string_at(payload, "/output/images/0/url")
                .or_else(|| string_at(payload, "/output_images/0")),
        },
        Some("FAILED") => PollObservation::Failed {
            message: string_at(payload, "/message"),
        },
        Some("PENDING") => PollObservation::Pending,
        _ => PollObservation::Running,
    }
}

#[async_trait]
impl StatusSource for ModelScopeBackend {
    async fn fetch_status(&self, task_id: &TaskId) -> Result<PollObservation, GenerationError> {
        let url = join_url(&self.base_url, &format!("v1/tasks/{task_id}"));
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .header(TASK_TYPE_HEADER, TASK_TYPE_IMAGE_GENERATION)
            .send()
            .await
            .map_err(|e| transport_error(BACKEND, &e))?;
        let payload = response_json_or_error(BACKEND, response).await?;
        debug!(task_id = %task_id, task_status = ?payload.get("task_status"), "status response");
        Ok(parse_status(&payload))
    }
}

#[async_trait]
impl GenerationBackend for ModelScopeBackend {
    fn kind(&self) -> BackendKind {
        BACKEND
    }

    #[instrument(skip_all, fields(backend = %BACKEND, model = %request.model))]
    async fn submit(&self, request: &GenerationRequest) -> Result<Submission, GenerationError> {
        if request.parameter_str("prompt").is_none() {
            return Err(GenerationError::validation(
                "Positive prompt is required for ModelScope models.",
            ));
        }
        let timeout = request
            .timeout_secs()
            .map_or_else(|| default_timeout(&request.model), Duration::from_secs);
        let policy = poll_policy(self.poll_interval, timeout)?;

        info!(api_key = %diagnostic_prefix(&self.api_key), "submitting task");
        let response = self
            .client
            .post(join_url(&self.base_url, "v1/images/generations"))
            .bearer_auth(&self.api_key)
            .header(ASYNC_MODE_HEADER, "true")
            .json(&Self::submit_body(request))
            .send()
            .await
            .map_err(|e| transport_error(BACKEND, &e))?;
        let payload = response_json_or_error(BACKEND, response).await?;

        let task_id = string_at(&payload, "/task_id")
            .and_then(TaskId::new)
            .ok_or_else(|| GenerationError::protocol(BACKEND, "API did not return a task_id"))?;
        info!(task_id = %task_id, timeout_secs = timeout.as_secs(), "task submitted");
        Ok(Submission::Accepted(GenerationTask::submitted(task_id, BACKEND, policy)))
    }

    async fn await_result(
        &self,
        submission: Submission,
    ) -> Result<GenerationOutcome, GenerationError> {
        match submission {
            Submission::Completed(outcome) => Ok(outcome),
            Submission::Accepted(task) => {
                await_task(self, task).await.map(GenerationOutcome::image)
            }
        }
    }
}
