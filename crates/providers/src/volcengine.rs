//! Signed asynchronous backend (Volcengine visual API).
//!
//! Every call, submit and poll alike, is individually signed with a fresh
//! timestamp. Submit posts a `CVSync2AsyncSubmitTask` action; the poll action
//! and response field names depend on [`VolcengineProtocol`].

use std::time::Duration;

use async_trait::async_trait;
use generation::{
    diagnostic_prefix, BackendKind, Credentials, GenerationBackend, GenerationError,
    GenerationOutcome, GenerationRequest, GenerationTask, PollObservation, Resolution, Submission,
    TaskId, Timestamp,
};
use reqwest::Method;
use serde_json::{json, Value};
use signing::{canonical::canonical_query_string, SignableRequest, Signer};
use tracing::{debug, info, instrument};

use crate::{
    http::{http_client, response_json_or_error, string_at, transport_error},
    poller::{await_task, poll_policy, StatusSource},
    ProviderSettings, VolcengineProtocol,
};

const BACKEND: BackendKind = BackendKind::Volcengine;

pub const API_VERSION: &str = "2022-08-31";
pub const SUBMIT_ACTION: &str = "CVSync2AsyncSubmitTask";
pub const V1_RESULT_ACTION: &str = "CVGetTaskResult";
pub const V2_RESULT_ACTION: &str = "CVSync2AsyncGetResult";
pub const REQ_KEY: &str = "jimeng_t2i_v40";

pub const MAX_PROMPT_CHARS: usize = 800;
pub const DEFAULT_SIZE: &str = "2048x2048";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Validated submit parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitParams {
    pub prompt: String,
    pub resolution: Resolution,
    pub force_single: bool,
}

impl SubmitParams {
    /// Checks prompt length and output resolution without touching the
    /// network.
    ///
    /// Dimensions come from `parameters.width`/`height` when either is given
    /// (both must then be positive integers), otherwise from
    /// `parameters.size` (`"WxH"`, default `"2048x2048"`).
    pub fn from_request(request: &GenerationRequest) -> Result<Self, GenerationError> {
        let prompt = request.parameter_str("prompt").ok_or_else(|| {
            GenerationError::validation("Prompt is required for Volcengine models.")
        })?;
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(GenerationError::validation(format!(
                "Prompt must not exceed {MAX_PROMPT_CHARS} characters."
            )));
        }

        let (width, height) = if request.has_parameter("width") || request.has_parameter("height") {
            (
                explicit_dimension(request, "width")?,
                explicit_dimension(request, "height")?,
            )
        } else {
            let size = request.parameter_str("size").unwrap_or(DEFAULT_SIZE);
            Resolution::parse_dimensions(size).ok_or_else(|| {
                GenerationError::validation(format!(
                    "Invalid size {size:?}; expected WIDTHxHEIGHT."
                ))
            })?
        };
        let resolution = Resolution::new(width, height).ok_or_else(|| {
            GenerationError::validation(format!(
                "Resolution {width}x{height} is outside the supported range 1024x1024 to 4096x4096."
            ))
        })?;

        Ok(Self {
            prompt: prompt.to_string(),
            resolution,
            force_single: request.parameter_u64("count") == Some(1),
        })
    }

    fn to_body(&self) -> Value {
        json!({
            "req_key": REQ_KEY,
            "prompt": self.prompt,
            "width": self.resolution.width(),
            "height": self.resolution.height(),
            "force_single": self.force_single,
        })
    }
}

fn explicit_dimension(request: &GenerationRequest, key: &str) -> Result<u32, GenerationError> {
    let value = request
        .parameter_u64(key)
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            GenerationError::validation(format!(
                "Parameter {key} must be a positive integer when width or height is given."
            ))
        })?;
    u32::try_from(value)
        .map_err(|_| GenerationError::validation(format!("Image dimension {value} is too large.")))
}

/// Adapter for the signed backend. Holds one request's credentials.
#[derive(Debug)]
pub struct VolcengineBackend {
    client: reqwest::Client,
    origin: String,
    signer: Signer,
    credentials: Credentials,
    protocol: VolcengineProtocol,
    poll_interval: Duration,
    clock: fn() -> Timestamp,
}

impl VolcengineBackend {
    pub fn new(
        credentials: Credentials,
        settings: &ProviderSettings,
    ) -> Result<Self, GenerationError> {
        let endpoint = reqwest::Url::parse(&settings.volcengine_endpoint).map_err(|e| {
            GenerationError::protocol(BACKEND, format!("invalid endpoint URL: {e}"))
        })?;
        let host = endpoint
            .host_str()
            .ok_or_else(|| GenerationError::protocol(BACKEND, "endpoint URL has no host"))?;
        let host = match endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            client: http_client(BACKEND)?,
            origin: format!("{}://{host}", endpoint.scheme()),
            signer: Signer::new(
                settings.volcengine_region.clone(),
                settings.volcengine_service.clone(),
                host,
            ),
            credentials,
            protocol: settings.volcengine_protocol,
            poll_interval: settings.poll_interval,
            clock: Timestamp::now,
        })
    }

    /// Replaces the wall clock read before every signed call.
    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    /// Signs `request` with a freshly read timestamp and sends it.
    async fn send_signed(&self, request: &SignableRequest) -> Result<Value, GenerationError> {
        let headers = self
            .signer
            .sign(&self.credentials, request, (self.clock)())?;
        let method = Method::from_bytes(request.method().as_bytes()).map_err(|e| {
            GenerationError::protocol(BACKEND, format!("invalid HTTP method: {e}"))
        })?;
        let url = format!(
            "{}{}?{}",
            self.origin,
            request.path(),
            canonical_query_string(request.query())
        );

        let mut builder = self.client.request(method, &url);
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        let response = builder
            .body(request.body().to_vec())
            .send()
            .await
            .map_err(|e| transport_error(BACKEND, &e))?;
        response_json_or_error(BACKEND, response).await
    }

    fn submit_request(params: &SubmitParams) -> SignableRequest {
        SignableRequest::new("POST", "/")
            .with_query("Action", SUBMIT_ACTION)
            .with_query("Version", API_VERSION)
            .with_body(params.to_body().to_string())
    }

    fn status_request(&self, task_id: &TaskId) -> SignableRequest {
        match self.protocol {
            VolcengineProtocol::V1 => SignableRequest::new("GET", "/")
                .with_query("Action", V1_RESULT_ACTION)
                .with_query("Version", API_VERSION)
                .with_query("TaskId", task_id.as_str()),
            VolcengineProtocol::V2 => SignableRequest::new("POST", "/")
                .with_query("Action", V2_RESULT_ACTION)
                .with_query("Version", API_VERSION)
                .with_body(
                    json!({ "req_key": REQ_KEY, "task_id": task_id.as_str() }).to_string(),
                ),
        }
    }
}

/// Extracts the task id from a submit response.
pub fn parse_task_id(protocol: VolcengineProtocol, payload: &Value) -> Option<TaskId> {
    let pointer = match protocol {
        VolcengineProtocol::V1 => "/Result/TaskId",
        VolcengineProtocol::V2 => "/data/task_id",
    };
    string_at(payload, pointer).and_then(TaskId::new)
}

/// Maps a status response onto the shared poll vocabulary.
pub fn parse_status(protocol: VolcengineProtocol, payload: &Value) -> PollObservation {
    match protocol {
        VolcengineProtocol::V1 => {
            match payload.pointer("/Result/Status").and_then(Value::as_str) {
                Some("done") => PollObservation::Succeeded {
                    result_url: string_at(payload, "/Result/Data/image_urls/0"),
                },
                Some("failed") => PollObservation::Failed {
                    message: string_at(payload, "/Result/ErrorMessage"),
                },
                _ => PollObservation::Running,
            }
        }
        VolcengineProtocol::V2 => match payload.pointer("/data/status").and_then(Value::as_str) {
            Some("done") => PollObservation::Succeeded {
                result_url: string_at(payload, "/data/image_urls/0"),
            },
            Some("failed" | "not_found" | "expired") => PollObservation::Failed {
                message: string_at(payload, "/message"),
            },
            Some("in_queue") => PollObservation::Pending,
            _ => PollObservation::Running,
        },
    }
}

#[async_trait]
impl StatusSource for VolcengineBackend {
    async fn fetch_status(&self, task_id: &TaskId) -> Result<PollObservation, GenerationError> {
        let payload = self.send_signed(&self.status_request(task_id)).await?;
        debug!(task_id = %task_id, payload = %payload, "status response");
        Ok(parse_status(self.protocol, &payload))
    }
}

#[async_trait]
impl GenerationBackend for VolcengineBackend {
    fn kind(&self) -> BackendKind {
        BACKEND
    }

    #[instrument(skip_all, fields(backend = %BACKEND))]
    async fn submit(&self, request: &GenerationRequest) -> Result<Submission, GenerationError> {
        let params = SubmitParams::from_request(request)?;
        let timeout = request
            .timeout_secs()
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        let policy = poll_policy(self.poll_interval, timeout)?;

        info!(
            protocol = ?self.protocol,
            access_key = %diagnostic_prefix(self.credentials.access_key_id()),
            resolution = %params.resolution,
            force_single = params.force_single,
            "submitting task"
        );
        let payload = self.send_signed(&Self::submit_request(&params)).await?;
        debug!(payload = %payload, "submit response");

        let task_id = parse_task_id(self.protocol, &payload).ok_or_else(|| {
            GenerationError::protocol(BACKEND, "API response did not contain a task id")
        })?;
        info!(task_id = %task_id, "task submitted");
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
