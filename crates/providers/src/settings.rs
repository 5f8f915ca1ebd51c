use std::str::FromStr;
use std::time::Duration;

use generation::DEFAULT_POLL_INTERVAL;
use thiserror::Error;

pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1/";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-2.5-flash-image-preview";
pub const DEFAULT_MODELSCOPE_BASE_URL: &str = "https://api-inference.modelscope.cn/";
pub const DEFAULT_VOLCENGINE_ENDPOINT: &str = "https://visual.volcengineapi.com/";

/// The two observed response/action shapes of the signed backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolcengineProtocol {
    /// `CVGetTaskResult` polled by `GET` with a `TaskId` query parameter;
    /// fields under `Result.*`.
    V1,
    /// `CVSync2AsyncGetResult` polled by `POST` with a JSON body; fields under
    /// `data.*`.
    #[default]
    V2,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown Volcengine protocol {0:?} (expected \"v1\" or \"v2\")")]
pub struct UnknownProtocol(String);

impl FromStr for VolcengineProtocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

/// Upstream endpoints and polling cadence shared by every adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub openrouter_base_url: String,
    pub openrouter_model: String,
    pub modelscope_base_url: String,
    pub volcengine_endpoint: String,
    pub volcengine_region: String,
    pub volcengine_service: String,
    pub volcengine_protocol: VolcengineProtocol,
    pub poll_interval: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            openrouter_model: DEFAULT_OPENROUTER_MODEL.to_string(),
            modelscope_base_url: DEFAULT_MODELSCOPE_BASE_URL.to_string(),
            volcengine_endpoint: DEFAULT_VOLCENGINE_ENDPOINT.to_string(),
            volcengine_region: signing::signer::DEFAULT_REGION.to_string(),
            volcengine_service: signing::signer::DEFAULT_SERVICE.to_string(),
            volcengine_protocol: VolcengineProtocol::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
