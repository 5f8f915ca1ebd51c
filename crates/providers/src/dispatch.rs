//! Closed-set dispatch from [`BackendKind`] to a concrete adapter.

use async_trait::async_trait;
use generation::{
    BackendKind, Credentials, GenerationBackend, GenerationError, GenerationOutcome,
    GenerationRequest, Submission,
};

use crate::{ModelScopeBackend, OpenRouterBackend, ProviderSettings, VolcengineBackend};

/// One adapter, built for one request.
#[derive(Debug)]
pub enum Backend {
    OpenRouter(OpenRouterBackend),
    ModelScope(ModelScopeBackend),
    Volcengine(VolcengineBackend),
}

impl Backend {
    /// Builds the adapter for `kind` from the resolved key.
    ///
    /// An absent or empty key is [`GenerationError::MissingCredential`]. The
    /// signed backend's key must be `"AccessKeyId:SecretAccessKey"`.
    pub fn build(
        kind: BackendKind,
        api_key: Option<&str>,
        settings: &ProviderSettings,
    ) -> Result<Self, GenerationError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingCredential { backend: kind })?;

        match kind {
            BackendKind::OpenRouter => {
                Ok(Self::OpenRouter(OpenRouterBackend::new(api_key, settings)?))
            }
            BackendKind::ModelScope => {
                Ok(Self::ModelScope(ModelScopeBackend::new(api_key, settings)?))
            }
            BackendKind::Volcengine => {
                let credentials = Credentials::parse(api_key)?;
                Ok(Self::Volcengine(VolcengineBackend::new(credentials, settings)?))
            }
        }
    }

    fn inner(&self) -> &dyn GenerationBackend {
        match self {
            Self::OpenRouter(b) => b,
            Self::ModelScope(b) => b,
            Self::Volcengine(b) => b,
        }
    }
}

#[async_trait]
impl GenerationBackend for Backend {
    fn kind(&self) -> BackendKind {
        self.inner().kind()
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Submission, GenerationError> {
        self.inner().submit(request).await
    }

    async fn await_result(
        &self,
        submission: Submission,
    ) -> Result<GenerationOutcome, GenerationError> {
        self.inner().await_result(submission).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_builds_its_adapter() {
        let settings = ProviderSettings::default();
        for kind in [BackendKind::OpenRouter, BackendKind::ModelScope, BackendKind::Volcengine] {
            let backend = Backend::build(kind, Some("AKLTexample:c2VjcmV0"), &settings).unwrap();
            assert_eq!(backend.kind(), kind);
        }
    }

    #[test]
    fn missing_or_blank_key_is_a_missing_credential() {
        let settings = ProviderSettings::default();
        for key in [None, Some(""), Some("   ")] {
            let err = Backend::build(BackendKind::ModelScope, key, &settings).unwrap_err();
            assert!(matches!(
                err,
                GenerationError::MissingCredential { backend: BackendKind::ModelScope }
            ));
        }
    }

    #[test]
    fn malformed_signed_credential_is_a_validation_error() {
        let err = Backend::build(
            BackendKind::Volcengine,
            Some("no-separator"),
            &ProviderSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::Validation { .. }));
    }
}
