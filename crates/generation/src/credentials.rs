//! Access-key credentials for the signed backend.
//!
//! Credentials arrive as one `"AccessKeyId:SecretAccessKey"` string, either in
//! the request's `apikey` field or from the server-side default. They live only
//! for the duration of one request and are never written to logs in full.

use thiserror::Error;

/// Number of leading characters of a key that may appear in diagnostics.
const DIAGNOSTIC_PREFIX_LEN: usize = 4;

/// Returned when a credential string cannot be split into its two parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("credential must have the form AccessKeyId:SecretAccessKey")]
    MissingSeparator,

    #[error("credential access key id is empty")]
    EmptyAccessKeyId,

    #[error("credential secret access key is empty")]
    EmptySecret,
}

/// An access key pair. Both halves are guaranteed non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
}

impl Credentials {
    /// Parses `"id:secret"`, splitting at the first `:` so the secret may
    /// itself contain colons.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let (id, secret) = raw
            .trim()
            .split_once(':')
            .ok_or(CredentialError::MissingSeparator)?;
        Self::new(id, secret)
    }

    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();
        if access_key_id.is_empty() {
            return Err(CredentialError::EmptyAccessKeyId);
        }
        if secret_access_key.is_empty() {
            return Err(CredentialError::EmptySecret);
        }
        Ok(Self {
            access_key_id,
            secret_access_key,
        })
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &diagnostic_prefix(&self.access_key_id))
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Shortens a key to a log-safe prefix such as `"AKLT..."`.
pub fn diagnostic_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(DIAGNOSTIC_PREFIX_LEN).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_and_secret() {
        let creds = Credentials::parse("AKLTexample:c2VjcmV0").unwrap();
        assert_eq!(creds.access_key_id(), "AKLTexample");
        assert_eq!(creds.secret_access_key(), "c2VjcmV0");
    }

    #[test]
    fn secret_may_contain_colons() {
        let creds = Credentials::parse("id:se:cret").unwrap();
        assert_eq!(creds.secret_access_key(), "se:cret");
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert_eq!(
            Credentials::parse("no-separator"),
            Err(CredentialError::MissingSeparator)
        );
        assert_eq!(
            Credentials::parse(":secret"),
            Err(CredentialError::EmptyAccessKeyId)
        );
        assert_eq!(Credentials::parse("id:"), Err(CredentialError::EmptySecret));
    }

    #[test]
    fn debug_output_never_contains_the_secret() {
        let creds = Credentials::parse("AKLTexample:topsecret").unwrap();
        let printed = format!("{creds:?}");
        assert!(!printed.contains("topsecret"));
        assert!(printed.contains("AKLT..."));
    }
}
