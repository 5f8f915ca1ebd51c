//! Produces the `Authorization` header for a signed request.

use generation::{Credentials, Timestamp};
use tracing::debug;

use crate::{
    canonical::CanonicalRequest,
    key::{credential_scope, derive_signing_key},
    SignableRequest, Sha256Crypto, SigningCrypto, SigningError,
};

/// Algorithm label at the start of the string to sign and the header.
pub const ALGORITHM: &str = "HMAC-SHA256";

pub const AUTHORIZATION_HEADER: &str = "Authorization";

pub const DEFAULT_REGION: &str = "cn-north-1";
pub const DEFAULT_SERVICE: &str = "cv";
pub const DEFAULT_HOST: &str = "visual.volcengineapi.com";

/// The headers to attach to a signed request: every signed header plus
/// `Authorization`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    headers: Vec<(String, String)>,
}

impl SignedHeaders {
    /// Looks a header up by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.get(AUTHORIZATION_HEADER)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Signs requests for one region/service/host.
///
/// `sign` is a pure function of its arguments: the clock is read by the
/// caller and passed in, and the signing key is derived on every call.
#[derive(Debug, Clone)]
pub struct Signer<C = Sha256Crypto> {
    region: String,
    service: String,
    host: String,
    crypto: C,
}

impl Signer<Sha256Crypto> {
    pub fn new(
        region: impl Into<String>,
        service: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self::with_crypto(region, service, host, Sha256Crypto)
    }
}

impl Default for Signer<Sha256Crypto> {
    fn default() -> Self {
        Self::new(DEFAULT_REGION, DEFAULT_SERVICE, DEFAULT_HOST)
    }
}

impl<C: SigningCrypto> Signer<C> {
    pub fn with_crypto(
        region: impl Into<String>,
        service: impl Into<String>,
        host: impl Into<String>,
        crypto: C,
    ) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
            host: host.into(),
            crypto,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Signs `request` as of `now`.
    ///
    /// ```text
    /// stringToSign = "HMAC-SHA256" \n X-Date \n scope \n hex(sha256(canonicalRequest))
    /// signature    = hex(HMAC(signingKey, stringToSign))
    /// ```
    pub fn sign(
        &self,
        credentials: &Credentials,
        request: &SignableRequest,
        now: Timestamp,
    ) -> Result<SignedHeaders, SigningError> {
        let x_date = now.to_basic_iso8601();
        let date = now.to_date_stamp();

        let canonical = CanonicalRequest::build(&self.crypto, request, &self.host, &x_date);
        let scope = credential_scope(&date, &self.region, &self.service);
        let string_to_sign = [
            ALGORITHM,
            x_date.as_str(),
            scope.as_str(),
            self.crypto.sha256_hex(canonical.as_str().as_bytes()).as_str(),
        ]
        .join("\n");

        let key = derive_signing_key(
            &self.crypto,
            credentials.secret_access_key(),
            &date,
            &self.region,
            &self.service,
        )?;
        let signature = hex::encode(
            self.crypto
                .hmac_sha256(key.as_bytes(), string_to_sign.as_bytes())?,
        );

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            credentials.access_key_id(),
            canonical.signed_header_names(),
        );

        debug!(
            method = request.method(),
            scope = %scope,
            signed_headers = canonical.signed_header_names(),
            "request signed"
        );

        let mut headers = canonical.into_headers();
        headers.push((AUTHORIZATION_HEADER.to_string(), authorization));
        Ok(SignedHeaders { headers })
    }
}
