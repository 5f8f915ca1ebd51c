//! Canonical request construction.
//!
//! ```text
//! METHOD \n PATH \n SORTED_QUERY \n CANONICAL_HEADERS \n SIGNED_HEADER_NAMES \n HEX(SHA256(BODY))
//! ```
//!
//! `CANONICAL_HEADERS` is one `name:value\n` line per header, so the block is
//! followed by an empty line before the signed-header list.

use std::collections::BTreeMap;

use crate::{encoding::url_encode, SignableRequest, SigningCrypto};

pub const HOST_HEADER: &str = "Host";
pub const DATE_HEADER: &str = "X-Date";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// The canonical form of one request plus the header set it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    text: String,
    signed_header_names: String,
    headers: Vec<(String, String)>,
}

impl CanonicalRequest {
    /// Builds the canonical request for `request` as sent to `host` at
    /// `x_date` (`YYYYMMDDTHHMMSSZ`).
    ///
    /// `Host`, `X-Date`, and `Content-Type` are always signed; they replace
    /// caller headers of the same name, compared case-insensitively. Header
    /// values are trimmed but otherwise passed through unvalidated.
    pub fn build<C>(crypto: &C, request: &SignableRequest, host: &str, x_date: &str) -> Self
    where
        C: SigningCrypto + ?Sized,
    {
        let headers = headers_to_sign(request, host, x_date);

        let canonical_headers: String = headers
            .iter()
            .map(|(name, (_, value))| format!("{name}:{}\n", value.trim()))
            .collect();
        let signed_header_names = headers.keys().map(String::as_str).collect::<Vec<_>>().join(";");
        let query = canonical_query_string(request.query());
        let body_hash = crypto.sha256_hex(request.body());

        let text = [
            request.method(),
            request.path(),
            query.as_str(),
            canonical_headers.as_str(),
            signed_header_names.as_str(),
            body_hash.as_str(),
        ]
        .join("\n");

        Self {
            text,
            signed_header_names,
            headers: headers.into_values().collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Lower-cased header names joined with `;`, in sorted order.
    pub fn signed_header_names(&self) -> &str {
        &self.signed_header_names
    }

    /// The signed headers with their original-case names, sorted by
    /// lower-cased name. These are the headers to send on the wire.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn into_headers(self) -> Vec<(String, String)> {
        self.headers
    }
}

/// Encodes and joins query parameters as `key=value&...`, ordered by raw key.
pub fn canonical_query_string(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(key, value)| format!("{}={}", url_encode(key), url_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

// Keyed by lower-cased name; the value keeps the name as it will be sent.
fn headers_to_sign(
    request: &SignableRequest,
    host: &str,
    x_date: &str,
) -> BTreeMap<String, (String, String)> {
    let mut headers = BTreeMap::new();
    for (name, value) in request.headers() {
        headers.insert(name.to_ascii_lowercase(), (name.clone(), value.clone()));
    }
    for (name, value) in [
        (HOST_HEADER, host),
        (DATE_HEADER, x_date),
        (CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE),
    ] {
        headers.insert(
            name.to_ascii_lowercase(),
            (name.to_string(), value.to_string()),
        );
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sha256Crypto, SigningError, DIGEST_LEN};

    /// Hashes everything to zeros so tests can pin canonical text exactly.
    struct ZeroCrypto;

    impl SigningCrypto for ZeroCrypto {
        fn sha256(&self, _data: &[u8]) -> [u8; DIGEST_LEN] {
            [0; DIGEST_LEN]
        }

        fn hmac_sha256(&self, _key: &[u8], _data: &[u8]) -> Result<[u8; DIGEST_LEN], SigningError> {
            Ok([0; DIGEST_LEN])
        }
    }

    const HOST: &str = "visual.volcengineapi.com";
    const X_DATE: &str = "20240101T120000Z";

    fn submit_request() -> SignableRequest {
        SignableRequest::new("POST", "/")
            .with_query("Version", "2022-08-31")
            .with_query("Action", "CVSync2AsyncSubmitTask")
            .with_body(r#"{"req_key":"jimeng_t2i_v40"}"#)
    }

    #[test]
    fn canonical_text_matches_reference_layout() {
        let canonical = CanonicalRequest::build(&Sha256Crypto, &submit_request(), HOST, X_DATE);
        assert_eq!(
            canonical.as_str(),
            "POST\n/\nAction=CVSync2AsyncSubmitTask&Version=2022-08-31\n\
             content-type:application/json\nhost:visual.volcengineapi.com\n\
             x-date:20240101T120000Z\n\n\
             content-type;host;x-date\n\
             b1e23e1cb883cff93cc72b847e0d63ccea7f5586b3dd734101edf7d7402fb605"
        );
        assert_eq!(canonical.signed_header_names(), "content-type;host;x-date");
    }

    #[test]
    fn caller_headers_are_lower_cased_sorted_and_trimmed() {
        let request = SignableRequest::new("GET", "/")
            .with_header("X-Trace", "  abc  ")
            .with_header("Accept", "application/json");
        let canonical = CanonicalRequest::build(&ZeroCrypto, &request, HOST, X_DATE);

        assert_eq!(
            canonical.signed_header_names(),
            "accept;content-type;host;x-date;x-trace"
        );
        assert!(canonical.as_str().contains("\nx-trace:abc\n"));
        assert!(canonical.as_str().ends_with(&"0".repeat(64)));
    }

    #[test]
    fn fixed_headers_override_caller_headers_case_insensitively() {
        let request = SignableRequest::new("GET", "/")
            .with_header("host", "evil.example")
            .with_header("content-type", "text/plain");
        let canonical = CanonicalRequest::build(&ZeroCrypto, &request, HOST, X_DATE);

        assert_eq!(canonical.signed_header_names(), "content-type;host;x-date");
        assert!(canonical.as_str().contains("host:visual.volcengineapi.com\n"));
        assert!(canonical.as_str().contains("content-type:application/json\n"));
        let names: Vec<&str> = canonical.headers().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Content-Type", "Host", "X-Date"]);
    }

    #[test]
    fn empty_body_hashes_to_empty_string_digest() {
        let request = SignableRequest::new("GET", "/");
        let canonical = CanonicalRequest::build(&Sha256Crypto, &request, HOST, X_DATE);
        assert!(canonical
            .as_str()
            .ends_with("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"));
    }

    #[test]
    fn query_is_encoded_and_ordered_by_raw_key() {
        let query = BTreeMap::from([
            ("b key".to_string(), "x y".to_string()),
            ("TaskId".to_string(), "t!1".to_string()),
            ("Action".to_string(), "CVGetTaskResult".to_string()),
        ]);
        assert_eq!(
            canonical_query_string(&query),
            "Action=CVGetTaskResult&TaskId=t%211&b+key=x+y"
        );
    }

    #[test]
    fn empty_query_yields_empty_line() {
        let canonical =
            CanonicalRequest::build(&ZeroCrypto, &SignableRequest::new("GET", "/"), HOST, X_DATE);
        assert!(canonical.as_str().starts_with("GET\n/\n\ncontent-type:"));
    }
}
