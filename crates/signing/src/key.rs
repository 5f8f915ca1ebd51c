//! Scoped signing-key derivation.

use crate::{SigningCrypto, SigningError, DIGEST_LEN};

/// Terminator of every credential scope and last link of the key chain.
pub const SCOPE_TERMINATOR: &str = "request";

/// A derived signing key, valid for one date/region/service scope.
///
/// Derived fresh for each signature and dropped afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey([u8; DIGEST_LEN]);

impl SigningKey {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Derives the signing key for `date` (`YYYYMMDD`), `region`, and `service`.
///
/// ```text
/// k1  = HMAC(secret, date)
/// k2  = HMAC(k1, region)
/// k3  = HMAC(k2, service)
/// key = HMAC(k3, "request")
/// ```
///
/// Each step keys the next, so the order is fixed.
pub fn derive_signing_key<C>(
    crypto: &C,
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<SigningKey, SigningError>
where
    C: SigningCrypto + ?Sized,
{
    if date.len() != 8 {
        return Err(SigningError::InvalidDate {
            date: date.to_string(),
        });
    }

    let k_date = crypto.hmac_sha256(secret.as_bytes(), date.as_bytes())?;
    let k_region = crypto.hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = crypto.hmac_sha256(&k_region, service.as_bytes())?;
    let key = crypto.hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())?;
    Ok(SigningKey(key))
}

/// `date/region/service/request`.
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/{SCOPE_TERMINATOR}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sha256Crypto;

    const SECRET: &str = "WkdWaGFXeGxjeUJ6WldOeVpYUQ==";

    #[test]
    fn derived_key_matches_golden_vector() {
        let key =
            derive_signing_key(&Sha256Crypto, SECRET, "20240101", "cn-north-1", "cv").unwrap();
        assert_eq!(
            key.to_hex(),
            "38433b5353df23e10c9a34a2281119ab25fb61d40125881a65db01815f1bafa4"
        );
    }

    #[test]
    fn key_is_date_scoped() {
        let day_one =
            derive_signing_key(&Sha256Crypto, SECRET, "20240101", "cn-north-1", "cv").unwrap();
        let day_two =
            derive_signing_key(&Sha256Crypto, SECRET, "20240102", "cn-north-1", "cv").unwrap();
        assert_ne!(day_one, day_two);
    }

    #[test]
    fn malformed_date_is_rejected() {
        let err = derive_signing_key(&Sha256Crypto, SECRET, "20240101T120000Z", "cn-north-1", "cv")
            .unwrap_err();
        assert!(matches!(err, SigningError::InvalidDate { .. }));
    }

    #[test]
    fn scope_has_four_segments() {
        assert_eq!(
            credential_scope("20240101", "cn-north-1", "cv"),
            "20240101/cn-north-1/cv/request"
        );
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let key =
            derive_signing_key(&Sha256Crypto, SECRET, "20240101", "cn-north-1", "cv").unwrap();
        assert_eq!(format!("{key:?}"), "SigningKey(<redacted>)");
    }
}
