//! The hashing capability the signer depends on.
//!
//! The signer never calls `sha2`/`hmac` directly; it receives a
//! [`SigningCrypto`] implementation. Production code uses [`Sha256Crypto`];
//! canonicalization tests can substitute a stub and assert on the exact
//! strings produced without caring about digest values.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::SigningError;

/// Length in bytes of every digest and MAC produced by a [`SigningCrypto`].
pub const DIGEST_LEN: usize = 32;

/// SHA-256 and HMAC-SHA256 primitives.
pub trait SigningCrypto {
    /// SHA-256 of `data`.
    fn sha256(&self, data: &[u8]) -> [u8; DIGEST_LEN];

    /// HMAC-SHA256 of `data` under `key`.
    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> Result<[u8; DIGEST_LEN], SigningError>;

    /// Lower-case hex SHA-256 of `data`.
    fn sha256_hex(&self, data: &[u8]) -> String {
        hex::encode(self.sha256(data))
    }
}

/// [`SigningCrypto`] backed by the RustCrypto `sha2` and `hmac` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Crypto;

impl SigningCrypto for Sha256Crypto {
    fn sha256(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        Sha256::digest(data).into()
    }

    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> Result<[u8; DIGEST_LEN], SigningError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| SigningError::Crypto {
            message: e.to_string(),
        })?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_hashes_to_the_well_known_digest() {
        assert_eq!(
            Sha256Crypto.sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hmac_matches_rfc_4231_case_2() {
        let mac = Sha256Crypto
            .hmac_sha256(b"Jefe", b"what do ya want for nothing?")
            .unwrap();
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
