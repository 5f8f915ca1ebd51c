//! HMAC-SHA256 request signing for the signed generation backend.
//!
//! The protocol follows the SigV4 shape: a canonical request is hashed into a
//! string to sign, which is MAC'd with a key derived from the secret through a
//! date/region/service chain. The result is carried in an `Authorization`
//! header of the form
//!
//! ```text
//! HMAC-SHA256 Credential=<id>/<date>/<region>/<service>/request,
//!     SignedHeaders=<h1;h2>, Signature=<hex>
//! ```
//!
//! ## Architectural Layer
//!
//! **Pure computation.** No clock reads and no I/O: the timestamp is an
//! argument to [`Signer::sign`] and the hash primitives are injected through
//! [`SigningCrypto`].

pub mod canonical;
pub mod crypto;
pub mod encoding;
mod error;
pub mod key;
mod request;
pub mod signer;

pub use canonical::CanonicalRequest;
pub use crypto::{Sha256Crypto, SigningCrypto, DIGEST_LEN};
pub use encoding::url_encode;
pub use error::SigningError;
pub use key::{credential_scope, derive_signing_key, SigningKey};
pub use request::SignableRequest;
pub use signer::{SignedHeaders, Signer};
