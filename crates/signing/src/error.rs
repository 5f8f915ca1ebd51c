use thiserror::Error;

use generation::GenerationError;

/// Failures while computing a request signature.
///
/// Any of these is fatal to the request being signed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// A hash or MAC primitive rejected its input.
    #[error("cryptographic primitive failed: {message}")]
    Crypto { message: String },

    /// The credential-scope date was not exactly eight characters.
    #[error("signing date must be 8 characters (YYYYMMDD), got {date:?}")]
    InvalidDate { date: String },
}

impl From<SigningError> for GenerationError {
    fn from(err: SigningError) -> Self {
        GenerationError::Signing {
            message: err.to_string(),
        }
    }
}
