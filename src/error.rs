use thiserror::Error;

/// Errors reported by the key derivation functions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KdfError {
    #[error("invalid {kdf} parameter: {reason}")]
    InvalidParameter { kdf: &'static str, reason: String },

    #[error("unsupported hash '{0}', expected one of sha1, sha256, sha512")]
    UnsupportedHash(String),

    #[error("unable to allocate {bytes} bytes of scratch memory")]
    AllocationFailure { bytes: u128 },
}

impl KdfError {
    pub(crate) fn invalid(kdf: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            kdf,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KdfError>;
