//! The key derivation engines.
//!
//! Every engine validates its parameters before doing any work, never returns
//! partial output, and wipes every buffer holding secret-derived bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{KdfError, Result};

pub mod bcrypt;
pub mod pbkdf2;
pub mod scrypt;

pub use bcrypt::{BcryptParams, bcrypt_pbkdf, bcrypt_pbkdf_into};
pub use pbkdf2::{Pbkdf2Params, pbkdf2, pbkdf2_hmac, pbkdf2_with_params};
pub use scrypt::{ScryptParams, scrypt, scrypt_into, scrypt_with_params};

/// Derived key material, wiped when dropped.
pub type DerivedKey = Zeroizing<Vec<u8>>;

/// Allocates a zeroed buffer, reporting allocator refusal instead of aborting.
pub(crate) fn try_alloc<T: Copy + Default>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| KdfError::AllocationFailure {
            bytes: len as u128 * std::mem::size_of::<T>() as u128,
        })?;
    buf.resize(len, T::default());
    Ok(buf)
}

pub(crate) fn output_buffer(len: usize) -> Result<DerivedKey> {
    Ok(Zeroizing::new(try_alloc(len)?))
}

/// Parameters for any of the supported functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kdf", rename_all = "lowercase")]
pub enum KdfParams {
    Pbkdf2(Pbkdf2Params),
    Bcrypt(BcryptParams),
    Scrypt(ScryptParams),
}

impl KdfParams {
    pub fn name(&self) -> &'static str {
        match self {
            KdfParams::Pbkdf2(_) => "pbkdf2",
            KdfParams::Bcrypt(_) => "bcrypt",
            KdfParams::Scrypt(_) => "scrypt",
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            KdfParams::Pbkdf2(params) => params.key_len(),
            KdfParams::Bcrypt(params) => params.key_len(),
            KdfParams::Scrypt(params) => params.key_len(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            KdfParams::Pbkdf2(params) => params.validate(),
            KdfParams::Bcrypt(params) => params.validate(),
            KdfParams::Scrypt(params) => params.validate(),
        }
    }

    /// Runs the selected function over `secret` and `salt`.
    pub fn derive(&self, secret: &[u8], salt: &[u8]) -> Result<DerivedKey> {
        match self {
            KdfParams::Pbkdf2(params) => pbkdf2_with_params(secret, salt, params),
            KdfParams::Bcrypt(params) => {
                bcrypt_pbkdf(secret, salt, params.rounds(), params.key_len())
            }
            KdfParams::Scrypt(params) => scrypt_with_params(secret, salt, params),
        }
    }
}

impl fmt::Display for KdfParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KdfParams::Pbkdf2(p) => write!(
                f,
                "pbkdf2 h={} r={} kl={}",
                p.hash(),
                p.rounds(),
                p.key_len()
            ),
            KdfParams::Bcrypt(p) => write!(f, "bcrypt r={} kl={}", p.rounds(), p.key_len()),
            KdfParams::Scrypt(p) => write!(
                f,
                "scrypt n={} r={} p={} kl={}",
                p.log_n(),
                p.r(),
                p.p(),
                p.key_len()
            ),
        }
    }
}
