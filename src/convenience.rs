//! The permissive wrapper surface: hash selection by name, keyword-style
//! defaults, and clamping of out-of-range scrypt work factors.
//!
//! The engines in [`crate::kdf`] reject bad parameters; only this layer
//! silently raises `N` and `log_n` to their minimums.

use tracing::warn;

use crate::crypto::HashVariant;
use crate::error::{KdfError, Result};
use crate::kdf::{self, BcryptParams, DerivedKey, Pbkdf2Params, ScryptParams};

/// PBKDF2 with the hash chosen by name (`"sha1"`, `"SHA256"`, ...).
pub fn pbkdf2_hmac(
    hash_name: &str,
    secret: &[u8],
    salt: &[u8],
    rounds: u32,
    output_length: usize,
) -> Result<DerivedKey> {
    let hash: HashVariant = hash_name.parse()?;
    kdf::pbkdf2(secret, salt, rounds, output_length, hash)
}

/// PBKDF2 with wrapper defaults filled in from [`Pbkdf2Params::default`].
pub fn pbkdf2(secret: &[u8], salt: &[u8], params: &Pbkdf2Params) -> Result<DerivedKey> {
    kdf::pbkdf2_with_params(secret, salt, params)
}

/// bcrypt_pbkdf with the given rounds and key length.
pub fn bcrypt_kdf(secret: &[u8], salt: &[u8], params: &BcryptParams) -> Result<DerivedKey> {
    kdf::bcrypt_pbkdf(secret, salt, params.rounds(), params.key_len())
}

/// The work factor [`scrypt_hash`] actually runs with for a requested `n`.
pub fn clamp_n(n: u64) -> u64 {
    n.max(2)
}

/// scrypt taking `N` directly; `N < 2` is raised to 2.
pub fn scrypt_hash(
    secret: &[u8],
    salt: &[u8],
    n: u64,
    r: u32,
    p: u32,
    output_length: usize,
) -> Result<DerivedKey> {
    let clamped = clamp_n(n);
    if clamped != n {
        warn!(n, "scrypt N below 2, using N=2");
    }
    kdf::scrypt(secret, salt, clamped, r, p, output_length)
}

/// Clamps a signed work-factor exponent to at least 1 and builds the params.
pub fn scrypt_params(log_n: i32, r: u32, p: u32, key_len: usize) -> Result<ScryptParams> {
    let log_n = if log_n < 1 {
        warn!(log_n, "scrypt log_n below 1, using log_n=1");
        1
    } else {
        log_n
    };
    let log_n = u8::try_from(log_n)
        .map_err(|_| KdfError::invalid("scrypt", format!("log_n {log_n} is too large")))?;
    ScryptParams::new(log_n, r, p, key_len)
}

/// scrypt with `N = 2^log_n`.
pub fn scrypt_kdf(secret: &[u8], salt: &[u8], params: &ScryptParams) -> Result<DerivedKey> {
    kdf::scrypt_with_params(secret, salt, params)
}
