//! OpenBSD `bcrypt_pbkdf`.
//!
//! A PBKDF2-like construction whose PRF is `bcrypt_hash`: an eksblowfish key
//! schedule keyed by SHA-512 of the password and of the salt, followed by 64
//! encryptions of a fixed 32-byte magic. Output bytes of each block are
//! scattered across the key with a stride instead of being concatenated.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{DerivedKey, output_buffer};
use crate::crypto::{Blowfish, Digest, Sha512};
use crate::error::{KdfError, Result};

const KDF: &str = "bcrypt_pbkdf";

const HASH_WORDS: usize = 8;
const HASH_LEN: usize = HASH_WORDS * 4;
const SHA512_LEN: usize = 64;
const MAGIC: &[u8; HASH_LEN] = b"OxychromaticBlowfishSwatDynamite";

/// Longest key the reference implementation produces (32 blocks of 32 bytes).
pub const MAX_KEY_LEN: usize = HASH_LEN * HASH_LEN;
/// Longest salt the reference implementation accepts.
pub const MAX_SALT_LEN: usize = 1 << 20;

/// bcrypt_pbkdf rounds and output length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBcryptParams")]
pub struct BcryptParams {
    rounds: u32,
    key_len: usize,
}

#[derive(Deserialize)]
struct RawBcryptParams {
    rounds: u32,
    key_len: usize,
}

impl TryFrom<RawBcryptParams> for BcryptParams {
    type Error = KdfError;

    fn try_from(raw: RawBcryptParams) -> Result<Self> {
        Self::new(raw.rounds, raw.key_len)
    }
}

impl Default for BcryptParams {
    fn default() -> Self {
        Self {
            rounds: 10,
            key_len: 64,
        }
    }
}

impl BcryptParams {
    pub fn new(rounds: u32, key_len: usize) -> Result<Self> {
        let params = Self { rounds, key_len };
        params.validate()?;
        Ok(params)
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn validate(&self) -> Result<()> {
        if self.rounds < 1 {
            return Err(KdfError::invalid(KDF, "rounds must be >= 1"));
        }
        if self.key_len > MAX_KEY_LEN {
            return Err(KdfError::invalid(
                KDF,
                format!("output length {} exceeds {MAX_KEY_LEN} bytes", self.key_len),
            ));
        }
        Ok(())
    }
}

fn bcrypt_hash(sha2pass: &[u8; SHA512_LEN], sha2salt: &[u8; SHA512_LEN], out: &mut [u8; HASH_LEN]) {
    let mut state = Blowfish::new();
    state.expand_key_with_salt(sha2salt, sha2pass);
    for _ in 0..64 {
        state.expand_key(sha2salt);
        state.expand_key(sha2pass);
    }

    let mut cdata = Zeroizing::new([0u32; HASH_WORDS]);
    for (word, bytes) in cdata.iter_mut().zip(MAGIC.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    for _ in 0..64 {
        state.encrypt_words(&mut cdata[..]);
    }

    for (bytes, word) in out.chunks_exact_mut(4).zip(cdata.iter()) {
        bytes.copy_from_slice(&word.to_le_bytes());
    }
}

/// Fills `out` with bcrypt_pbkdf output.
pub fn bcrypt_pbkdf_into(password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) -> Result<()> {
    BcryptParams {
        rounds,
        key_len: out.len(),
    }
    .validate()?;
    if password.is_empty() {
        return Err(KdfError::invalid(KDF, "password must not be empty"));
    }
    if salt.len() > MAX_SALT_LEN {
        return Err(KdfError::invalid(
            KDF,
            format!("salt length {} exceeds {MAX_SALT_LEN} bytes", salt.len()),
        ));
    }
    if out.is_empty() {
        return Ok(());
    }

    let key_len = out.len();
    let stride = key_len.div_ceil(HASH_LEN);
    let mut amt = key_len.div_ceil(stride);

    let mut sha2pass = Zeroizing::new([0u8; SHA512_LEN]);
    Sha512::digest_into(password, &mut sha2pass[..]);

    let mut sha2salt = Zeroizing::new([0u8; SHA512_LEN]);
    let mut block = Zeroizing::new([0u8; HASH_LEN]);
    let mut tmp = Zeroizing::new([0u8; HASH_LEN]);

    let mut remaining = key_len;
    let mut count: u32 = 1;
    while remaining > 0 {
        let mut salter = Sha512::new();
        salter.update(salt);
        salter.update(&count.to_be_bytes());
        salter.finalize_into(&mut sha2salt[..]);
        bcrypt_hash(&sha2pass, &sha2salt, &mut tmp);
        block.copy_from_slice(&tmp[..]);

        for _ in 1..rounds {
            Sha512::digest_into(&tmp[..], &mut sha2salt[..]);
            bcrypt_hash(&sha2pass, &sha2salt, &mut tmp);
            for (acc, x) in block.iter_mut().zip(tmp.iter()) {
                *acc ^= x;
            }
        }

        // Byte i of block `count` lands at i * stride + count - 1.
        amt = amt.min(remaining);
        let mut written = 0;
        for (i, &byte) in block.iter().take(amt).enumerate() {
            let dest = i * stride + (count as usize - 1);
            if dest >= key_len {
                break;
            }
            out[dest] = byte;
            written += 1;
        }
        remaining -= written;
        count += 1;
    }

    Ok(())
}

/// Derives `output_length` bytes with bcrypt_pbkdf.
pub fn bcrypt_pbkdf(password: &[u8], salt: &[u8], rounds: u32, output_length: usize) -> Result<DerivedKey> {
    BcryptParams {
        rounds,
        key_len: output_length,
    }
    .validate()?;
    debug!(rounds, output_length, salt_len = salt.len(), "deriving bcrypt_pbkdf key");
    if salt.is_empty() {
        warn!("bcrypt_pbkdf called with an empty salt");
    }
    let mut key = output_buffer(output_length)?;
    bcrypt_pbkdf_into(password, salt, rounds, &mut key)?;
    Ok(key)
}
