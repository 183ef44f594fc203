//! scrypt (RFC 7914).
//!
//! `B = PBKDF2-HMAC-SHA256(secret, salt, 1, 128 * r * p)`, then SMix over each
//! of the `p` lanes of B, then `PBKDF2-HMAC-SHA256(secret, B, 1, len)`.
//! Every lane owns one contiguous V table of `N` BlockMix blocks.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use zeroize::{Zeroize, Zeroizing};

use super::pbkdf2::pbkdf2_hmac;
use super::{DerivedKey, output_buffer, try_alloc};
use crate::crypto::{Sha256, salsa20_8};
use crate::error::{KdfError, Result};

const KDF: &str = "scrypt";

/// Upper bound (exclusive) on `r * p`.
pub const MAX_RP: u64 = 1 << 30;

/// scrypt cost parameters and output length, with `N` stored as `log2(N)`.
///
/// Deserialization goes through [`ScryptParams::new`], so a deserialized
/// value is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScryptParams")]
pub struct ScryptParams {
    log_n: u8,
    r: u32,
    p: u32,
    key_len: usize,
}

#[derive(Deserialize)]
struct RawScryptParams {
    log_n: u8,
    r: u32,
    p: u32,
    key_len: usize,
}

impl TryFrom<RawScryptParams> for ScryptParams {
    type Error = KdfError;

    fn try_from(raw: RawScryptParams) -> Result<Self> {
        Self::new(raw.log_n, raw.r, raw.p, raw.key_len)
    }
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self {
            // N = 16384
            log_n: 14,
            r: 8,
            p: 1,
            key_len: 64,
        }
    }
}

impl ScryptParams {
    pub fn new(log_n: u8, r: u32, p: u32, key_len: usize) -> Result<Self> {
        let params = Self {
            log_n,
            r,
            p,
            key_len,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn log_n(&self) -> u8 {
        self.log_n
    }

    /// `2^log_n`, or 0 when `log_n` does not fit in a `u64` shift.
    pub fn n(&self) -> u64 {
        1u64.checked_shl(u32::from(self.log_n)).unwrap_or(0)
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn p(&self) -> u32 {
        self.p
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_n < 1 || self.log_n > 63 {
            return Err(KdfError::invalid(
                KDF,
                format!("log_n is {} but must be between 1 and 63", self.log_n),
            ));
        }
        validate(self.n(), self.r, self.p, self.key_len)
    }
}

fn validate(n: u64, r: u32, p: u32, key_len: usize) -> Result<()> {
    if n < 2 || !n.is_power_of_two() {
        return Err(KdfError::invalid(
            KDF,
            format!("N={n} must be a power of two >= 2"),
        ));
    }
    if r < 1 {
        return Err(KdfError::invalid(KDF, "r must be >= 1"));
    }
    if p < 1 {
        return Err(KdfError::invalid(KDF, "p must be >= 1"));
    }
    if u64::from(r) * u64::from(p) >= MAX_RP {
        return Err(KdfError::invalid(
            KDF,
            format!("r * p = {} must be below 2^30", u64::from(r) * u64::from(p)),
        ));
    }
    let max_len = u128::from(u32::MAX) * 32;
    if key_len as u128 > max_len {
        return Err(KdfError::invalid(
            KDF,
            format!("output length {key_len} exceeds {max_len} bytes"),
        ));
    }
    Ok(())
}

/// Buffer sizes for one scrypt call.
#[derive(Debug)]
struct Layout {
    /// `128 * r` bytes.
    lane_bytes: usize,
    /// `128 * r * p` bytes.
    b_bytes: usize,
    /// `32 * r * N` words of V table per lane.
    table_words: usize,
}

fn to_size(bytes: u128) -> Result<usize> {
    usize::try_from(bytes).map_err(|_| KdfError::AllocationFailure { bytes })
}

impl Layout {
    fn new(n: u64, r: u32, p: u32) -> Result<Self> {
        let lane = 128 * u128::from(r);
        let table = lane * u128::from(n);
        Ok(Self {
            lane_bytes: to_size(lane)?,
            b_bytes: to_size(lane * u128::from(p))?,
            table_words: to_size(table)? / 4,
        })
    }
}

fn integerify(x: &[u32], r: usize) -> u64 {
    let j = (2 * r - 1) * 16;
    u64::from(x[j]) | (u64::from(x[j + 1]) << 32)
}

/// BlockMix with Salsa20/8: `output` receives the even-indexed results
/// followed by the odd-indexed ones.
fn block_mix(input: &[u32], output: &mut [u32], r: usize) {
    let mut x = [0u32; 16];
    x.copy_from_slice(&input[(2 * r - 1) * 16..]);
    for (i, chunk) in input.chunks_exact(16).enumerate() {
        for (a, b) in x.iter_mut().zip(chunk) {
            *a ^= b;
        }
        salsa20_8(&mut x);
        let dest = (i / 2 + (i % 2) * r) * 16;
        output[dest..dest + 16].copy_from_slice(&x);
    }
    x.zeroize();
}

/// SMix over one `128 * r` byte lane, in place.
fn smix(lane: &mut [u8], n: u64, r: usize, table_words: usize) -> Result<()> {
    let words = 32 * r;
    let mut x = Zeroizing::new(try_alloc::<u32>(words)?);
    let mut y = Zeroizing::new(try_alloc::<u32>(words)?);
    let mut v = Zeroizing::new(try_alloc::<u32>(table_words)?);

    for (w, bytes) in x.iter_mut().zip(lane.chunks_exact(4)) {
        *w = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    for block in v.chunks_exact_mut(words) {
        block.copy_from_slice(&x);
        block_mix(&x, &mut y, r);
        std::mem::swap(&mut x, &mut y);
    }

    let mask = n - 1;
    for _ in 0..n {
        // j < N, and N blocks fit in the table
        let j = (integerify(&x, r) & mask) as usize;
        for (a, b) in x.iter_mut().zip(&v[j * words..(j + 1) * words]) {
            *a ^= b;
        }
        block_mix(&x, &mut y, r);
        std::mem::swap(&mut x, &mut y);
    }

    for (bytes, w) in lane.chunks_exact_mut(4).zip(x.iter()) {
        bytes.copy_from_slice(&w.to_le_bytes());
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn mix_lanes(b: &mut [u8], layout: &Layout, n: u64, r: usize) -> Result<()> {
    use rayon::prelude::*;

    if b.len() == layout.lane_bytes {
        return smix(b, n, r, layout.table_words);
    }
    b.par_chunks_mut(layout.lane_bytes)
        .try_for_each(|lane| smix(lane, n, r, layout.table_words))
}

#[cfg(not(feature = "parallel"))]
fn mix_lanes(b: &mut [u8], layout: &Layout, n: u64, r: usize) -> Result<()> {
    b.chunks_mut(layout.lane_bytes)
        .try_for_each(|lane| smix(lane, n, r, layout.table_words))
}

/// Fills `out` with scrypt output.
pub fn scrypt_into(secret: &[u8], salt: &[u8], n: u64, r: u32, p: u32, out: &mut [u8]) -> Result<()> {
    validate(n, r, p, out.len())?;
    let layout = Layout::new(n, r, p)?;
    trace!(?layout, "allocating scrypt buffers");

    let mut b = Zeroizing::new(try_alloc::<u8>(layout.b_bytes)?);
    pbkdf2_hmac::<Sha256>(secret, salt, 1, &mut b)?;

    mix_lanes(&mut b, &layout, n, layout.lane_bytes / 128)?;

    pbkdf2_hmac::<Sha256>(secret, &b, 1, out)
}

/// Derives `output_length` bytes with scrypt.
pub fn scrypt(
    secret: &[u8],
    salt: &[u8],
    n: u64,
    r: u32,
    p: u32,
    output_length: usize,
) -> Result<DerivedKey> {
    validate(n, r, p, output_length)?;
    debug!(n, r, p, output_length, salt_len = salt.len(), "deriving scrypt key");
    let mut key = output_buffer(output_length)?;
    scrypt_into(secret, salt, n, r, p, &mut key)?;
    Ok(key)
}

/// Derives a key using the cost parameters and length held in `params`.
pub fn scrypt_with_params(secret: &[u8], salt: &[u8], params: &ScryptParams) -> Result<DerivedKey> {
    params.validate()?;
    scrypt(secret, salt, params.n(), params.r, params.p, params.key_len)
}
