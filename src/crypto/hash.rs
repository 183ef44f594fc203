use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::KdfError;

/// Largest block length of the supported hashes (SHA-512).
pub const MAX_BLOCK_LEN: usize = 128;
/// Largest digest length of the supported hashes (SHA-512).
pub const MAX_OUTPUT_LEN: usize = 64;

/// An incremental Merkle–Damgård hash.
///
/// States are cheap to clone, which lets HMAC cache its keyed inner and outer
/// states and lets PBKDF2 restart from them on every iteration.
pub trait Digest: Clone + Zeroize {
    const BLOCK_LEN: usize;
    const OUTPUT_LEN: usize;

    fn new() -> Self;

    fn update(&mut self, data: &[u8]);

    /// Writes the digest into `out`. A shorter `out` receives a truncated digest.
    fn finalize_into(self, out: &mut [u8]);

    fn digest_into(data: &[u8], out: &mut [u8]) {
        let mut state = Self::new();
        state.update(data);
        state.finalize_into(out);
    }

    fn digest(data: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; Self::OUTPUT_LEN];
        Self::digest_into(data, &mut out);
        out
    }
}

/// Pending input of a block hash plus the MD-strengthening padding.
#[derive(Clone)]
pub(crate) struct BlockBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> BlockBuffer<N> {
    pub(crate) fn new() -> Self {
        Self {
            bytes: [0u8; N],
            len: 0,
        }
    }

    /// Buffers `data`, handing every completed block to `compress`.
    pub(crate) fn input(&mut self, mut data: &[u8], mut compress: impl FnMut(&[u8])) {
        if self.len > 0 {
            let take = (N - self.len).min(data.len());
            self.bytes[self.len..self.len + take].copy_from_slice(&data[..take]);
            self.len += take;
            data = &data[take..];
            if self.len < N {
                return;
            }
            compress(&self.bytes);
            self.len = 0;
        }

        let mut blocks = data.chunks_exact(N);
        for block in &mut blocks {
            compress(block);
        }
        let rest = blocks.remainder();
        self.bytes[..rest.len()].copy_from_slice(rest);
        self.len = rest.len();
    }

    /// Appends `0x80`, zero fill and the big-endian bit length, then flushes.
    pub(crate) fn pad(&mut self, bit_length: &[u8], mut compress: impl FnMut(&[u8])) {
        self.bytes[self.len] = 0x80;
        self.len += 1;
        if self.len > N - bit_length.len() {
            self.bytes[self.len..].fill(0);
            compress(&self.bytes);
            self.len = 0;
        }
        self.bytes[self.len..N - bit_length.len()].fill(0);
        self.bytes[N - bit_length.len()..].copy_from_slice(bit_length);
        compress(&self.bytes);
        self.len = 0;
    }
}

impl<const N: usize> Zeroize for BlockBuffer<N> {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
        self.len.zeroize();
    }
}

/// Hash functions PBKDF2 can be instantiated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashVariant {
    Sha1,
    Sha256,
    Sha512,
}

impl HashVariant {
    pub const ALL: [HashVariant; 3] = [HashVariant::Sha1, HashVariant::Sha256, HashVariant::Sha512];

    pub fn name(&self) -> &'static str {
        match self {
            HashVariant::Sha1 => "sha1",
            HashVariant::Sha256 => "sha256",
            HashVariant::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes, which is also the PBKDF2 block length.
    pub fn digest_len(&self) -> usize {
        match self {
            HashVariant::Sha1 => 20,
            HashVariant::Sha256 => 32,
            HashVariant::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashVariant {
    type Err = KdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(HashVariant::Sha1),
            "sha256" => Ok(HashVariant::Sha256),
            "sha512" => Ok(HashVariant::Sha512),
            _ => Err(KdfError::UnsupportedHash(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_names_are_case_insensitive() {
        assert_eq!("SHA512".parse::<HashVariant>().unwrap(), HashVariant::Sha512);
        assert_eq!("Sha256".parse::<HashVariant>().unwrap(), HashVariant::Sha256);
        assert_eq!("sha1".parse::<HashVariant>().unwrap(), HashVariant::Sha1);
    }

    #[test]
    fn unknown_hash_name_fails() {
        match "md5".parse::<HashVariant>() {
            Err(KdfError::UnsupportedHash(name)) => assert_eq!(name, "md5"),
            other => panic!("expected UnsupportedHash, got: {other:?}"),
        }
    }

    #[test]
    fn display_matches_serde_name() {
        for variant in HashVariant::ALL {
            let json = serde_json::to_string(&variant).unwrap();
            assert_eq!(json, format!("\"{variant}\""));
        }
    }

    #[test]
    fn padding_spills_into_extra_block_when_needed() {
        let mut blocks = Vec::new();
        let mut buffer = BlockBuffer::<64>::new();
        buffer.input(&[0xab; 56], |b| blocks.push(b.to_vec()));
        assert!(blocks.is_empty());
        buffer.pad(&[0u8; 8], |b| blocks.push(b.to_vec()));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0][56], 0x80);
        assert!(blocks[1].iter().all(|&b| b == 0));
    }
}
