//! HMAC (RFC 2104) over any [`Digest`].

use zeroize::{Zeroize, Zeroizing};

use super::hash::{Digest, MAX_BLOCK_LEN, MAX_OUTPUT_LEN};

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// A keyed HMAC instance.
///
/// The inner and outer states are keyed once in [`Hmac::new`]; cloning an
/// instance is the cheap way to MAC many messages under the same key.
#[derive(Clone)]
pub struct Hmac<D: Digest> {
    inner: D,
    outer: D,
}

impl<D: Digest> Hmac<D> {
    pub fn new(key: &[u8]) -> Self {
        let mut block_key = Zeroizing::new([0u8; MAX_BLOCK_LEN]);
        if key.len() > D::BLOCK_LEN {
            D::digest_into(key, &mut block_key[..D::OUTPUT_LEN]);
        } else {
            block_key[..key.len()].copy_from_slice(key);
        }

        let mut pad = Zeroizing::new([0u8; MAX_BLOCK_LEN]);

        for (p, k) in pad.iter_mut().zip(block_key.iter()).take(D::BLOCK_LEN) {
            *p = k ^ IPAD;
        }
        let mut inner = D::new();
        inner.update(&pad[..D::BLOCK_LEN]);

        for (p, k) in pad.iter_mut().zip(block_key.iter()).take(D::BLOCK_LEN) {
            *p = k ^ OPAD;
        }
        let mut outer = D::new();
        outer.update(&pad[..D::BLOCK_LEN]);

        Self { inner, outer }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Writes the tag into `out`, truncating it when `out` is shorter.
    pub fn finalize_into(self, out: &mut [u8]) {
        let Self { inner, mut outer } = self;
        let mut inner_hash = [0u8; MAX_OUTPUT_LEN];
        inner.finalize_into(&mut inner_hash[..D::OUTPUT_LEN]);
        outer.update(&inner_hash[..D::OUTPUT_LEN]);
        outer.finalize_into(out);
        inner_hash.zeroize();
    }

    pub fn mac(key: &[u8], data: &[u8], out: &mut [u8]) {
        let mut hmac = Self::new(key);
        hmac.update(data);
        hmac.finalize_into(out);
    }
}
