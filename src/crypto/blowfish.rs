//! Blowfish block cipher with the bcrypt salted key expansion.
//!
//! Key and salt material is consumed the way OpenBSD's `blf.c` does: as a
//! cyclic stream of big-endian 32-bit words.

use zeroize::Zeroize;

use super::blowfish_tables::{P_INIT, S_INIT};

const ROUNDS: usize = 16;

#[derive(Clone, Zeroize)]
pub struct Blowfish {
    p: [u32; ROUNDS + 2],
    s: [[u32; 256]; 4],
}

impl Drop for Blowfish {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Cyclic reader of big-endian words; an empty stream yields zero words.
struct WordStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WordStream<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next_word(&mut self) -> u32 {
        if self.data.is_empty() {
            return 0;
        }
        let mut word = 0u32;
        for _ in 0..4 {
            word = (word << 8) | u32::from(self.data[self.pos]);
            self.pos = (self.pos + 1) % self.data.len();
        }
        word
    }
}

impl Default for Blowfish {
    fn default() -> Self {
        Self::new()
    }
}

impl Blowfish {
    /// The unkeyed initial state.
    pub fn new() -> Self {
        Self {
            p: P_INIT,
            s: S_INIT,
        }
    }

    /// Standard Blowfish key schedule.
    pub fn with_key(key: &[u8]) -> Self {
        let mut cipher = Self::new();
        cipher.expand_key(key);
        cipher
    }

    #[inline]
    fn f(&self, x: u32) -> u32 {
        let [a, b, c, d] = x.to_be_bytes();
        (self.s[0][usize::from(a)].wrapping_add(self.s[1][usize::from(b)])
            ^ self.s[2][usize::from(c)])
        .wrapping_add(self.s[3][usize::from(d)])
    }

    pub fn encrypt_block(&self, mut l: u32, mut r: u32) -> (u32, u32) {
        l ^= self.p[0];
        for i in (1..=ROUNDS).step_by(2) {
            r ^= self.f(l) ^ self.p[i];
            l ^= self.f(r) ^ self.p[i + 1];
        }
        (r ^ self.p[ROUNDS + 1], l)
    }

    pub fn decrypt_block(&self, mut l: u32, mut r: u32) -> (u32, u32) {
        l ^= self.p[ROUNDS + 1];
        for i in (1..=ROUNDS).rev().step_by(2) {
            r ^= self.f(l) ^ self.p[i];
            l ^= self.f(r) ^ self.p[i - 1];
        }
        (r ^ self.p[0], l)
    }

    /// Encrypts consecutive word pairs of `data` in place (ECB).
    pub fn encrypt_words(&self, data: &mut [u32]) {
        for pair in data.chunks_exact_mut(2) {
            let (l, r) = self.encrypt_block(pair[0], pair[1]);
            pair[0] = l;
            pair[1] = r;
        }
    }

    /// Mixes `key` into the P-array, then regenerates P and the S-boxes by
    /// chained encryption of a zero block.
    pub fn expand_key(&mut self, key: &[u8]) {
        self.mix_key(key);
        self.regenerate(None);
    }

    /// The eksblowfish expansion: like [`Blowfish::expand_key`], but every
    /// block is XORed with the next two words of `salt` before encryption.
    pub fn expand_key_with_salt(&mut self, salt: &[u8], key: &[u8]) {
        self.mix_key(key);
        self.regenerate(Some(WordStream::new(salt)));
    }

    fn mix_key(&mut self, key: &[u8]) {
        let mut stream = WordStream::new(key);
        for p in self.p.iter_mut() {
            *p ^= stream.next_word();
        }
    }

    fn regenerate(&mut self, mut salt: Option<WordStream<'_>>) {
        let (mut l, mut r) = (0u32, 0u32);
        let mut next = |cipher: &Self| {
            if let Some(stream) = salt.as_mut() {
                l ^= stream.next_word();
                r ^= stream.next_word();
            }
            (l, r) = cipher.encrypt_block(l, r);
            (l, r)
        };

        for i in (0..ROUNDS + 2).step_by(2) {
            let (a, b) = next(self);
            self.p[i] = a;
            self.p[i + 1] = b;
        }
        for sbox in 0..4 {
            for k in (0..256).step_by(2) {
                let (a, b) = next(self);
                self.s[sbox][k] = a;
                self.s[sbox][k + 1] = b;
            }
        }
    }
}
