//! Cryptographic primitives the key derivation functions are built from.
//!
//! Provides SHA-1/SHA-256/SHA-512, HMAC, Blowfish and the Salsa20/8 core.

pub mod blowfish;
mod blowfish_tables;
pub mod hash;
pub mod hmac;
pub mod salsa;
pub mod sha1;
pub mod sha256;
pub mod sha512;

pub use blowfish::Blowfish;
pub use hash::{Digest, HashVariant, MAX_BLOCK_LEN, MAX_OUTPUT_LEN};
pub use hmac::Hmac;
pub use salsa::salsa20_8;
pub use sha1::Sha1;
pub use sha256::Sha256;
pub use sha512::Sha512;
