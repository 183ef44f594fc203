//! Password-based key derivation: PBKDF2 (HMAC-SHA-1/256/512), OpenBSD
//! `bcrypt_pbkdf` and scrypt, built on in-crate SHA, HMAC, Blowfish and
//! Salsa20/8 primitives.
//!
//! All functions are deterministic and bit-exact with their reference
//! definitions. Derived keys come back as [`DerivedKey`], which wipes itself
//! on drop.
//!
//! ```
//! use multikdf::{HashVariant, pbkdf2};
//!
//! let key = pbkdf2(b"password", b"salt", 1, 32, HashVariant::Sha256).unwrap();
//! assert_eq!(
//!     hex::encode(&*key),
//!     "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
//! );
//! ```

pub mod convenience;
pub mod crypto;
mod error;
pub mod kdf;
pub mod selftest;

pub use crate::crypto::HashVariant;
pub use crate::error::{KdfError, Result};
pub use crate::kdf::{
    BcryptParams, DerivedKey, KdfParams, Pbkdf2Params, ScryptParams, bcrypt_pbkdf, pbkdf2,
    scrypt,
};
