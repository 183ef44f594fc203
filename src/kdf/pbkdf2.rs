use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use super::{DerivedKey, output_buffer};
use crate::crypto::{Digest, HashVariant, Hmac, MAX_OUTPUT_LEN, Sha1, Sha256, Sha512};
use crate::error::{KdfError, Result};

const KDF: &str = "pbkdf2";

/// PBKDF2 cost parameters and output length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPbkdf2Params")]
pub struct Pbkdf2Params {
    hash: HashVariant,
    rounds: u32,
    key_len: usize,
}

#[derive(Deserialize)]
struct RawPbkdf2Params {
    hash: HashVariant,
    rounds: u32,
    key_len: usize,
}

impl TryFrom<RawPbkdf2Params> for Pbkdf2Params {
    type Error = KdfError;

    fn try_from(raw: RawPbkdf2Params) -> Result<Self> {
        Self::new(raw.hash, raw.rounds, raw.key_len)
    }
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            hash: HashVariant::Sha512,
            rounds: 1000,
            key_len: 64,
        }
    }
}

impl Pbkdf2Params {
    pub fn new(hash: HashVariant, rounds: u32, key_len: usize) -> Result<Self> {
        let params = Self {
            hash,
            rounds,
            key_len,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn hash(&self) -> HashVariant {
        self.hash
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn validate(&self) -> Result<()> {
        validate(self.rounds, self.key_len, self.hash.digest_len())
    }
}

fn validate(rounds: u32, key_len: usize, digest_len: usize) -> Result<()> {
    if rounds < 1 {
        return Err(KdfError::invalid(KDF, "rounds must be >= 1"));
    }
    let max_len = u128::from(u32::MAX) * digest_len as u128;
    if key_len as u128 > max_len {
        return Err(KdfError::invalid(
            KDF,
            format!("output length {key_len} exceeds {max_len} bytes"),
        ));
    }
    Ok(())
}

/// PBKDF2 (RFC 8018) with HMAC-`D` as the PRF, filling `out` completely.
pub fn pbkdf2_hmac<D: Digest>(secret: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) -> Result<()> {
    validate(rounds, out.len(), D::OUTPUT_LEN)?;
    if out.is_empty() {
        return Ok(());
    }

    let prf = Hmac::<D>::new(secret);
    let mut u = Zeroizing::new([0u8; MAX_OUTPUT_LEN]);
    let mut t = Zeroizing::new([0u8; MAX_OUTPUT_LEN]);
    let len = D::OUTPUT_LEN;

    for (block, counter) in out.chunks_mut(len).zip(1u32..) {
        let mut mac = prf.clone();
        mac.update(salt);
        mac.update(&counter.to_be_bytes());
        mac.finalize_into(&mut u[..len]);
        t[..len].copy_from_slice(&u[..len]);

        for _ in 1..rounds {
            let mut mac = prf.clone();
            mac.update(&u[..len]);
            mac.finalize_into(&mut u[..len]);
            for (acc, x) in t[..len].iter_mut().zip(u[..len].iter()) {
                *acc ^= x;
            }
        }

        block.copy_from_slice(&t[..block.len()]);
    }

    Ok(())
}

/// Derives `output_length` bytes with PBKDF2-HMAC over the chosen hash.
pub fn pbkdf2(
    secret: &[u8],
    salt: &[u8],
    rounds: u32,
    output_length: usize,
    hash: HashVariant,
) -> Result<DerivedKey> {
    validate(rounds, output_length, hash.digest_len())?;
    debug!(%hash, rounds, output_length, salt_len = salt.len(), "deriving pbkdf2 key");

    let mut key = output_buffer(output_length)?;
    match hash {
        HashVariant::Sha1 => pbkdf2_hmac::<Sha1>(secret, salt, rounds, &mut key)?,
        HashVariant::Sha256 => pbkdf2_hmac::<Sha256>(secret, salt, rounds, &mut key)?,
        HashVariant::Sha512 => pbkdf2_hmac::<Sha512>(secret, salt, rounds, &mut key)?,
    }
    Ok(key)
}

/// Derives a key using the hash, rounds and length held in `params`.
pub fn pbkdf2_with_params(secret: &[u8], salt: &[u8], params: &Pbkdf2Params) -> Result<DerivedKey> {
    pbkdf2(secret, salt, params.rounds, params.key_len, params.hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_hex(hash: HashVariant, secret: &[u8], salt: &[u8], rounds: u32, len: usize) -> String {
        hex::encode(&*pbkdf2(secret, salt, rounds, len, hash).unwrap())
    }

    #[test]
    fn rfc6070_sha1_vectors() {
        assert_eq!(
            derive_hex(HashVariant::Sha1, b"password", b"salt", 1, 20),
            "0c60c80f961f0e71f3a9b524af6012062fe037a6"
        );
        assert_eq!(
            derive_hex(HashVariant::Sha1, b"password", b"salt", 2, 20),
            "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957"
        );
        assert_eq!(
            derive_hex(
                HashVariant::Sha1,
                b"passwordPASSWORDpassword",
                b"saltSALTsaltSALTsaltSALTsaltSALTsalt",
                4096,
                25
            ),
            "3d2eec4fe41c849b80c8d83662c0e44a8b291a964cf2f07038"
        );
        assert_eq!(
            derive_hex(HashVariant::Sha1, b"pass\0word", b"sa\0lt", 4096, 16),
            "56fa6aa75548099dcc37d7f03425e0c3"
        );
    }

    #[test]
    fn rfc7914_sha256_vector() {
        assert_eq!(
            derive_hex(HashVariant::Sha256, b"password", b"salt", 1, 32),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
        assert_eq!(
            derive_hex(HashVariant::Sha256, b"passwd", b"salt", 1, 64),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc\
             49ca9cccf179b645991664b39d77ef317c71b845b1e30bd509112041d3a19783"
        );
    }

    #[test]
    fn sha512_scenario() {
        assert_eq!(
            derive_hex(HashVariant::Sha512, b"password", b"salt", 1000, 64),
            "afe6c5530785b6cc6b1c6453384731bd5ee432ee549fd42fb6695779ad8a1c5b\
             f59de69c48f774efc4007d5298f9033c0241d5ab69305e7b64eceeb8d834cfec"
        );
    }

    #[test]
    fn long_secret_is_hashed_into_hmac_key() {
        assert_eq!(
            derive_hex(HashVariant::Sha512, &[b'k'; 200], b"salt", 1, 64),
            "9026f6f921f10a3ef17150f57eb0d3018143e8b2cd1d17601a51b22e770013eb\
             d000e07b83669bd9e1b5e666820a0ca3c6851c3ea9da7e9c311f1dbc6a9e03c1"
        );
        assert_eq!(
            derive_hex(HashVariant::Sha256, &[b'k'; 100], b"salt", 2, 40),
            "2c1357648009149f57e4d5544c3435bbca87a6b231300fa3abb2a89b50f56ec3eb3e22ce8267e0fe"
        );
    }

    #[test]
    fn output_is_truncated_at_digest_boundaries() {
        let full = pbkdf2(b"password", b"salt", 3, 60, HashVariant::Sha1).unwrap();
        for len in [0, 1, 19, 20, 21, 39, 40, 41, 60] {
            let key = pbkdf2(b"password", b"salt", 3, len, HashVariant::Sha1).unwrap();
            assert_eq!(key.len(), len);
            assert_eq!(&key[..], &full[..len]);
        }
        assert_eq!(
            hex::encode(&full[..21]),
            "6b4e26125c25cf21ae35ead955f479ea2e71f6ff9e"
        );
    }

    #[test]
    fn empty_secret_and_salt() {
        assert_eq!(
            derive_hex(HashVariant::Sha1, b"", b"", 1, 20),
            "1e437a1c79d75be61e91141dae20affc4892cc99"
        );
    }

    #[test]
    fn zero_rounds_fail() {
        for hash in HashVariant::ALL {
            match pbkdf2(b"password", b"salt", 0, 32, hash) {
                Err(KdfError::InvalidParameter { kdf, .. }) => assert_eq!(kdf, "pbkdf2"),
                other => panic!("expected InvalidParameter, got: {other:?}"),
            }
        }
        let mut out = [0u8; 0];
        assert!(pbkdf2_hmac::<Sha256>(b"pw", b"salt", 0, &mut out).is_err());
    }

    #[test]
    fn params_default_and_validation() {
        let params = Pbkdf2Params::default();
        assert_eq!(params.hash(), HashVariant::Sha512);
        assert_eq!(params.rounds(), 1000);
        assert_eq!(params.key_len(), 64);
        assert!(Pbkdf2Params::new(HashVariant::Sha1, 0, 20).is_err());
        assert!(
            serde_json::from_str::<Pbkdf2Params>(r#"{"hash":"sha1","rounds":0,"key_len":20}"#)
                .is_err()
        );

        let key = pbkdf2_with_params(b"password", b"salt", &params).unwrap();
        assert_eq!(
            &key[..],
            &pbkdf2(b"password", b"salt", 1000, 64, HashVariant::Sha512).unwrap()[..]
        );
    }
}
