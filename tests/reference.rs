//! Cross-checks against the RustCrypto implementations of the same functions.

use multikdf::crypto::{Digest, Hmac};
use multikdf::{HashVariant, KdfError, bcrypt_pbkdf, pbkdf2, scrypt};

/// Deterministic filler bytes (xorshift32).
fn bytes(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

#[test]
fn sha_matches_rustcrypto() {
    for len in [0, 1, 55, 56, 63, 64, 65, 111, 112, 127, 128, 129, 1000] {
        let data = bytes(len as u32 + 7, len);
        assert_eq!(
            <multikdf::crypto::Sha1 as Digest>::digest(&data),
            <sha1::Sha1 as sha1::Digest>::digest(&data).to_vec(),
            "sha1 len={len}"
        );
        assert_eq!(
            <multikdf::crypto::Sha256 as Digest>::digest(&data),
            <sha2::Sha256 as sha2::Digest>::digest(&data).to_vec(),
            "sha256 len={len}"
        );
        assert_eq!(
            <multikdf::crypto::Sha512 as Digest>::digest(&data),
            <sha2::Sha512 as sha2::Digest>::digest(&data).to_vec(),
            "sha512 len={len}"
        );
    }
}

#[test]
fn hmac_matches_rustcrypto() {
    use hmac::Mac;

    for key_len in [0, 20, 64, 65, 128, 129, 200] {
        let key = bytes(key_len as u32 + 3, key_len);
        let data = bytes(99, 77);

        let mut ours = [0u8; 64];
        Hmac::<multikdf::crypto::Sha512>::mac(&key, &data, &mut ours);
        let mut theirs = hmac::Hmac::<sha2::Sha512>::new_from_slice(&key).unwrap();
        theirs.update(&data);
        assert_eq!(&ours[..], &theirs.finalize().into_bytes()[..], "key_len={key_len}");

        let mut ours = [0u8; 32];
        Hmac::<multikdf::crypto::Sha256>::mac(&key, &data, &mut ours);
        let mut theirs = hmac::Hmac::<sha2::Sha256>::new_from_slice(&key).unwrap();
        theirs.update(&data);
        assert_eq!(&ours[..], &theirs.finalize().into_bytes()[..], "key_len={key_len}");
    }
}

#[test]
fn pbkdf2_matches_rustcrypto() {
    let password = bytes(1, 9);
    let salt = bytes(2, 64);

    for rounds in [1, 2, 1000] {
        for len in [1, 20, 32, 33, 64, 100] {
            let mut expected = vec![0u8; len];
            ::pbkdf2::pbkdf2_hmac::<sha1::Sha1>(&password, &salt, rounds, &mut expected);
            let actual = pbkdf2(&password, &salt, rounds, len, HashVariant::Sha1).unwrap();
            assert_eq!(&actual[..], &expected[..], "sha1 rounds={rounds} len={len}");

            ::pbkdf2::pbkdf2_hmac::<sha2::Sha256>(&password, &salt, rounds, &mut expected);
            let actual = pbkdf2(&password, &salt, rounds, len, HashVariant::Sha256).unwrap();
            assert_eq!(&actual[..], &expected[..], "sha256 rounds={rounds} len={len}");

            ::pbkdf2::pbkdf2_hmac::<sha2::Sha512>(&password, &salt, rounds, &mut expected);
            let actual = pbkdf2(&password, &salt, rounds, len, HashVariant::Sha512).unwrap();
            assert_eq!(&actual[..], &expected[..], "sha512 rounds={rounds} len={len}");
        }
    }
}

#[test]
fn bcrypt_pbkdf_matches_rustcrypto() {
    let password = bytes(5, 10);
    let salt = bytes(6, 64);

    for rounds in [1, 2, 8] {
        for len in [1, 16, 32, 33, 64, 100] {
            let mut expected = vec![0u8; len];
            ::bcrypt_pbkdf::bcrypt_pbkdf(&password, &salt, rounds, &mut expected).unwrap();
            let actual = bcrypt_pbkdf(&password, &salt, rounds, len).unwrap();
            assert_eq!(&actual[..], &expected[..], "rounds={rounds} len={len}");
        }
    }
}

#[test]
fn scrypt_matches_rustcrypto() {
    let password = bytes(7, 8);
    let salt = bytes(8, 64);

    for log_n in [1u8, 4, 10] {
        for r in [1u32, 2, 8] {
            for p in [1u32, 2] {
                let params = ::scrypt::Params::new(log_n, r, p, 64).unwrap();
                let mut expected = [0u8; 64];
                ::scrypt::scrypt(&password, &salt, &params, &mut expected).unwrap();
                let actual = scrypt(&password, &salt, 1 << log_n, r, p, 64).unwrap();
                assert_eq!(&actual[..], &expected[..], "log_n={log_n} r={r} p={p}");
            }
        }
    }
}

#[test]
fn every_input_bit_matters() {
    let password = b"correct horse".to_vec();
    let salt = bytes(11, 16);

    type Derive = fn(&[u8], &[u8]) -> multikdf::Result<multikdf::DerivedKey>;
    let functions: [(&str, Derive); 3] = [
        ("pbkdf2", |pw, salt| pbkdf2(pw, salt, 2, 32, HashVariant::Sha256)),
        ("bcrypt", |pw, salt| bcrypt_pbkdf(pw, salt, 2, 32)),
        ("scrypt", |pw, salt| scrypt(pw, salt, 16, 1, 1, 32)),
    ];

    for (name, derive) in functions {
        let base = derive(&password, &salt).unwrap();
        assert_eq!(&base[..], &derive(&password, &salt).unwrap()[..], "{name} determinism");

        let mut flipped = password.clone();
        flipped[3] ^= 0x01;
        assert_ne!(&base[..], &derive(&flipped, &salt).unwrap()[..], "{name} password bit");

        let mut flipped = salt.clone();
        flipped[15] ^= 0x80;
        assert_ne!(&base[..], &derive(&password, &flipped).unwrap()[..], "{name} salt bit");
    }
}

#[test]
fn every_cost_parameter_matters() {
    let (pw, salt) = (b"pw".as_slice(), b"salt".as_slice());

    let base = pbkdf2(pw, salt, 2, 32, HashVariant::Sha256).unwrap();
    assert_ne!(&base[..], &pbkdf2(pw, salt, 3, 32, HashVariant::Sha256).unwrap()[..]);
    assert_ne!(&base[..], &pbkdf2(pw, salt, 2, 32, HashVariant::Sha512).unwrap()[..]);

    let base = bcrypt_pbkdf(pw, salt, 2, 32).unwrap();
    assert_ne!(&base[..], &bcrypt_pbkdf(pw, salt, 3, 32).unwrap()[..]);

    let base = scrypt(pw, salt, 16, 1, 1, 32).unwrap();
    assert_ne!(&base[..], &scrypt(pw, salt, 32, 1, 1, 32).unwrap()[..]);
    assert_ne!(&base[..], &scrypt(pw, salt, 16, 2, 1, 32).unwrap()[..]);
    assert_ne!(&base[..], &scrypt(pw, salt, 16, 1, 2, 32).unwrap()[..]);
}

#[test]
fn rejected_parameters_never_yield_output() {
    assert!(matches!(
        pbkdf2(b"pw", b"salt", 0, 32, HashVariant::Sha1),
        Err(KdfError::InvalidParameter { .. })
    ));
    assert!(matches!(
        bcrypt_pbkdf(b"pw", b"salt", 0, 32),
        Err(KdfError::InvalidParameter { .. })
    ));
    assert!(matches!(
        scrypt(b"pw", b"salt", 24, 1, 1, 32),
        Err(KdfError::InvalidParameter { .. })
    ));
}
