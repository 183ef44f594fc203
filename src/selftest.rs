//! Self-test harness.
//!
//! Checks the built-in known-answer vectors, then sweeps every function over a
//! grid of cost parameters with random passwords and a random salt, verifying
//! that each derivation succeeds with the requested output length.

use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use getrandom::fill;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::convenience;
use crate::crypto::HashVariant;
use crate::kdf::{BcryptParams, KdfParams, Pbkdf2Params, ScryptParams};

/// One published or reference-derived test vector.
#[derive(Debug, Clone)]
pub struct KnownAnswer {
    pub name: &'static str,
    pub params: KdfParams,
    pub secret: &'static [u8],
    pub salt: &'static [u8],
    pub expected: &'static str,
}

fn pbkdf2_params(hash: HashVariant, rounds: u32, key_len: usize) -> crate::Result<KdfParams> {
    Ok(KdfParams::Pbkdf2(Pbkdf2Params::new(hash, rounds, key_len)?))
}

/// The built-in vector table.
pub fn known_answers() -> crate::Result<Vec<KnownAnswer>> {
    Ok(vec![
        KnownAnswer {
            name: "rfc6070 pbkdf2-sha1 c=2",
            params: pbkdf2_params(HashVariant::Sha1, 2, 20)?,
            secret: b"password",
            salt: b"salt",
            expected: "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957",
        },
        KnownAnswer {
            name: "rfc7914 pbkdf2-sha256 c=1",
            params: pbkdf2_params(HashVariant::Sha256, 1, 32)?,
            secret: b"password",
            salt: b"salt",
            expected: "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b",
        },
        KnownAnswer {
            name: "pbkdf2-sha512 c=1000",
            params: pbkdf2_params(HashVariant::Sha512, 1000, 64)?,
            secret: b"password",
            salt: b"salt",
            expected: "afe6c5530785b6cc6b1c6453384731bd5ee432ee549fd42fb6695779ad8a1c5b\
                       f59de69c48f774efc4007d5298f9033c0241d5ab69305e7b64eceeb8d834cfec",
        },
        KnownAnswer {
            name: "openbsd bcrypt_pbkdf rounds=4",
            params: KdfParams::Bcrypt(BcryptParams::new(4, 32)?),
            secret: b"password",
            salt: b"salt",
            expected: "5bbf0cc293587f1c3635555c27796598d47e579071bf427e9d8fbe842aba34d9",
        },
        KnownAnswer {
            name: "rfc7914 scrypt N=16 r=1 p=1",
            params: KdfParams::Scrypt(ScryptParams::new(4, 1, 1, 64)?),
            secret: b"",
            salt: b"",
            expected: "77d6576238657b203b19ca42c18a0497f16b4844e3074ae8dfdffa3fede21442\
                       fcd0069ded0948f8326a753a0fc81f17e8d3e0fb2e0d3628cf35e20c38d18906",
        },
    ])
}

/// Runs every known answer, failing on the first mismatch.
pub fn verify_known_answers() -> Result<usize> {
    let vectors = known_answers()?;
    for vector in &vectors {
        let key = vector
            .params
            .derive(vector.secret, vector.salt)
            .with_context(|| format!("known answer '{}' failed to derive", vector.name))?;
        let actual = hex::encode(&*key);
        if actual != vector.expected {
            bail!(
                "known answer '{}' mismatch: expected {}, got {actual}",
                vector.name,
                vector.expected
            );
        }
        debug!(name = vector.name, "known answer verified");
    }
    Ok(vectors.len())
}

/// An inclusive range of cost values walked with a fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweep {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Sweep {
    pub const fn new(start: u32, end: u32, step: u32) -> Self {
        Self { start, end, step }
    }

    pub const fn range(start: u32, end: u32) -> Self {
        Self::new(start, end, 1)
    }

    pub fn values(&self) -> impl Iterator<Item = u32> + use<> {
        (self.start..=self.end).step_by(self.step.max(1) as usize)
    }
}

/// Which parameter combinations the harness exercises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfTestPlan {
    pub password_len: Sweep,
    pub pbkdf2_rounds: Sweep,
    pub hashes: Vec<HashVariant>,
    pub bcrypt_rounds: Sweep,
    pub scrypt_r: Sweep,
    pub scrypt_p: Sweep,
    pub scrypt_log_n: Sweep,
    pub salt_len: usize,
    pub key_len: usize,
}

impl Default for SelfTestPlan {
    fn default() -> Self {
        Self {
            password_len: Sweep::range(8, 10),
            pbkdf2_rounds: Sweep::new(1000, 5000, 200),
            hashes: HashVariant::ALL.to_vec(),
            bcrypt_rounds: Sweep::range(2, 8),
            scrypt_r: Sweep::range(7, 8),
            scrypt_p: Sweep::range(1, 2),
            scrypt_log_n: Sweep::range(13, 14),
            salt_len: 64,
            key_len: 64,
        }
    }
}

impl SelfTestPlan {
    /// A sweep small enough to finish in seconds.
    pub fn quick() -> Self {
        Self {
            password_len: Sweep::range(8, 8),
            pbkdf2_rounds: Sweep::new(100, 300, 200),
            hashes: HashVariant::ALL.to_vec(),
            bcrypt_rounds: Sweep::range(1, 2),
            scrypt_r: Sweep::range(1, 2),
            scrypt_p: Sweep::range(1, 2),
            scrypt_log_n: Sweep::range(4, 5),
            salt_len: 16,
            key_len: 64,
        }
    }

    /// Every case in sweep order: all PBKDF2 cases, then bcrypt, then scrypt.
    pub fn cases(&self) -> Result<Vec<(usize, KdfParams)>> {
        if self.password_len.start < 1 {
            bail!("self-test passwords must be at least one byte long");
        }

        let mut cases = Vec::new();
        for len in self.password_len.values() {
            for rounds in self.pbkdf2_rounds.values() {
                for hash in &self.hashes {
                    let params = Pbkdf2Params::new(*hash, rounds, self.key_len)?;
                    cases.push((len as usize, KdfParams::Pbkdf2(params)));
                }
            }
        }
        for len in self.password_len.values() {
            for rounds in self.bcrypt_rounds.values() {
                let params = BcryptParams::new(rounds, self.key_len)?;
                cases.push((len as usize, KdfParams::Bcrypt(params)));
            }
        }
        for len in self.password_len.values() {
            for r in self.scrypt_r.values() {
                for p in self.scrypt_p.values() {
                    for log_n in self.scrypt_log_n.values() {
                        let log_n = i32::try_from(log_n).context("scrypt log_n out of range")?;
                        let params = convenience::scrypt_params(log_n, r, p, self.key_len)?;
                        cases.push((len as usize, KdfParams::Scrypt(params)));
                    }
                }
            }
        }
        Ok(cases)
    }
}

/// Outcome of one sweep case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub password_len: usize,
    pub params: KdfParams,
    pub elapsed_ms: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a full self-test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub known_answers: usize,
    pub cases: Vec<CaseResult>,
}

impl SelfTestReport {
    pub fn failures(&self) -> usize {
        self.cases.iter().filter(|c| !c.ok).count()
    }

    pub fn passed(&self) -> bool {
        self.failures() == 0
    }
}

fn random_bytes(len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    fill(&mut buf).map_err(|_| anyhow!("OS random generator unavailable"))?;
    Ok(buf)
}

fn derive_case(params: &KdfParams, password: &[u8], salt: &[u8]) -> crate::Result<usize> {
    let key = match params {
        KdfParams::Pbkdf2(p) => convenience::pbkdf2(password, salt, p)?,
        KdfParams::Bcrypt(p) => convenience::bcrypt_kdf(password, salt, p)?,
        KdfParams::Scrypt(p) => convenience::scrypt_kdf(password, salt, p)?,
    };
    Ok(key.len())
}

/// Verifies the known answers, then runs every case of `plan`, reporting
/// each result to `on_case` as it completes.
pub fn run(plan: &SelfTestPlan, mut on_case: impl FnMut(&CaseResult)) -> Result<SelfTestReport> {
    let known_answers = verify_known_answers()?;
    let cases = plan.cases()?;
    info!(known_answers, cases = cases.len(), "starting self-test sweep");

    let salt = random_bytes(plan.salt_len)?;
    let mut password = Zeroizing::new(Vec::new());
    let mut current: Option<(&'static str, usize)> = None;
    let mut results = Vec::with_capacity(cases.len());

    for (password_len, params) in cases {
        // a fresh password for each password length of each function
        if current != Some((params.name(), password_len)) {
            password = random_bytes(password_len)?;
            current = Some((params.name(), password_len));
        }

        let started = Instant::now();
        let outcome = derive_case(&params, &password, &salt);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (ok, error) = match outcome {
            Ok(len) if len == params.key_len() => (true, None),
            Ok(len) => (
                false,
                Some(format!("expected {} bytes, got {len}", params.key_len())),
            ),
            Err(e) => (false, Some(e.to_string())),
        };
        let result = CaseResult {
            password_len,
            params,
            elapsed_ms,
            ok,
            error,
        };
        on_case(&result);
        results.push(result);
    }

    Ok(SelfTestReport {
        known_answers,
        cases: results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_answers_pass() {
        assert_eq!(verify_known_answers().unwrap(), known_answers().unwrap().len());
    }

    #[test]
    fn default_plan_matches_reference_sweep() {
        let plan = SelfTestPlan::default();
        let cases = plan.cases().unwrap();
        // 3 lengths * (21 rounds * 3 hashes + 7 bcrypt rounds + 2 * 2 * 2 scrypt)
        assert_eq!(cases.len(), 3 * (21 * 3 + 7 + 8));
        assert_eq!(plan.pbkdf2_rounds.values().last(), Some(5000));
        assert!(matches!(cases[0].1, KdfParams::Pbkdf2(p) if p.rounds() == 1000));
        assert!(matches!(cases.last().unwrap().1, KdfParams::Scrypt(p) if p.n() == 16384));
    }

    #[test]
    fn sweep_with_zero_step_still_terminates() {
        assert_eq!(Sweep::new(1, 3, 0).values().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_passwords_are_rejected() {
        let mut plan = SelfTestPlan::quick();
        plan.password_len = Sweep::range(0, 1);
        assert!(plan.cases().is_err());
    }

    #[test]
    fn quick_run_passes() {
        let plan = SelfTestPlan::quick();
        let mut seen = 0;
        let report = run(&plan, |_| seen += 1).unwrap();
        assert!(report.passed(), "{report:?}");
        assert_eq!(seen, report.cases.len());
        assert_eq!(report.cases.len(), plan.cases().unwrap().len());
        assert!(report.cases.iter().all(|c| c.error.is_none()));
    }
}
