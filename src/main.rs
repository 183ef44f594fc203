use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use multikdf::convenience;
use multikdf::selftest::{self, SelfTestPlan};
use multikdf::{BcryptParams, DerivedKey, HashVariant, KdfParams, Pbkdf2Params};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Args)]
struct SaltArgs {
    /// Salt, taken as UTF-8 text unless --salt-hex is given
    salt: String,

    /// Decode SALT as hex
    #[arg(long)]
    salt_hex: bool,
}

impl SaltArgs {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.salt_hex {
            hex::decode(&self.salt).context("salt is not valid hex")
        } else {
            Ok(self.salt.as_bytes().to_vec())
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "multikdf")]
#[command(
    version,
    about = "Derive keys with PBKDF2, bcrypt_pbkdf and scrypt."
)]
struct Cli {
    /// Print a JSON object instead of bare hex
    #[arg(long, global = true, env = "MULTIKDF_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Derives a key with PBKDF2-HMAC
    #[command(arg_required_else_help = true)]
    Pbkdf2 {
        /// Hash function: sha1, sha256 or sha512
        #[arg(long, default_value_t = HashVariant::Sha512)]
        hash: HashVariant,

        /// Iteration count
        #[arg(long, default_value_t = 1000)]
        rounds: u32,

        /// Output length in bytes
        #[arg(short, long, default_value_t = 64)]
        length: usize,

        #[command(flatten)]
        salt: SaltArgs,
    },

    /// Derives a key with OpenBSD bcrypt_pbkdf
    #[command(arg_required_else_help = true)]
    Bcrypt {
        /// Number of rounds
        #[arg(long, default_value_t = 10)]
        rounds: u32,

        /// Output length in bytes
        #[arg(short, long, default_value_t = 64)]
        length: usize,

        #[command(flatten)]
        salt: SaltArgs,
    },

    /// Derives a key with scrypt
    #[command(arg_required_else_help = true)]
    Scrypt {
        /// Work factor exponent, N = 2^log_n (values below 1 are raised to 1)
        #[arg(long = "log-n", allow_negative_numbers = true, conflicts_with = "n")]
        log_n: Option<i32>,

        /// Work factor N itself (values below 2 are raised to 2)
        #[arg(short = 'N', value_name = "N")]
        n: Option<u64>,

        /// Block size
        #[arg(short, default_value_t = 8)]
        r: u32,

        /// Parallelism
        #[arg(short, default_value_t = 1)]
        p: u32,

        /// Output length in bytes
        #[arg(short, long, default_value_t = 64)]
        length: usize,

        #[command(flatten)]
        salt: SaltArgs,
    },

    /// Verifies known answers and sweeps every function over a parameter grid
    Selftest {
        /// Run a small sweep instead of the full one
        #[arg(long)]
        quick: bool,

        /// Write the full report as JSON to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct DerivedOutput<'a> {
    kdf: &'a str,
    params: String,
    salt: String,
    key: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_key(json: bool, kdf: &str, params: String, salt: &[u8], key: &DerivedKey) -> Result<()> {
    if json {
        let output = DerivedOutput {
            kdf,
            params,
            salt: hex::encode(salt),
            key: hex::encode(&**key),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", hex::encode(&**key));
    }
    Ok(())
}

fn run_selftest(json: bool, quick: bool, report_path: Option<PathBuf>) -> Result<()> {
    let plan = if quick {
        SelfTestPlan::quick()
    } else {
        SelfTestPlan::default()
    };

    let report = selftest::run(&plan, |case| {
        if !json {
            let status = if case.ok { "ok  " } else { "FAIL" };
            println!(
                "{status} {} pw={} ({} ms)",
                case.params, case.password_len, case.elapsed_ms
            );
            if let Some(error) = &case.error {
                println!("     {error}");
            }
        }
    })?;

    if let Some(path) = report_path {
        let bytes = serde_json::to_vec_pretty(&report)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!(
            "{} known answers, {} cases, {} failures",
            report.known_answers,
            report.cases.len(),
            report.failures()
        );
    }

    if !report.passed() {
        bail!("{} self-test cases failed", report.failures());
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Cli::parse();

    match args.command {
        Commands::Pbkdf2 {
            hash,
            rounds,
            length,
            salt,
        } => {
            let salt = salt.to_bytes()?;
            let params = Pbkdf2Params::new(hash, rounds, length)?;
            let password = auth::read_password()?;
            let key = convenience::pbkdf2(password.as_bytes(), &salt, &params)?;
            print_key(args.json, "pbkdf2", KdfParams::Pbkdf2(params).to_string(), &salt, &key)?;
        }
        Commands::Bcrypt {
            rounds,
            length,
            salt,
        } => {
            let salt = salt.to_bytes()?;
            let params = BcryptParams::new(rounds, length)?;
            let password = auth::read_password()?;
            let key = convenience::bcrypt_kdf(password.as_bytes(), &salt, &params)?;
            print_key(args.json, "bcrypt", KdfParams::Bcrypt(params).to_string(), &salt, &key)?;
        }
        Commands::Scrypt {
            log_n,
            n,
            r,
            p,
            length,
            salt,
        } => {
            let salt = salt.to_bytes()?;
            let password = auth::read_password()?;
            let (key, described) = match n {
                Some(n) => {
                    let key =
                        convenience::scrypt_hash(password.as_bytes(), &salt, n, r, p, length)?;
                    let n = convenience::clamp_n(n);
                    (key, format!("scrypt N={n} r={r} p={p} kl={length}"))
                }
                None => {
                    let params = convenience::scrypt_params(log_n.unwrap_or(14), r, p, length)?;
                    let key = convenience::scrypt_kdf(password.as_bytes(), &salt, &params)?;
                    (key, KdfParams::Scrypt(params).to_string())
                }
            };
            print_key(args.json, "scrypt", described, &salt, &key)?;
        }
        Commands::Selftest { quick, report } => {
            run_selftest(args.json, quick, report)?;
        }
    }

    Ok(())
}
