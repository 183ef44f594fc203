use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const PBKDF2_SHA256_C1: &str = "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b";

fn bin() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("multikdf"));
    cmd.env_remove("MULTIKDF_PASSWORD").env_remove("MULTIKDF_JSON");
    cmd
}

#[test]
fn pbkdf2_prints_hex_key() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["pbkdf2", "--hash", "sha256", "--rounds", "1", "--length", "32", "salt"])
        .assert()
        .success()
        .stdout(format!("{PBKDF2_SHA256_C1}\n"));
}

#[test]
fn pbkdf2_defaults_to_sha512_1000_rounds_64_bytes() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["pbkdf2", "salt"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "afe6c5530785b6cc6b1c6453384731bd5ee432ee549fd42fb6695779ad8a1c5b",
        ));
}

#[test]
fn hash_name_is_case_insensitive() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["pbkdf2", "--hash", "SHA256", "--rounds", "1", "-l", "32", "salt"])
        .assert()
        .success()
        .stdout(predicate::str::contains(PBKDF2_SHA256_C1));
}

#[test]
fn salt_can_be_given_as_hex() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args([
            "pbkdf2", "--hash", "sha256", "--rounds", "1", "--length", "32", "--salt-hex",
            "73616c74",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(PBKDF2_SHA256_C1));
}

#[test]
fn invalid_hex_salt_fails() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["pbkdf2", "--salt-hex", "zz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("salt is not valid hex"));
}

#[test]
fn password_is_read_from_piped_stdin() {
    bin()
        .args(["pbkdf2", "--hash", "sha256", "--rounds", "1", "--length", "32", "salt"])
        .write_stdin("password\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(PBKDF2_SHA256_C1));
}

#[test]
fn missing_password_fails() {
    bin()
        .args(["pbkdf2", "salt"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No password provided"));
}

#[test]
fn json_output_includes_parameters() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["--json", "pbkdf2", "--hash", "sha256", "--rounds", "1", "--length", "32", "salt"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("\"key\":\"{PBKDF2_SHA256_C1}\"")))
        .stdout(predicate::str::contains("\"params\":\"pbkdf2 h=sha256 r=1 kl=32\""))
        .stdout(predicate::str::contains("\"salt\":\"73616c74\""));
}

#[test]
fn json_output_can_be_enabled_from_env() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .env("MULTIKDF_JSON", "true")
        .args(["bcrypt", "--rounds", "1", "--length", "16", "salt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kdf\":\"bcrypt\""));
}

#[test]
fn zero_rounds_fail() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["pbkdf2", "--rounds", "0", "salt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rounds"));
}

#[test]
fn unknown_hash_fails() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["pbkdf2", "--hash", "md5", "salt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("md5"));
}

#[test]
fn bcrypt_matches_openbsd_vector() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["bcrypt", "--rounds", "4", "--length", "32", "salt"])
        .assert()
        .success()
        .stdout("5bbf0cc293587f1c3635555c27796598d47e579071bf427e9d8fbe842aba34d9\n");
}

#[test]
fn scrypt_with_explicit_n() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["scrypt", "-N", "1024", "-r", "8", "-p", "16", "NaCl"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "fdbabe1c9d3472007856e7190d01e9fe7c6ad7cbc8237830e77376634b373162",
        ));
}

#[test]
fn scrypt_with_exponent() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["scrypt", "--log-n", "4", "-r", "2", "-p", "3", "--length", "48", "NaCl"])
        .assert()
        .success()
        .stdout(
            "6c8185aa3a0815f887ade75aa9d70b1732181a1bc1515e8d\
             c67b43079b8620ab42cb858e27a16a4fa8d34f9ed525b316\n",
        );
}

#[test]
fn scrypt_clamps_small_work_factors() {
    let clamped_n = bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["scrypt", "-N", "0", "-r", "1", "salt"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["scrypt", "--log-n", "-3", "-r", "1", "salt"])
        .assert()
        .success()
        .stdout(clamped_n);
}

#[test]
fn json_output_reports_clamped_n() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["--json", "scrypt", "-N", "0", "-r", "1", "salt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"params\":\"scrypt N=2 r=1 p=1 kl=64\""));
}

#[test]
fn scrypt_rejects_non_power_of_two() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["scrypt", "-N", "3", "salt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("power of two"));
}

#[test]
fn scrypt_n_and_log_n_conflict() {
    bin()
        .env("MULTIKDF_PASSWORD", "password")
        .args(["scrypt", "-N", "16", "--log-n", "4", "salt"])
        .assert()
        .failure();
}

#[test]
fn quick_selftest_writes_report() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("report.json");

    bin()
        .args(["selftest", "--quick", "--report"])
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 failures"));

    let parsed: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&report).unwrap()).unwrap();
    assert_eq!(parsed["known_answers"], 5);
    let cases = parsed["cases"].as_array().unwrap();
    assert!(!cases.is_empty());
    assert!(cases.iter().all(|c| c["ok"] == true));
    assert!(cases.iter().any(|c| c["params"]["kdf"] == "scrypt"));
}
