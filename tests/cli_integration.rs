//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn es3save() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_es3save"));
    cmd.env_remove("ES3SAVE_PASSWORD").env_remove("RUST_LOG");
    cmd
}

/// Run es3save with the game's default password
fn run_es3save(args: &[&str]) -> Output {
    es3save()
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run es3save")
}

/// Run es3save with password from stdin
fn run_es3save_with_passphrase(args: &[&str], passphrase: &str) -> Output {
    let mut child = es3save()
        .arg("--passphrase-stdin")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn es3save");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = stdin.write_all(passphrase.as_bytes());
    }

    child.wait_with_output().expect("failed to wait for es3save")
}

/// Get path to testdata directory
fn testdata_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push(filename);
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Decrypt a save produced by an independent implementation with the
/// default password.
#[test]
fn test_decrypt_known_save() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("lives-decrypted.json");

    let result = run_es3save(&[
        "decrypt",
        "-i",
        path_str(&testdata_path("lives.es3")),
        "-o",
        path_str(&output),
    ]);
    assert_success(&result, "decrypt");

    let decrypted = fs::read_to_string(&output).unwrap();
    assert_eq!(decrypted, "{\n  \"lives\": 3,\n  \"name\": \"Ana\"\n}\n");
}

#[test]
fn test_decrypt_known_save_raw() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("lives-decrypted.json");

    let result = run_es3save(&[
        "decrypt",
        "-i",
        path_str(&testdata_path("lives.es3")),
        "-o",
        path_str(&output),
        "--raw",
    ]);
    assert_success(&result, "decrypt");

    let decrypted = fs::read_to_string(&output).unwrap();
    let expected = fs::read_to_string(testdata_path("lives.json")).unwrap();
    assert_eq!(decrypted, expected);
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let document = testdata_path("lives.json");
    let encrypted = temp_dir.path().join("lives.save");
    let decrypted = temp_dir.path().join("lives-decrypted.json");

    let result = run_es3save_with_passphrase(
        &["encrypt", "-i", path_str(&document), "-o", path_str(&encrypted)],
        "test",
    );
    assert_success(&result, "encrypt");

    let result = run_es3save_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
            "--raw",
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    let original = fs::read_to_string(&document).unwrap();
    assert_eq!(fs::read_to_string(&decrypted).unwrap(), original);
}

#[test]
fn test_encrypt_default_output_name() {
    let temp_dir = TempDir::new().unwrap();
    let document = temp_dir.path().join("edited.json");
    fs::write(&document, r#"{"lives":5}"#).unwrap();

    let result = run_es3save(&["encrypt", "-i", path_str(&document)]);
    assert_success(&result, "encrypt");

    let save = temp_dir.path().join("edited.save");
    let container = fs::read(&save).unwrap();
    assert_eq!(
        es3save::decrypt_with_default(&container).unwrap(),
        r#"{"lives":5}"#
    );
}

#[test]
fn test_password_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let document = testdata_path("lives.json");
    let encrypted = temp_dir.path().join("lives.save");

    let result = es3save()
        .env("ES3SAVE_PASSWORD", "from env")
        .args(["encrypt", "-i", path_str(&document), "-o", path_str(&encrypted)])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_success(&result, "encrypt");

    let container = fs::read(&encrypted).unwrap();
    assert_eq!(
        es3save::decrypt(&container, b"from env").unwrap(),
        r#"{"lives":3,"name":"Ana"}"#
    );
}

#[test]
fn test_update_operation() {
    let temp_dir = TempDir::new().unwrap();
    let document1 = temp_dir.path().join("doc1.json");
    let document2 = temp_dir.path().join("doc2.json");
    let encrypted = temp_dir.path().join("save.es3");
    let decrypted = temp_dir.path().join("decrypted.json");

    fs::write(&document1, r#"{"lives":3}"#).unwrap();
    let result = run_es3save_with_passphrase(
        &["encrypt", "-i", path_str(&document1), "-o", path_str(&encrypted)],
        "test",
    );
    assert_success(&result, "encrypt");

    fs::write(&document2, r#"{"lives":42}"#).unwrap();
    let result = run_es3save_with_passphrase(
        &["update", "-i", path_str(&document2), "-o", path_str(&encrypted)],
        "test",
    );
    assert_success(&result, "update");

    let result = run_es3save_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
            "--raw",
        ],
        "test",
    );
    assert_success(&result, "decrypt");
    assert_eq!(fs::read_to_string(&decrypted).unwrap(), r#"{"lives":42}"#);
}

#[test]
fn test_update_with_wrong_password_fails() {
    let temp_dir = TempDir::new().unwrap();
    let document = temp_dir.path().join("doc.json");
    let save = temp_dir.path().join("lives.es3");
    fs::copy(testdata_path("lives.es3"), &save).unwrap();
    fs::write(&document, r#"{"lives":42}"#).unwrap();

    let result = run_es3save_with_passphrase(
        &["update", "-i", path_str(&document), "-o", path_str(&save)],
        "wrong",
    );

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("failed to decrypt") && stderr.contains("wrong password"),
        "Expected error message about decryption/password, got: {}",
        stderr
    );
    assert_eq!(
        fs::read(&save).unwrap(),
        fs::read(testdata_path("lives.es3")).unwrap()
    );
}

#[test]
fn test_decrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent = temp_dir.path().join("nonexistent.es3");
    let output = temp_dir.path().join("output.json");

    let result = run_es3save_with_passphrase(
        &["decrypt", "-i", path_str(&nonexistent), "-o", path_str(&output)],
        "test",
    );

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_decrypt_truncated_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let truncated = temp_dir.path().join("truncated.es3");
    let output = temp_dir.path().join("output.json");
    fs::write(&truncated, b"short").unwrap();

    let result = run_es3save(&["decrypt", "-i", path_str(&truncated), "-o", path_str(&output)]);

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("truncated"), "got: {}", stderr);
    assert!(!output.exists());
}

#[test]
fn test_empty_password_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let encrypted = temp_dir.path().join("lives.save");

    let result = run_es3save_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&testdata_path("lives.json")),
            "-o",
            path_str(&encrypted),
        ],
        "",
    );

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("password must not be empty"), "got: {}", stderr);
    assert!(!encrypted.exists());
}

#[test]
fn test_large_document_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let document = temp_dir.path().join("large.json");
    let encrypted = temp_dir.path().join("large.save");
    let decrypted = temp_dir.path().join("large-decrypted.json");

    let items: Vec<String> = (0..20_000)
        .map(|i| format!(r#"{{"id":{},"name":"item{}"}}"#, i, i))
        .collect();
    let content = format!(r#"{{"items":[{}]}}"#, items.join(","));
    fs::write(&document, &content).unwrap();

    let result = run_es3save(&["encrypt", "-i", path_str(&document), "-o", path_str(&encrypted)]);
    assert_success(&result, "encrypt");

    let result = run_es3save(&[
        "decrypt",
        "-i",
        path_str(&encrypted),
        "-o",
        path_str(&decrypted),
        "--raw",
    ]);
    assert_success(&result, "decrypt");
    assert_eq!(fs::read_to_string(&decrypted).unwrap(), content);
}
