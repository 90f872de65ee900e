//! Runs the compiled `juris` binary against a temporary corpus.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn juris_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_juris"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let corpus = root.join("corpus");
    fs::create_dir_all(corpus.join("codes")).unwrap();
    fs::write(
        corpus.join("bail.txt"),
        "Le bail commercial est conclu pour une durée de neuf ans. \
         Le bail peut être résilié. Le bail se renouvelle. Le loyer du bail est révisable. \
         Le bail est soumis à enregistrement.",
    )
    .unwrap();
    fs::write(
        corpus.join("codes/travail.md"),
        "# Code du travail\n\nLe contrat de travail fixe la période d'essai et le préavis.",
    )
    .unwrap();
    fs::write(corpus.join("scan.pdf"), b"not really a pdf").unwrap();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_content = format!(
        r#"[corpus]
root = "{}"

[retrieval]
top_k = 3
max_context_chars = 600

[backend]
api_key_env = "JURIS_CLI_TEST_KEY_NEVER_SET"
"#,
        corpus.display().to_string().replace('\\', "/")
    );
    let config_path = config_dir.join("juris.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_juris(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = juris_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run juris binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_index_skips_unreadable_files() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_juris(&config, &["index"]);
    assert!(success, "index failed: {}", stderr);
    assert!(stdout.contains("documents indexed: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("bail.txt"));
    assert!(stdout.contains("codes/travail.md"));
    assert!(!stdout.contains("scan.pdf"));
    assert!(stderr.contains("text extraction failed"), "stderr: {}", stderr);
}

#[test]
fn test_search_ranks_matching_document() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_juris(&config, &["search", "bail", "--limit", "5"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.starts_with("1. ["), "stdout: {}", stdout);
    assert!(stdout.contains("bail.txt"));
    assert!(!stdout.contains("travail.md"));
}

#[test]
fn test_search_without_match_prints_no_results() {
    let (_tmp, config) = setup_test_env();
    let (stdout, _stderr, success) = run_juris(&config, &["search", "divorce"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_context_respects_budget() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) =
        run_juris(&config, &["context", "bail", "--max-chars", "250"]);
    assert!(success, "context failed: {}", stderr);
    let context = stdout.trim_end_matches('\n');
    assert!(context.starts_with("Informations juridiques pertinentes :"));
    assert!(context.contains("Document 1 (bail.txt"));
    assert!(context.chars().count() <= 250);
}

#[test]
fn test_detect_strategies() {
    let (_tmp, config) = setup_test_env();

    let (stdout, _, success) = run_juris(&config, &["detect", "Hello, how are you?"]);
    assert!(success);
    assert_eq!(stdout.trim(), "french");

    let (stdout, _, success) = run_juris(&config, &["detect", "شنية الحكاية"]);
    assert!(success);
    assert_eq!(stdout.trim(), "arabic");

    let (stdout, _, success) = run_juris(
        &config,
        &["detect", "chneya el 9anoun ?", "--strategy", "markers"],
    );
    assert!(success);
    assert_eq!(stdout.trim(), "tunisian");

    let (_, stderr, success) = run_juris(&config, &["detect", "x", "--strategy", "vibes"]);
    assert!(!success);
    assert!(stderr.contains("unknown detection strategy"));
}

#[test]
fn test_chat_without_api_key_fails_cleanly() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_juris(&config, &["chat", "c1", "Bonjour"]);
    assert!(!success);
    assert!(
        stderr.contains("JURIS_CLI_TEST_KEY_NEVER_SET"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_missing_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_juris(&tmp.path().join("absent.toml"), &["index"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
