// pii-mask/tests/cli_integration_tests.rs
//! End-to-end tests of the `pii-mask` binary.
//!
//! Every command runs with `XDG_CONFIG_HOME` pointed at an empty temporary
//! directory and `PII_MASK_*` variables removed, so a configuration on the
//! machine running the tests cannot leak in.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const ENV_OVERRIDES: &[&str] = &[
    "PII_MASK_CONFIG",
    "PII_MASK_CACHE_ENABLED",
    "PII_MASK_CACHE_TTL_SECS",
    "PII_MASK_CACHE_CAPACITY",
    "PII_MASK_INFERENCE_TIMEOUT_MS",
    "PII_MASK_INFERENCE_SESSIONS",
    "PII_MASK_MAX_BYTES",
    "PII_MASK_ALLOW_DEBUG_PII",
    "RUST_LOG",
];

fn pii_mask(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pii-mask").unwrap();
    for key in ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    cmd.current_dir(config_home.path());
    cmd
}

fn strip_ansi(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&strip_ansi_escapes::strip(bytes)).to_string()
}

fn custom_config(yaml: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    Ok(file)
}

#[test]
fn test_mask_text_argument() -> Result<()> {
    let home = TempDir::new()?;
    pii_mask(&home)
        .args(["mask", "至急 03-1234-5678 まで！"])
        .assert()
        .success()
        .stdout("至急 <MASK> まで！\n");
    Ok(())
}

#[test]
fn test_mask_stdin() -> Result<()> {
    let home = TempDir::new()?;
    pii_mask(&home)
        .arg("mask")
        .write_stdin("田中と鈴木で確認済み\n")
        .assert()
        .success()
        .stdout("<MASK>と<MASK>で確認済み\n");
    Ok(())
}

#[test]
fn test_mask_json_output() -> Result<()> {
    let home = TempDir::new()?;
    let output = pii_mask(&home)
        .args(["mask", "--json", "佐藤に資料投げました"])
        .output()?;
    assert!(output.status.success());

    let response: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(response["masked_text"], "<MASK>に資料投げました");
    assert_eq!(response["entities"][0]["text"], "佐藤");
    assert_eq!(response["entities"][0]["label"], "PERSON");
    assert_eq!(response["risk_score"], 0.6);
    assert_eq!(response["cached"], false);
    Ok(())
}

#[test]
fn test_mask_file_line_by_line_uses_the_cache() -> Result<()> {
    let home = TempDir::new()?;
    let input = home.path().join("messages.txt");
    fs::write(&input, "山田です。携帯は 090-1111-2222\n至急 03-1234-5678 まで！\n山田です。携帯は 090-1111-2222\n")?;

    let output = pii_mask(&home)
        .args(["--debug", "mask", "--lines", "--json", "-i"])
        .arg(&input)
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let responses: Vec<serde_json::Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["risk_score"], 0.7);
    assert_eq!(responses[1]["risk_score"], 0.3);
    assert_eq!(responses[2]["cached"], true);

    let stderr = strip_ansi(&output.stderr);
    assert!(stderr.contains("[INFO pii_mask::commands::mask] Starting mask operation."));
    assert!(stderr.contains("(cache hit: true)"));
    Ok(())
}

#[test]
fn test_logs_never_contain_matched_text() -> Result<()> {
    let home = TempDir::new()?;
    let output = pii_mask(&home)
        .args(["--debug", "mask", "連絡は taro@example.co.jp まで"])
        .output()?;
    assert!(output.status.success());
    let stderr = strip_ansi(&output.stderr);
    assert!(!stderr.contains("taro@example.co.jp"));
    Ok(())
}

#[test]
fn test_quiet_suppresses_logs() -> Result<()> {
    let home = TempDir::new()?;
    pii_mask(&home)
        .args(["--quiet", "mask", "佐藤です"])
        .env("RUST_LOG", "debug")
        .assert()
        .success()
        .stdout("<MASK>です\n")
        .stderr(predicate::str::is_empty());
    Ok(())
}

#[test]
fn test_stats_flag_reports_computed_results() -> Result<()> {
    let home = TempDir::new()?;
    pii_mask(&home)
        .args(["mask", "--lines", "--stats"])
        .write_stdin("佐藤です\n佐藤です\n鈴木です\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("2 stats event(s) recorded."));
    Ok(())
}

#[test]
fn test_too_long_input_exits_with_validation_status() -> Result<()> {
    let home = TempDir::new()?;
    pii_mask(&home)
        .args(["mask", &"あ".repeat(400)])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("text is too long (maximum 1024 bytes, got 1200)"));
    Ok(())
}

#[test]
fn test_blank_input_exits_with_validation_status() -> Result<()> {
    let home = TempDir::new()?;
    pii_mask(&home)
        .arg("mask")
        .write_stdin("   \n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("text is required"));
    Ok(())
}

#[test]
fn test_invalid_line_names_its_line_number() -> Result<()> {
    let home = TempDir::new()?;
    let long_line = "x".repeat(1100);
    pii_mask(&home)
        .args(["mask", "--lines"])
        .write_stdin(format!("佐藤です\n{}\n", long_line))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to mask line 2"));
    Ok(())
}

#[test]
fn test_env_override_from_dotenv_file() -> Result<()> {
    let home = TempDir::new()?;
    fs::write(home.path().join(".env"), "PII_MASK_MAX_BYTES=10\n")?;
    pii_mask(&home)
        .args(["mask", "佐藤に資料投げました"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("maximum 10 bytes"));
    Ok(())
}

#[test]
fn test_custom_pattern_from_config_file() -> Result<()> {
    let home = TempDir::new()?;
    let config = custom_config(
        r#"
patterns:
  - name: employee_id
    label: EMPLOYEE_ID
    kind: regex
    expression: 'EMP-[0-9]{6}'
"#,
    )?;
    pii_mask(&home)
        .arg("--config")
        .arg(config.path())
        .args(["mask", "社員番号 EMP-004211 の件"])
        .assert()
        .success()
        .stdout("社員番号 <MASK> の件\n");
    Ok(())
}

#[test]
fn test_config_path_from_environment() -> Result<()> {
    let home = TempDir::new()?;
    let config = custom_config("mask_token: \"[個人情報]\"\n")?;
    pii_mask(&home)
        .env("PII_MASK_CONFIG", config.path())
        .args(["mask", "佐藤です"])
        .assert()
        .success()
        .stdout("[個人情報]です\n");
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_config_falls_back_to_the_user_config_dir() -> Result<()> {
    let home = TempDir::new()?;
    let dir = home.path().join("pii-mask");
    fs::create_dir_all(&dir)?;
    fs::write(
        dir.join("config.yaml"),
        "patterns:\n  - name: ticket\n    label: TICKET\n    kind: regex\n    expression: 'TCK-[0-9]{4}'\n",
    )?;
    pii_mask(&home)
        .arg("patterns")
        .assert()
        .success()
        .stdout(predicate::str::contains("ticket").and(predicate::str::contains("TCK-[0-9]{4}")));
    Ok(())
}

#[test]
fn test_patterns_lists_the_default_registry() -> Result<()> {
    let home = TempDir::new()?;
    pii_mask(&home)
        .arg("patterns")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("phone_number")
                .and(predicate::str::contains("MYNUMBER"))
                .and(predicate::str::contains("Mask token: <MASK>")),
        );
    Ok(())
}

#[test]
fn test_patterns_json() -> Result<()> {
    let home = TempDir::new()?;
    let output = pii_mask(&home).args(["patterns", "--json"]).output()?;
    assert!(output.status.success());
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["name"], "email");
    assert_eq!(rows[3]["kind"], "digit_run");
    Ok(())
}

#[test]
fn test_invalid_pattern_fails_at_startup() -> Result<()> {
    let home = TempDir::new()?;
    let config = custom_config(
        r#"
patterns:
  - name: broken
    label: BROKEN
    kind: regex
    expression: '(0[0-9]+'
"#,
    )?;
    for subcommand in [vec!["patterns"], vec!["mask", "佐藤です"]] {
        pii_mask(&home)
            .arg("--config")
            .arg(config.path())
            .args(&subcommand)
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("pattern 'broken'"));
    }
    Ok(())
}

#[test]
fn test_invalid_config_values_fail_at_startup() -> Result<()> {
    let home = TempDir::new()?;
    let config = custom_config("inference:\n  sessions: 0\n")?;
    pii_mask(&home)
        .arg("--config")
        .arg(config.path())
        .args(["mask", "佐藤です"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("inference.sessions"));
    Ok(())
}
