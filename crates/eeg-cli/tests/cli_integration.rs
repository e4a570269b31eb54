use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn eegpipe() -> Command {
    Command::cargo_bin("eegpipe").unwrap()
}

fn simulate(path: &Path, extra: &[&str]) {
    eegpipe()
        .arg("simulate")
        .arg(path)
        .args(extra)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2560 samples"));
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    eegpipe()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    eegpipe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("eegpipe"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    eegpipe().args(["process", "--bogus"]).assert().code(2);
}

// =============================================================================
// SIMULATE + PROCESS
// =============================================================================

#[test]
fn test_process_burst_recording() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("eeg_recording_01.csv");
    simulate(&input, &["--burst-at", "4"]);

    eegpipe()
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("4/5 epochs kept"))
        .stdout(predicate::str::contains("rejection rate 20.0%"))
        .stdout(predicate::str::contains("AF7"))
        .stdout(predicate::str::contains("alpha_power"));

    for suffix in [".edf", "_band_powers.csv", "_summary.csv", "_report.json"] {
        let path = dir.path().join(format!("eeg_recording_01{}", suffix));
        assert!(path.exists(), "missing {}", path.display());
    }

    let summary = std::fs::read_to_string(dir.path().join("eeg_recording_01_summary.csv")).unwrap();
    let mut lines = summary.lines();
    assert!(lines.next().unwrap().starts_with("channel,delta_power_mean,delta_power_std"));
    assert!(lines.next().unwrap().starts_with("AF7,"));
    assert!(lines.next().unwrap().starts_with("AF8,"));
    assert!(lines.next().is_none());

    let report_path = dir.path().join("eeg_recording_01_report.json");
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["epochs"]["rejected_epochs"], 1);
}

#[test]
fn test_process_into_output_dir_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("session.csv");
    let out = dir.path().join("out");
    simulate(&input, &["--jitter-ms", "1"]);

    eegpipe()
        .arg("process")
        .arg(&input)
        .arg(&out)
        .args(["--seconds", "6", "--channels", "tp9,af7,af8,tp10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(resampled)"))
        .stdout(predicate::str::contains("TP10"))
        .stderr(predicate::str::contains("irregular sampling"));

    let bands = std::fs::read_to_string(out.join("session_band_powers.csv")).unwrap();
    // At most 3 epochs of 4 channels in 6 s
    assert!(bands.lines().count() <= 1 + 3 * 4);
}

#[test]
fn test_process_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rec.csv");
    simulate(&input, &[]);
    let config = dir.path().join("config.json");
    let json = r#"{ "epoch": { "duration_s": 4.0, "step_s": 2.0 }, "welch": { "taper": "hann" } }"#;
    std::fs::write(&config, json).unwrap();

    eegpipe()
        .arg("process")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("4/4 epochs kept"));
}

#[test]
fn test_process_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    eegpipe()
        .arg("process")
        .arg(dir.path().join("absent.csv"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: failed to process"));
}

#[test]
fn test_process_malformed_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.csv");
    std::fs::write(&input, "Timestamp (ms),TP9,AF7,AF8,TP10\n0,1,2,3,4\n4,1,abc,3,4\n").unwrap();

    eegpipe()
        .arg("process")
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("data row 2"));
}

#[test]
fn test_invalid_channel_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rec.csv");
    simulate(&input, &[]);

    eegpipe()
        .arg("process")
        .arg(&input)
        .args(["--channels", "AF7,Cz"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("channels"));
}

#[test]
fn test_process_noisy_burst_recording() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("eeg_recording_01.csv");
    simulate(&input, &["--burst-at", "4", "--noise-uv", "1.0"]);

    eegpipe()
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("4/5 epochs kept"));
}

#[test]
fn test_nyquist_violation_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rec.csv");
    simulate(&input, &[]);

    eegpipe()
        .arg("process")
        .arg(&input)
        .args(["--target-rate", "60"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Nyquist"));
}

#[test]
fn test_inferred_rate_nyquist_violation_is_usage_error_in_both_commands() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("eeg_recording_01.csv");
    simulate(&input, &[]);
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{ "filter": { "high_hz": 130.0 } }"#).unwrap();

    eegpipe()
        .arg("process")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Nyquist"));

    eegpipe()
        .arg("batch")
        .arg(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("FAIL  eeg_recording_01.csv"))
        .stdout(predicate::str::contains("Nyquist"));
}

// =============================================================================
// BATCH
// =============================================================================

#[test]
fn test_batch_continues_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    simulate(&dir.path().join("eeg_recording_01.csv"), &["--burst-at", "4"]);
    simulate(&dir.path().join("eeg_recording_02.csv"), &["--seed", "7"]);
    let header_only = "Timestamp (ms),TP9,AF7,AF8,TP10\n";
    std::fs::write(dir.path().join("eeg_recording_03.csv"), header_only).unwrap();
    std::fs::write(dir.path().join("other.csv"), "ignored").unwrap();

    eegpipe()
        .arg("batch")
        .arg(dir.path())
        .args(["--jobs", "2"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ok    eeg_recording_01.csv"))
        .stdout(predicate::str::contains("ok    eeg_recording_02.csv"))
        .stdout(predicate::str::contains("FAIL  eeg_recording_03.csv"))
        .stdout(predicate::str::contains("2/3 succeeded, 1 failed"));

    let results = dir.path().join("results");
    assert!(results.join("eeg_recording_01_summary.csv").exists());
    assert!(results.join("eeg_recording_02.edf").exists());
    assert!(!results.join("other_summary.csv").exists());
}

#[test]
fn test_batch_without_matches_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    eegpipe()
        .arg("batch")
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No files matching"));
}
