//! End-to-end runs of the `powerup` binary

use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const CONFIG: &str = r#"
[[economics.pools]]
id = 1
rewards_per_tick = "3"

[bank]
cooldown_ticks = 4
"#;

const SCRIPT: &str = r#"
end_tick = 5

[[steps]]
tick = 1
account = "a"
action = "mint_lp"
amount = "100"

[[steps]]
tick = 1
account = "a"
action = "stake_governance"
amount = "100"

[[steps]]
tick = 1
account = "a"
action = "stake"
amount = "100"

[[steps]]
tick = 1
account = "a"
action = "delegate"
amount = "100"

[[steps]]
tick = 5
account = "a"
action = "claim"
"#;

fn powerup(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_powerup"));
    cmd.arg("--config").arg(config).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_simulate_prints_report_and_snapshot() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("powerup.toml");
    let script = dir.path().join("scenario.toml");
    let snapshot = dir.path().join("records.bin");
    std::fs::write(&config, CONFIG).unwrap();
    std::fs::write(&script, SCRIPT).unwrap();

    let output = powerup(&config)
        .arg("simulate")
        .arg("--script")
        .arg(&script)
        .arg("--snapshot")
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["end_tick"], 5);
    assert_eq!(report["pools"][0]["accrued_rewards_total"], "15");
    let claim = &report["steps"][4];
    assert_eq!(claim["ok"], true);
    let paid: f64 = claim["paid"].as_str().unwrap().parse().unwrap();
    assert!((paid - 15.0).abs() < 1e-9, "paid {}", paid);
    assert_eq!(report["accounts"][0]["power_up"], "1.4");
    assert!(snapshot.exists());
}

#[test]
fn test_curve_command() {
    let dir = tempdir().unwrap();
    let output = powerup(&dir.path().join("absent.toml"))
        .args(["curve", "--delegated", "100", "--lp", "100"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1.4");
}

#[test]
fn test_config_command_reflects_environment() {
    let dir = tempdir().unwrap();
    let output = powerup(&dir.path().join("absent.toml"))
        .arg("config")
        .env("POWERUP__BANK__COOLDOWN_TICKS", "77")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("cooldown_ticks = 77"));
}

#[test]
fn test_bad_script_fails() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("scenario.toml");
    std::fs::write(&script, "[[steps]]\ntick = 1\naction = \"teleport\"\n").unwrap();
    let output = powerup(&dir.path().join("absent.toml"))
        .arg("simulate")
        .arg("--script")
        .arg(&script)
        .output()
        .unwrap();
    assert!(!output.status.success());
}
