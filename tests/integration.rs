use std::path::Path;
use std::process::Command;

use walkdir::WalkDir;

fn nameplan_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_nameplan"));
    cmd.current_dir(dir);
    cmd.env_remove("NAMEPLAN_LOG");
    cmd
}

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new("tests/fixtures").join(name)
}

/// Copy a fixture into a fresh temp dir so commands may write to it.
fn scratch(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let source = fixture(name);
    for entry in WalkDir::new(&source).into_iter().filter_map(Result::ok) {
        let relative = entry.path().strip_prefix(&source).unwrap();
        let dest = dir.path().join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).unwrap();
        } else {
            std::fs::copy(entry.path(), &dest).unwrap();
        }
    }
    dir
}

#[test]
fn scan_lists_fixable_and_unfixable_matches() {
    let out = nameplan_cmd(&fixture("basic")).arg("scan").output().unwrap();
    assert!(out.status.success(), "scan failed: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("src/app.ts:1:"), "{stdout}");
    assert!(stdout.contains("old-module -> new-module"), "{stdout}");
    assert!(stdout.contains("WRONG_PREFIX_KEY"), "{stdout}");
    assert!(stdout.contains("2 matches in 2 files (3 scanned, 0 skipped)"), "{stdout}");
}

#[test]
fn plan_then_check_passes() {
    let dir = scratch("basic");
    let plan = nameplan_cmd(dir.path()).arg("plan").output().unwrap();
    assert!(plan.status.success(), "plan failed: {}", String::from_utf8_lossy(&plan.stderr));

    let stdout = String::from_utf8_lossy(&plan.stdout);
    assert!(stdout.contains("rename  src/old-module.ts -> src/new-module.ts"), "{stdout}");
    assert!(stdout.contains("update  src/app.ts:1  ./old-module -> ./new-module"), "{stdout}");
    assert!(dir.path().join(".nameplan.plan.json").exists(), "plan file not written");

    let check = nameplan_cmd(dir.path()).arg("check").output().unwrap();
    assert!(check.status.success(), "check failed: {}", String::from_utf8_lossy(&check.stderr));
    assert!(String::from_utf8_lossy(&check.stdout).contains(" valid: 2 actions"));
}

#[test]
fn plan_json_without_write_orders_rename_first() {
    let dir = scratch("basic");
    let out = nameplan_cmd(dir.path()).args(["plan", "--json", "--no-write"]).output().unwrap();
    assert!(out.status.success(), "plan failed: {}", String::from_utf8_lossy(&out.stderr));
    assert!(!dir.path().join(".nameplan.plan.json").exists());

    let plan: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rename_id = plan["renames"][0]["header"]["id"].as_str().unwrap();
    let update_id = plan["reference_updates"][0]["header"]["id"].as_str().unwrap();
    assert_eq!(plan["execution_order"], serde_json::json!([rename_id, update_id]));
    assert_eq!(plan["conflicts"], serde_json::json!([]));
}

#[test]
fn check_without_plan_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = nameplan_cmd(dir.path()).arg("check").output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Plan Not Found"));
}

#[test]
fn check_rejects_a_corrupt_plan() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".nameplan.plan.json"), "{ not json").unwrap();
    let out = nameplan_cmd(dir.path()).arg("check").output().unwrap();
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn validate_reports_missing_field_then_fix_repairs_it() {
    let dir = scratch("basic");

    let out = nameplan_cmd(dir.path()).arg("validate").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("report-missing-field"), "{stderr}");
    assert!(stderr.contains("environment: passed"), "{stderr}");
    assert!(stderr.contains("ci: passed"), "{stderr}");

    let fixed = nameplan_cmd(dir.path()).args(["validate", "--fix"]).output().unwrap();
    assert!(fixed.status.success(), "fix failed: {}", String::from_utf8_lossy(&fixed.stderr));
    let report = std::fs::read_to_string(dir.path().join("reports/scan-summary.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert!(value.get("generated_at").is_some());
    assert!(value.get("generatedAt").is_none());
}

#[test]
fn validate_json_flags_bad_env_keys() {
    let dir = scratch("basic");
    std::fs::write(dir.path().join(".env"), "APP_NAME=demo\nlegacyKey=1\n").unwrap();

    let out = nameplan_cmd(dir.path()).args(["validate", "--json", "--fix"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["passed"], serde_json::json!(false));

    let env = report["checks"].as_array().unwrap().iter().find(|c| c["check"] == "environment").unwrap();
    let codes: Vec<&str> = env["findings"].as_array().unwrap().iter().map(|f| f["code"].as_str().unwrap()).collect();
    assert_eq!(codes, vec!["env-prefix", "env-format"]);
}

#[test]
fn validate_without_config_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = nameplan_cmd(dir.path()).arg("validate").output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Config Not Found"));
}

#[test]
fn info_json_reports_state() {
    let out = nameplan_cmd(&fixture("basic")).args(["info", "--json"]).output().unwrap();
    assert!(out.status.success());
    let info: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(info["current_state"]["config_found"], serde_json::json!(true));
    assert_eq!(info["current_state"]["patterns"], serde_json::json!(["kebab-modules", "env-prefix"]));
    assert_eq!(info["current_state"]["plan_id"], serde_json::Value::Null);
}

#[test]
fn info_markdown_shows_config_example_and_state() {
    let out = nameplan_cmd(&fixture("basic")).arg("info").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("validator = { kind = \"context-lacks\", text = \"legacy\" }"), "{stdout}");
    assert!(stdout.contains("most specific glob wins"), "{stdout}");
    assert!(stdout.contains("## Current State"), "{stdout}");
}
