mod common;

use common::{http_fixture, refused_endpoint, service_block, TestEnv};
use predicates::str::contains;
use std::fs;

fn four_services(env: &TestEnv, refused: bool) {
    let mut body = String::new();
    body.push_str(&service_block("Backend API", &http_fixture(200)));
    body.push_str(&service_block("Auth Service", &http_fixture(200)));
    body.push_str(&service_block("Ledger", &http_fixture(204)));
    let last = if refused {
        refused_endpoint()
    } else {
        http_fixture(200)
    };
    body.push_str(&service_block("Notifier", &last));
    env.write_config(&body);
}

#[test]
fn one_refused_service_is_partially_operational_and_fails_gate() {
    let env = TestEnv::new();
    four_services(&env, true);

    let (code, run) = env.run_json(&["run"]);
    assert_eq!(code, 0, "{}", run);
    assert_eq!(run["data"]["fail_count"], 0);
    assert_eq!(
        run["data"]["executive_truth"],
        "Partially operational architecture"
    );

    let verdict = &env.slot("canon-verdict")["payload"]["verdict"];
    assert_eq!(verdict["verified"].as_array().unwrap().len(), 3);
    let blockers = verdict["critical_blockers"].as_array().unwrap();
    assert_eq!(blockers.len(), 1);
    assert_eq!(blockers[0]["service"], "Notifier");

    let probes = &env.slot("service-responsibility-matrix")["payload"];
    assert_eq!(probes["blocked_count"], 1);

    env.cmd()
        .arg("gate")
        .assert()
        .code(1)
        .stdout(contains("CI FAIL"))
        .stdout(contains("blocker: Notifier"));
}

#[test]
fn all_services_answering_is_fully_operational_and_passes_gate() {
    let env = TestEnv::new();
    four_services(&env, false);

    let (code, run) = env.run_json(&["run"]);
    assert_eq!(code, 0, "{}", run);
    assert_eq!(
        run["data"]["executive_truth"],
        "Fully operational operating system"
    );
    let artifacts: Vec<&str> = run["data"]["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["file"].as_str().unwrap())
        .collect();
    assert!(artifacts.contains(&"canon-verdict.json"));
    assert!(artifacts.contains(&"inventory.json"));

    let (code, gate) = env.run_json(&["gate"]);
    assert_eq!(code, 0);
    assert_eq!(gate["ok"], true);
    assert_eq!(gate["data"]["verified_count"], 4);
}

#[test]
fn rerun_reflects_current_state_not_previous_evidence() {
    let env = TestEnv::new();
    four_services(&env, false);
    let (code, _) = env.run_json(&["run"]);
    assert_eq!(code, 0);
    env.cmd().arg("gate").assert().code(0);

    four_services(&env, true);
    let (code, run) = env.run_json(&["run"]);
    assert_eq!(code, 0, "{}", run);
    assert_eq!(
        run["data"]["executive_truth"],
        "Partially operational architecture"
    );
    env.cmd()
        .arg("gate")
        .assert()
        .code(1)
        .stdout(contains("blocker: Notifier"));

    // A plan that never reaches the verdict must not leave the old one behind.
    env.write_config(
        r#"
[[phases]]
name = "Broken"
command = ["sh", "-c", "exit 1"]
"#,
    );
    let (code, run) = env.run_json(&["run"]);
    assert_eq!(code, 1, "{}", run);
    assert!(!env.output().join("canon-verdict.json").exists());
    assert!(!env.output().join("service-responsibility-matrix.json").exists());
    env.cmd()
        .arg("gate")
        .assert()
        .code(1)
        .stdout(contains("verdict not found"));
}

#[test]
fn failing_external_phase_fails_the_run() {
    let env = TestEnv::new();
    env.write_config(
        r#"
[[phases]]
name = "Writes evidence"
slot = "external"
command = ["sh", "-c", "echo '{\"payload\":{\"ok\":true}}' > \"$CANON_OUTPUT_DIR/external.json\""]

[[phases]]
name = "Broken"
command = ["sh", "-c", "exit 2"]

[[phases]]
name = "Final Verdict"
builtin = "canon-verdict"
"#,
    );
    let (code, run) = env.run_json(&["run"]);
    assert_eq!(code, 1);
    assert_eq!(run["ok"], false);
    let results = run["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[1]["exit_code"], 2);
    assert_eq!(results[2]["success"], true);
    assert!(env.output().join("external.json").exists());
}

#[test]
fn missing_required_directory_is_no_go() {
    let env = TestEnv::new();
    let log_dir = env.root.join("logs/fixed");
    let out = env
        .cmd()
        .env("CANON_LOG_DIR", &log_dir)
        .args(["--json", "go-no-go"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["data"]["overall_status"], "NO-GO");
    let phases = report["data"]["phases"].as_array().unwrap();
    assert_eq!(phases[0]["name"], "directory_structure");
    assert_eq!(phases[0]["status"], "FAIL");
    assert!(phases[1..].iter().all(|p| p["reason"] == "aborted"));

    assert!(log_dir.join("verification_report.json").exists());
    let log = fs::read_to_string(log_dir.join("verification.log")).unwrap();
    assert!(log.contains("[ERROR] directory_structure failed"));
}

#[test]
fn launch_ready_repository_is_go() {
    let env = TestEnv::new();
    env.make_launch_ready();
    env.write_config(&service_block("Backend API", &http_fixture(200)));

    let out = env
        .cmd()
        .args(["--json", "go-no-go", "--logs-dir", "logs"])
        .output()
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", report);
    assert_eq!(report["data"]["overall_status"], "GO");
    assert_eq!(report["data"]["verdict"], "PASS");

    let phases = report["data"]["phases"].as_array().unwrap();
    let asset = phases.iter().find(|p| p["name"] == "asset").unwrap();
    assert_eq!(asset["status"], "PASS");
    assert_eq!(asset["size"], 4096);
    let nested = phases
        .iter()
        .find(|p| p["name"] == "canon_verifier_harness")
        .unwrap();
    assert_eq!(nested["status"], "PASS");

    let runs: Vec<_> = fs::read_dir(env.root.join("logs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].starts_with("run_"));
    assert!(env.output().join("canon-verdict.json").exists());
}

#[test]
fn undersized_asset_is_no_go() {
    let env = TestEnv::new();
    env.make_launch_ready();
    common::write_png(&env.root.join("branding/logo.png"), 100);
    let out = env
        .cmd()
        .env("CANON_LOG_DIR", env.root.join("logs/small"))
        .args(["--json", "go-no-go"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let asset = report["data"]["phases"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "asset")
        .cloned()
        .unwrap();
    assert_eq!(asset["status"], "FAIL");
    assert_eq!(asset["failure"], "MISMATCH");
}
