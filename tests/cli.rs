mod common;

use common::TestEnv;
use predicates::str::contains;

#[test]
fn phases_lists_default_plan() {
    let env = TestEnv::new();
    env.cmd()
        .arg("phases")
        .assert()
        .success()
        .stdout(contains("canon-verdict"))
        .stdout(contains("builtin:inventory"));
}

#[test]
fn configured_plan_replaces_default() {
    let env = TestEnv::new();
    env.write_config(
        r#"
[[phases]]
name = "Final Verdict"
builtin = "canon-verdict"

[[phases]]
name = "Custom Probe"
command = ["sh", "-c", "true"]
"#,
    );
    let (code, v) = env.run_json(&["phases"]);
    assert_eq!(code, 0);
    let items = v["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["slot"], "custom-probe");
    assert_eq!(items[1]["invocation"], "command:sh -c true");
}

#[test]
fn gate_without_verdict_fails() {
    let env = TestEnv::new();
    env.cmd()
        .arg("gate")
        .assert()
        .code(1)
        .stdout(contains("CI FAIL"));
}

#[test]
fn malformed_config_is_an_error() {
    let env = TestEnv::new();
    std::fs::write(env.root.join("canon-verifier.toml"), "[[services]\nname=").unwrap();
    env.cmd()
        .arg("phases")
        .assert()
        .code(1)
        .stderr(contains("invalid config"));
}

#[test]
fn verdict_without_evidence_is_insufficient() {
    let env = TestEnv::new();
    let (code, v) = env.run_json(&["verdict"]);
    assert_eq!(code, 0);
    assert_eq!(
        v["data"]["verdict"]["executive_truth"],
        "Insufficient evidence for determination"
    );
    assert!(env.output().join("canon-verdict.json").exists());
}
