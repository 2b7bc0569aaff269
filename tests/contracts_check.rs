mod common;

use common::{http_fixture, refused_endpoint, service_block, TestEnv};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

fn load_schema(name: &str) -> Value {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(root.join("docs/contracts").join(name)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn validate(schema_name: &str, data: &Value) {
    let schema = load_schema(schema_name);
    let validator = JSONSchema::compile(&schema).expect("compile schema");
    let msgs: Vec<String> = match validator.validate(data) {
        Ok(()) => return,
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    panic!("schema validation failed: {}", msgs.join(" | "));
}

#[test]
fn contracts_check() {
    let env = TestEnv::new();
    let mut body = service_block("Backend API", &http_fixture(200));
    body.push_str(&service_block("Billing", &http_fixture(503)));
    body.push_str(&service_block("Search", &refused_endpoint()));
    body.push_str("[[services]]\nname = \"Analytics\"\nresponsibility = \"reports\"\n");
    env.write_config(&body);

    let (_, run) = env.run_json(&["run"]);
    validate("run-summary.schema.json", &run["data"]);

    validate("verdict.schema.json", &env.slot("canon-verdict"));

    let (code, gate) = env.run_json(&["gate"]);
    assert_eq!(code, 1);
    validate("gate-decision.schema.json", &gate["data"]);

    let out = env
        .cmd()
        .env("CANON_LOG_DIR", env.root.join("logs/contract"))
        .args(["--json", "go-no-go"])
        .output()
        .unwrap();
    let report: Value = serde_json::from_slice(&out.stdout).unwrap();
    validate("go-no-go-report.schema.json", &report["data"]);

    let written = fs::read_to_string(env.root.join("logs/contract/verification_report.json")).unwrap();
    validate(
        "go-no-go-report.schema.json",
        &serde_json::from_str::<Value>(&written).unwrap(),
    );
}
