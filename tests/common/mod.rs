#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An isolated repository root with its own config, evidence and log dirs.
pub struct TestEnv {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().join("repo");
        fs::create_dir_all(&root).expect("create repo root");
        Self { _tmp: tmp, root }
    }

    /// Writes `canon-verifier.toml`. Performance thresholds are raised so the
    /// host's load never turns into a blocker.
    pub fn write_config(&self, body: &str) {
        let config = format!(
            "[performance]\ncritical_load = 100000.0\nwarning_load = 100000.0\ndeadlock_zombies = 100000\n\n{}",
            body
        );
        fs::write(self.root.join("canon-verifier.toml"), config).expect("write config");
    }

    pub fn output(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn slot(&self, slot: &str) -> Value {
        let raw = fs::read_to_string(self.output().join(format!("{}.json", slot)))
            .expect("read slot");
        serde_json::from_str(&raw).expect("slot is json")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("canon-verifier");
        cmd.current_dir(&self.root)
            .env_remove("CANON_LOG_DIR")
            .env("RUST_LOG", "warn");
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> (i32, Value) {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run canon-verifier");
        let value = serde_json::from_slice(&out.stdout).expect("valid json output");
        (out.status.code().unwrap_or(-1), value)
    }

    /// Layout that passes every GO/NO-GO precondition.
    pub fn make_launch_ready(&self) {
        fs::create_dir_all(self.root.join("config")).expect("create config dir");
        fs::create_dir_all(self.root.join("branding")).expect("create branding dir");
        write_png(&self.root.join("branding/logo.png"), 4096);
        fs::write(
            self.root.join("config/canon_assets.json"),
            serde_json::json!({
                "asset_path": "branding/logo.png",
                "min_size": 1024,
                "max_size": 1048576,
                "allowed_formats": ["png", "svg"]
            })
            .to_string(),
        )
        .expect("write asset config");
    }
}

pub fn write_png(path: &Path, size: usize) {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.resize(size, 0);
    fs::write(path, bytes).expect("write png");
}

/// Answers every connection with `status` until the test process exits.
pub fn http_fixture(status: u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture");
    let addr = listener.local_addr().expect("fixture addr");
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf);
            let body = "ok";
            let reply = format!(
                "HTTP/1.1 {} Fixture\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(reply.as_bytes());
        }
    });
    format!("http://{}/health", addr)
}

/// A loopback URL nothing listens on.
pub fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}/health", addr)
}

pub fn service_block(name: &str, endpoint: &str) -> String {
    format!(
        "[[services]]\nname = \"{}\"\nendpoint = \"{}\"\nresponsibility = \"{} duties\"\n\n",
        name, endpoint, name
    )
}
