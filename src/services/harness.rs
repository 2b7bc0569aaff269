//! GO/NO-GO launch readiness harness.
//!
//! Runs a fixed list of checks, each producing a `CheckItem`, and folds them
//! into a single GO or NO-GO. A broken directory layout or asset config is an
//! operator error: the remaining checks are skipped and the run ends NO-GO.

use crate::collectors;
use crate::domain::constants::*;
use crate::domain::models::{CheckItem, CheckStatus, FailureKind, GoNoGoReport, GoStatus};
use crate::services::config::{load_asset_config, AssetConfig, VerifierConfig};
use crate::services::orchestrator::{Orchestrator, PhaseContext};
use crate::services::phases::plan_from_config;
use crate::services::runlog::RunLog;
use crate::services::storage::{sha256_hex, timestamp_now, EvidenceStore};
use crate::services::task::{run_bounded, TaskOutcome};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const REPORT_FILE: &str = "verification_report.json";
pub const LOG_FILE: &str = "verification.log";

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub config: Arc<VerifierConfig>,
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub asset_config: PathBuf,
    pub log_dir: PathBuf,
}

/// `<logs>/run_<YYYYmmdd_HHMMSS>`, unless `CANON_LOG_DIR` names one.
pub fn resolve_log_dir(logs_base: &Path) -> PathBuf {
    match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => logs_base.join(format!(
            "run_{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        )),
    }
}

fn item(name: &str, status: CheckStatus, failure: Option<FailureKind>, details: Value) -> CheckItem {
    CheckItem {
        name: name.to_string(),
        status,
        failure,
        details: match details {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
    }
}

fn resolve(root: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

pub fn check_directories(root: &Path, required: &[String]) -> CheckItem {
    let missing: Vec<&String> = required.iter().filter(|d| !resolve(root, d).is_dir()).collect();
    if missing.is_empty() {
        item(
            PHASE_DIRECTORY_STRUCTURE,
            CheckStatus::Pass,
            None,
            json!({"checked": required}),
        )
    } else {
        item(
            PHASE_DIRECTORY_STRUCTURE,
            CheckStatus::Fail,
            Some(FailureKind::Missing),
            json!({"checked": required, "missing": missing}),
        )
    }
}

pub fn check_configuration(path: &Path, required_keys: &[String]) -> (CheckItem, Option<AssetConfig>) {
    match load_asset_config(path, required_keys) {
        Ok(cfg) => (
            item(
                PHASE_CONFIGURATION,
                CheckStatus::Pass,
                None,
                json!({"path": path.display().to_string(), "asset_path": cfg.asset_path}),
            ),
            Some(cfg),
        ),
        Err(e) => (
            item(
                PHASE_CONFIGURATION,
                CheckStatus::Fail,
                Some(FailureKind::Missing),
                json!({"path": path.display().to_string(), "error": e.to_string()}),
            ),
            None,
        ),
    }
}

pub fn check_asset(root: &Path, cfg: &AssetConfig) -> CheckItem {
    let path = resolve(root, &cfg.asset_path);
    let shown = path.display().to_string();
    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            return item(
                PHASE_ASSET,
                CheckStatus::Fail,
                Some(FailureKind::Missing),
                json!({"path": shown, "error": e.to_string()}),
            );
        }
    };
    let size = bytes.len() as u64;
    let format = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let mut problems = Vec::new();
    if size < cfg.min_size || size > cfg.max_size {
        problems.push(format!(
            "size {} outside [{}, {}]",
            size, cfg.min_size, cfg.max_size
        ));
    }
    if !cfg
        .allowed_formats
        .iter()
        .any(|f| f.trim_start_matches('.').eq_ignore_ascii_case(&format))
    {
        problems.push(format!(
            "format '{}' not in [{}]",
            format,
            cfg.allowed_formats.join(", ")
        ));
    }
    let details = json!({
        "path": shown,
        "size": size,
        "format": format,
        "sha256": sha256_hex(&bytes),
        "problems": problems,
    });
    if problems.is_empty() {
        item(PHASE_ASSET, CheckStatus::Pass, None, details)
    } else {
        item(PHASE_ASSET, CheckStatus::Fail, Some(FailureKind::Mismatch), details)
    }
}

pub fn check_readiness(timeout: Duration) -> CheckItem {
    let mut tools = serde_json::Map::new();
    let mut all = true;
    for tool in READINESS_TOOLS {
        let version = collectors::tool_version(tool, timeout);
        all &= version.is_some();
        tools.insert(
            tool.to_string(),
            json!({"available": version.is_some(), "version": version}),
        );
    }
    item(
        PHASE_SERVICE_READINESS,
        if all { CheckStatus::Pass } else { CheckStatus::Warning },
        None,
        json!({"tools": tools}),
    )
}

pub fn nested_run(opts: &HarnessOptions, log: &RunLog) -> CheckItem {
    let ctx = PhaseContext::new(
        opts.config.clone(),
        EvidenceStore::new(&opts.output_dir),
        opts.root.clone(),
    );
    let plan = plan_from_config(&opts.config);
    let nested_log = log.clone();
    let limit = opts.config.timeouts.harness();
    match run_bounded(limit, move || Orchestrator::new(ctx).run(&plan, &nested_log)) {
        TaskOutcome::Ok(summary) => {
            let details = json!({
                "success_count": summary.success_count,
                "fail_count": summary.fail_count,
                "skipped_count": summary.skipped_count,
                "executive_truth": summary.executive_truth,
            });
            if summary.succeeded() {
                item(PHASE_NESTED_RUN, CheckStatus::Pass, None, details)
            } else {
                item(PHASE_NESTED_RUN, CheckStatus::Fail, Some(FailureKind::Mismatch), details)
            }
        }
        TaskOutcome::TimedOut => item(
            PHASE_NESTED_RUN,
            CheckStatus::Fail,
            Some(FailureKind::Timeout),
            json!({"error": format!("timed out after {}s", limit.as_secs())}),
        ),
        TaskOutcome::Failed { message, .. } => item(
            PHASE_NESTED_RUN,
            CheckStatus::Fail,
            None,
            json!({"error": message}),
        ),
        TaskOutcome::NotFound(t) => item(
            PHASE_NESTED_RUN,
            CheckStatus::Skipped,
            Some(FailureKind::Missing),
            json!({"reason": t}),
        ),
    }
}

/// GO iff every critical check passed and nothing failed.
pub fn decide(phases: &[CheckItem], critical: &[String]) -> GoStatus {
    let no_failures = phases.iter().all(|p| p.status != CheckStatus::Fail);
    let critical_pass = critical.iter().all(|c| {
        phases
            .iter()
            .any(|p| &p.name == c && p.status == CheckStatus::Pass)
    });
    if no_failures && critical_pass {
        GoStatus::Go
    } else {
        GoStatus::NoGo
    }
}

const ORDER: &[&str] = &[
    PHASE_DIRECTORY_STRUCTURE,
    PHASE_CONFIGURATION,
    PHASE_ASSET,
    PHASE_SERVICE_READINESS,
    PHASE_NESTED_RUN,
];

fn skipped(name: &str, reason: &str) -> CheckItem {
    item(name, CheckStatus::Skipped, None, json!({"reason": reason}))
}

fn log_check(log: &RunLog, c: &CheckItem) {
    let msg = format!("{}: {:?}", c.name, c.status);
    match c.status {
        CheckStatus::Pass => log.success(msg),
        CheckStatus::Warning | CheckStatus::Skipped => log.warning(msg),
        CheckStatus::Fail => log.error(format!("{} {}", msg, Value::Object(c.details.clone()))),
    }
}

/// Runs every check in order and writes `verification_report.json` into the
/// log directory. `should_stop` is polled between checks.
pub fn run_harness(opts: &HarnessOptions, should_stop: &dyn Fn() -> bool) -> anyhow::Result<GoNoGoReport> {
    std::fs::create_dir_all(&opts.log_dir)?;
    let log = RunLog::to_file(opts.log_dir.join(LOG_FILE))?;
    log.info("Canon-Verifier GO/NO-GO harness");
    log.info(format!("root {}", opts.root.display()));

    let settings = &opts.config.harness;
    let mut phases: Vec<CheckItem> = Vec::new();
    let mut asset_cfg: Option<AssetConfig> = None;
    let mut abort: Option<&str> = None;
    let mut interrupted = false;

    for name in ORDER {
        if let Some(reason) = abort {
            phases.push(skipped(name, reason));
            continue;
        }
        if should_stop() {
            log.warning("interrupt received, stopping");
            interrupted = true;
            abort = Some("interrupted");
            phases.push(skipped(name, "interrupted"));
            continue;
        }
        log.info(format!("phase {}", name));
        let check = match *name {
            PHASE_DIRECTORY_STRUCTURE => check_directories(&opts.root, &settings.required_dirs),
            PHASE_CONFIGURATION => {
                let (c, cfg) = check_configuration(&opts.asset_config, &settings.required_keys);
                asset_cfg = cfg;
                c
            }
            PHASE_ASSET => match &asset_cfg {
                Some(cfg) => check_asset(&opts.root, cfg),
                None => skipped(name, "no asset configuration"),
            },
            PHASE_SERVICE_READINESS => check_readiness(opts.config.timeouts.readiness()),
            _ => nested_run(opts, &log),
        };
        log_check(&log, &check);
        let fatal = check.status == CheckStatus::Fail
            && (*name == PHASE_DIRECTORY_STRUCTURE || *name == PHASE_CONFIGURATION);
        phases.push(check);
        if fatal {
            log.error(format!("{} failed, aborting remaining checks", name));
            abort = Some("aborted");
        }
    }

    let overall_status = if interrupted {
        GoStatus::NoGo
    } else {
        decide(&phases, &settings.critical_phases)
    };
    let count = |s: CheckStatus| phases.iter().filter(|p| p.status == s).count();
    let passed = count(CheckStatus::Pass);
    let failed = count(CheckStatus::Fail);
    let warnings = count(CheckStatus::Warning) + count(CheckStatus::Skipped);

    let (verdict, message) = match overall_status {
        GoStatus::Go => (
            "PASS",
            "All critical verifications passed. System is GO for launch.",
        ),
        GoStatus::NoGo if interrupted => ("FAIL", "Verification interrupted. System is NO-GO."),
        GoStatus::NoGo => (
            "FAIL",
            "Critical verifications failed. System is NO-GO for launch.",
        ),
    };
    match overall_status {
        GoStatus::Go => log.success(message),
        GoStatus::NoGo => log.error(message),
    }

    let report = GoNoGoReport {
        timestamp: timestamp_now(),
        log_dir: opts.log_dir.display().to_string(),
        total_phases: phases.len(),
        phases,
        passed,
        failed,
        warnings,
        overall_status,
        verdict: verdict.to_string(),
        message: message.to_string(),
        interrupted,
    };
    std::fs::write(
        opts.log_dir.join(REPORT_FILE),
        serde_json::to_string_pretty(&report)?,
    )?;
    Ok(report)
}
