//! Sequential phase runner.
//!
//! Phases run strictly in plan order. Each one is bounded by the configured
//! phase timeout and a failure never stops the run. Built-in phases hand their
//! payload back and only the orchestrator writes it to the phase's slot, so a
//! phase abandoned on timeout can never touch the store.
//!
//! Every slot the plan names, plus every built-in slot, is cleared before the
//! first phase starts. A phase that fails therefore leaves its slot absent and
//! later phases see no evidence rather than the previous run's.

use crate::domain::constants::{BUILTIN_SLOTS, OUTPUT_DIR_ENV, SLOT_VERDICT};
use crate::domain::documents::VerdictView;
use crate::domain::models::{FailureKind, PhasePlanItem, PhaseResult, PhaseStatus, RunSummary};
use crate::services::config::VerifierConfig;
use crate::services::runlog::RunLog;
use crate::services::storage::{timestamp_now, EvidenceStore};
use crate::services::task::{run_bounded, run_prepared, TaskOutcome};
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Set by the orchestrator when it abandons a timed-out built-in phase.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a built-in phase may read. Cheap to clone into a worker.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub config: Arc<VerifierConfig>,
    pub store: EvidenceStore,
    pub root: PathBuf,
    pub cancel: CancelFlag,
}

impl PhaseContext {
    pub fn new(config: Arc<VerifierConfig>, store: EvidenceStore, root: PathBuf) -> Self {
        Self {
            config,
            store,
            root,
            cancel: CancelFlag::default(),
        }
    }

    /// Built-in phases call this between collector invocations so that an
    /// abandoned phase stops launching probes and subprocesses.
    pub fn ensure_live(&self) -> anyhow::Result<()> {
        if self.cancel.is_cancelled() {
            anyhow::bail!("phase abandoned after timeout");
        }
        Ok(())
    }
}

pub type PhaseFn = fn(&PhaseContext) -> anyhow::Result<serde_json::Value>;

#[derive(Clone)]
pub enum Invocation {
    /// Runs on a worker thread. On timeout the worker is abandoned, not
    /// killed: its cancel flag is set and it stops at the next
    /// `ensure_live` check, but a collector already in flight finishes
    /// within its own timeout.
    Builtin(PhaseFn),
    Command { program: String, args: Vec<String> },
    /// The declared target does not exist; the phase is skipped.
    Missing(String),
}

#[derive(Clone)]
pub struct Phase {
    pub name: String,
    pub slot: String,
    pub invocation: Invocation,
}

impl Phase {
    pub fn builtin(name: &str, slot: &str, f: PhaseFn) -> Self {
        Self {
            name: name.to_string(),
            slot: slot.to_string(),
            invocation: Invocation::Builtin(f),
        }
    }

    pub fn describe(&self) -> PhasePlanItem {
        let invocation = match &self.invocation {
            Invocation::Builtin(_) => format!("builtin:{}", self.slot),
            Invocation::Command { program, args } => {
                let mut parts = vec![program.clone()];
                parts.extend(args.iter().cloned());
                format!("command:{}", parts.join(" "))
            }
            Invocation::Missing(target) => format!("missing:{}", target),
        };
        PhasePlanItem {
            name: self.name.clone(),
            slot: self.slot.clone(),
            invocation,
        }
    }
}

pub struct Orchestrator {
    ctx: PhaseContext,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(ctx: PhaseContext) -> Self {
        let timeout = ctx.config.timeouts.phase();
        Self { ctx, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn context(&self) -> &PhaseContext {
        &self.ctx
    }

    pub fn run(&self, plan: &[Phase], log: &RunLog) -> anyhow::Result<RunSummary> {
        let started_at = timestamp_now();
        self.ctx.store.ensure()?;
        self.clear_slots(plan)?;
        log.info(format!(
            "running {} phase(s), evidence in {}",
            plan.len(),
            self.ctx.store.dir().display()
        ));

        let mut results = Vec::with_capacity(plan.len());
        for (i, phase) in plan.iter().enumerate() {
            log.info(format!("[{}/{}] {}", i + 1, plan.len(), phase.name));
            let result = self.run_phase(phase);
            match result.status {
                PhaseStatus::Succeeded => {
                    log.success(format!("{} completed in {}ms", phase.name, result.duration_ms))
                }
                PhaseStatus::Skipped => log.warning(format!(
                    "{} skipped: {}",
                    phase.name,
                    result.error.as_deref().unwrap_or("")
                )),
                PhaseStatus::Failed | PhaseStatus::TimedOut => log.error(format!(
                    "{} failed: {}",
                    phase.name,
                    result.error.as_deref().unwrap_or("")
                )),
            }
            results.push(result);
        }

        let count = |s: PhaseStatus| results.iter().filter(|r| r.status == s).count();
        let success_count = count(PhaseStatus::Succeeded);
        let skipped_count = count(PhaseStatus::Skipped);
        let fail_count = results.len() - success_count - skipped_count;

        let artifacts = self.ctx.store.artifacts()?;
        let verdict = self
            .ctx
            .store
            .read_payload::<VerdictView>(SLOT_VERDICT)
            .map(|v| v.verdict);

        Ok(RunSummary {
            started_at,
            output_dir: self.ctx.store.dir().display().to_string(),
            results,
            success_count,
            fail_count,
            skipped_count,
            artifacts,
            executive_truth: verdict.as_ref().map(|v| v.executive_truth.clone()),
            rationale: verdict.map(|v| v.rationale),
        })
    }

    fn clear_slots(&self, plan: &[Phase]) -> anyhow::Result<()> {
        let slots = plan
            .iter()
            .map(|p| p.slot.as_str())
            .chain(BUILTIN_SLOTS.iter().copied());
        for slot in slots {
            if self.ctx.store.remove(slot)? {
                log::debug!("cleared stale slot {}", slot);
            }
        }
        Ok(())
    }

    pub fn run_phase(&self, phase: &Phase) -> PhaseResult {
        let start = Instant::now();
        let outcome = match &phase.invocation {
            Invocation::Builtin(f) => self.run_builtin(phase, *f),
            Invocation::Command { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args)
                    .current_dir(&self.ctx.root)
                    .env(OUTPUT_DIR_ENV, self.ctx.store.dir());
                run_prepared(cmd, program, self.timeout).map(|out| {
                    if !out.stdout.trim().is_empty() {
                        log::debug!("{} stdout: {}", phase.name, out.stdout.trim());
                    }
                })
            }
            Invocation::Missing(target) => TaskOutcome::NotFound(target.clone()),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        result_from(phase, outcome, self.timeout, duration_ms)
    }

    fn run_builtin(&self, phase: &Phase, f: PhaseFn) -> TaskOutcome<()> {
        let ctx = PhaseContext {
            cancel: CancelFlag::default(),
            ..self.ctx.clone()
        };
        let cancel = ctx.cancel.clone();
        let outcome = run_bounded(self.timeout, move || f(&ctx));
        if matches!(outcome, TaskOutcome::TimedOut) {
            cancel.cancel();
        }
        match outcome {
            TaskOutcome::Ok(payload) => match self.ctx.store.write(&phase.slot, &phase.name, &payload) {
                Ok(_) => TaskOutcome::Ok(()),
                Err(e) => TaskOutcome::Failed {
                    code: -1,
                    message: e.to_string(),
                },
            },
            other => other.map(|_| ()),
        }
    }
}

fn result_from(phase: &Phase, outcome: TaskOutcome<()>, timeout: Duration, duration_ms: u64) -> PhaseResult {
    let (status, exit_code, error, failure) = match outcome {
        TaskOutcome::Ok(()) => (PhaseStatus::Succeeded, Some(0), None, None),
        TaskOutcome::Failed { code, message } => (PhaseStatus::Failed, Some(code), Some(message), None),
        TaskOutcome::TimedOut => (
            PhaseStatus::TimedOut,
            Some(-1),
            Some(format!("timed out after {}s", timeout.as_secs_f64())),
            Some(FailureKind::Timeout),
        ),
        TaskOutcome::NotFound(target) => (
            PhaseStatus::Skipped,
            None,
            Some(format!("target not found: {}", target)),
            Some(FailureKind::Missing),
        ),
    };
    PhaseResult {
        name: phase.name.clone(),
        slot: phase.slot.clone(),
        success: status == PhaseStatus::Succeeded,
        status,
        exit_code,
        error,
        failure,
        duration_ms,
    }
}
