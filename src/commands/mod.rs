//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `verify.rs`: run/gate/verdict/phases.
//! - `harness.rs`: go-no-go.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Handlers return the process exit code; `main` owns `exit`.

pub mod harness;
pub mod verify;

pub use harness::handle_harness_commands;
pub use verify::handle_verify_commands;

use crate::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Paths and config shared by every command, resolved once.
pub struct Workspace {
    pub config: Arc<VerifierConfig>,
    pub root: PathBuf,
    pub output: PathBuf,
}

impl Workspace {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = load_config(&absolute(&cwd, &cli.config))?;
        Ok(Self {
            config: Arc::new(config),
            root: absolute(&cwd, &cli.root),
            // External phases run with cwd = root, so the evidence directory
            // must not stay relative to ours.
            output: absolute(&cwd, &cli.output),
        })
    }

    pub fn store(&self) -> EvidenceStore {
        EvidenceStore::new(&self.output)
    }

    pub fn context(&self) -> PhaseContext {
        PhaseContext::new(self.config.clone(), self.store(), self.root.clone())
    }

    /// Resolves a configured path against the repository root.
    pub fn under_root(&self, p: &Path) -> PathBuf {
        absolute(&self.root, p)
    }
}

fn absolute(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
