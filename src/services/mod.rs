//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `config.rs`: verifier config and asset config loading.
//! - `storage.rs`: evidence store, one JSON document per slot.
//! - `runlog.rs`: timestamped run log mirrored to `log`.
//! - `task.rs`: bounded commands and worker closures.
//! - `orchestrator.rs`: sequential phase runner.
//! - `phases.rs`: built-in evidence phases and plan assembly.
//! - `naming.rs` / `matrix.rs`: name normalization and matrix merging.
//! - `graph.rs`: dependency graph and dead links.
//! - `verdict.rs`: executive truth classification.
//! - `gatekeeper.rs`: CI pass/fail over a stored verdict.
//! - `harness.rs`: GO/NO-GO launch checks.
//! - `interrupt.rs`: SIGINT/SIGTERM flag.
//! - `output.rs`: JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod config;
pub mod gatekeeper;
pub mod graph;
pub mod harness;
pub mod interrupt;
pub mod matrix;
pub mod naming;
pub mod orchestrator;
pub mod output;
pub mod phases;
pub mod runlog;
pub mod storage;
pub mod task;
pub mod verdict;
