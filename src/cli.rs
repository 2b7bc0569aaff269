use crate::domain::constants::{DEFAULT_CONFIG_FILE, DEFAULT_OUTPUT_DIR};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "canon-verifier",
    version,
    about = "Evidence-based verification of a running deployment"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_CONFIG_FILE,
        help = "Verifier configuration (TOML); missing file means defaults"
    )]
    pub config: PathBuf,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Evidence directory, one JSON document per slot"
    )]
    pub output: PathBuf,
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Repository root; relative paths and external phases resolve here"
    )]
    pub root: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every configured phase and write evidence
    Run,
    /// CI gatekeeper over the stored verdict
    Gate {
        #[arg(long, help = "Degraded services tolerated (defaults to [gate] max_degraded)")]
        max_degraded: Option<usize>,
    },
    /// Launch readiness checks ending in GO or NO-GO
    GoNoGo {
        #[arg(long, help = "Asset configuration JSON (defaults to [harness] asset_config)")]
        asset_config: Option<PathBuf>,
        #[arg(long, help = "Base directory for run logs (defaults to [harness] logs_dir)")]
        logs_dir: Option<PathBuf>,
    },
    /// Classify current evidence and store the verdict
    Verdict,
    /// List the configured phase plan
    Phases,
}
