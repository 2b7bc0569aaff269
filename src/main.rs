use clap::Parser;

mod cli;
mod collectors;
mod commands;
mod domain;
mod services;

pub use cli::*;
pub use domain::constants::*;
pub use domain::documents::*;
pub use domain::models::*;
pub use services::config::{load_config, VerifierConfig};
pub use services::gatekeeper::gate;
pub use services::harness::{resolve_log_dir, run_harness, HarnessOptions};
pub use services::interrupt::{install_handlers, interrupted};
pub use services::orchestrator::{Orchestrator, PhaseContext};
pub use services::output::{print_one, print_out, print_verdict};
pub use services::phases::{build_verdict, plan_from_config};
pub use services::runlog::RunLog;
pub use services::storage::EvidenceStore;

use commands::{handle_harness_commands, handle_verify_commands, Workspace};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let code = match dispatch(&cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: &Cli) -> anyhow::Result<i32> {
    let ws = Workspace::load(cli)?;
    if let Some(code) = handle_harness_commands(cli, &ws)? {
        return Ok(code);
    }
    if let Some(code) = handle_verify_commands(cli, &ws)? {
        return Ok(code);
    }
    anyhow::bail!("unhandled command")
}
