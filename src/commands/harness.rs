use super::Workspace;
use crate::*;
use std::path::Path;

pub fn handle_harness_commands(cli: &Cli, ws: &Workspace) -> anyhow::Result<Option<i32>> {
    let Commands::GoNoGo {
        asset_config,
        logs_dir,
    } = &cli.command
    else {
        return Ok(None);
    };

    let settings = &ws.config.harness;
    let asset_config = asset_config
        .clone()
        .unwrap_or_else(|| settings.asset_config.clone().into());
    let logs_base = logs_dir
        .clone()
        .unwrap_or_else(|| settings.logs_dir.clone().into());
    let opts = HarnessOptions {
        config: ws.config.clone(),
        root: ws.root.clone(),
        output_dir: ws.output.clone(),
        asset_config: ws.under_root(&asset_config),
        log_dir: resolve_log_dir(&ws.under_root(&logs_base)),
    };

    install_handlers();
    let report = run_harness(&opts, &interrupted)?;
    let go = report.overall_status == GoStatus::Go;
    let code = if report.interrupted {
        EXIT_INTERRUPTED
    } else if go {
        0
    } else {
        1
    };
    print_verdict(cli.json, go, report, |r| render(r, &opts.log_dir))?;
    Ok(Some(code))
}

fn render(r: &GoNoGoReport, log_dir: &Path) -> String {
    let mut lines: Vec<String> = r
        .phases
        .iter()
        .map(|p| format!("{:?}\t{}", p.status, p.name))
        .collect();
    lines.push(format!(
        "passed={} failed={} warnings={} of {}",
        r.passed, r.failed, r.warnings, r.total_phases
    ));
    lines.push(format!(
        "{}: {}",
        match r.overall_status {
            GoStatus::Go => "GO",
            GoStatus::NoGo => "NO-GO",
        },
        r.message
    ));
    lines.push(format!("logs: {}", log_dir.display()));
    lines.join("\n")
}
