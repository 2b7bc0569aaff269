use super::Workspace;
use crate::*;

pub fn handle_verify_commands(cli: &Cli, ws: &Workspace) -> anyhow::Result<Option<i32>> {
    let code = match &cli.command {
        Commands::Run => {
            let plan = plan_from_config(&ws.config);
            let summary = Orchestrator::new(ws.context()).run(&plan, &RunLog::console())?;
            let ok = summary.succeeded();
            print_verdict(cli.json, ok, summary, render_summary)?;
            exit_code(ok)
        }
        Commands::Gate { max_degraded } => {
            let max = max_degraded.unwrap_or(ws.config.gate.max_degraded);
            let decision = gate(&ws.store(), max);
            let ok = decision.passed;
            print_verdict(cli.json, ok, decision, render_decision)?;
            exit_code(ok)
        }
        Commands::Verdict => {
            let store = ws.store();
            store.ensure()?;
            let doc = build_verdict(&store);
            store.write(SLOT_VERDICT, "Final Verdict", &doc)?;
            print_one(cli.json, doc, |d| {
                let v = &d.verdict;
                format!(
                    "{}\n{}\nverified={} degraded={} ornamental={} blockers={}",
                    v.executive_truth,
                    v.rationale,
                    v.verified.len(),
                    v.degraded.len(),
                    v.ornamental.len(),
                    v.critical_blockers.len()
                )
            })?;
            0
        }
        Commands::Phases => {
            let items: Vec<PhasePlanItem> = plan_from_config(&ws.config)
                .iter()
                .map(|p| p.describe())
                .collect();
            print_out(cli.json, &items, |p| {
                format!("{}\t{}\t{}", p.slot, p.name, p.invocation)
            })?;
            0
        }
        _ => return Ok(None),
    };
    Ok(Some(code))
}

fn exit_code(ok: bool) -> i32 {
    if ok {
        0
    } else {
        1
    }
}

fn render_summary(s: &RunSummary) -> String {
    let mut lines = Vec::new();
    for r in &s.results {
        let mut line = format!("{:?}\t{}\t{}ms", r.status, r.name, r.duration_ms);
        if let Some(e) = &r.error {
            line.push('\t');
            line.push_str(e);
        }
        lines.push(line);
    }
    lines.push(format!(
        "succeeded={} failed={} skipped={} artifacts={} output={}",
        s.success_count,
        s.fail_count,
        s.skipped_count,
        s.artifacts.len(),
        s.output_dir
    ));
    if let Some(truth) = &s.executive_truth {
        lines.push(format!("executive truth: {}", truth));
    }
    lines.join("\n")
}

fn render_decision(d: &GateDecision) -> String {
    let mut lines = vec![
        d.message.clone(),
        format!("executive truth: {}", d.executive_truth),
        format!("rationale: {}", d.rationale),
        format!(
            "verified={} degraded={} (max {}) ornamental={} blockers={}",
            d.verified_count, d.degraded_count, d.max_degraded, d.ornamental_count, d.blocker_count
        ),
    ];
    lines.extend(d.blockers.iter().map(|b| format!("  blocker: {}", b)));
    lines.join("\n")
}
