use crate::domain::models::{
    Blocker, CanonStatus, DegradedEntry, ExecutiveTruth, Issue, OrnamentalEntry, ServiceRecord,
    Severity, Verdict, VerifiedEntry,
};

/// Maps merged records plus externally detected issues to one verdict.
///
/// Pure: no I/O, no clock. Rules apply in order and the first match wins:
/// blockers, then degradations, then verified evidence, else insufficient.
/// `unresolved_matches` is left empty for the caller to attach.
pub fn classify(records: &[ServiceRecord], issues: &[Issue]) -> Verdict {
    let mut verified = Vec::new();
    let mut degraded = Vec::new();
    let mut ornamental = Vec::new();
    let mut critical_blockers = Vec::new();

    for r in records {
        match r.canon_status {
            CanonStatus::Verified => verified.push(VerifiedEntry {
                name: r.name.clone(),
                responsibility: r.claimed_responsibility.clone(),
                evidence: r.observed_status.clone(),
            }),
            CanonStatus::Degraded => degraded.push(DegradedEntry {
                name: r.name.clone(),
                issue: r.observed_status.clone(),
            }),
            CanonStatus::Blocked => critical_blockers.push(Blocker {
                service: Some(r.name.clone()),
                kind: None,
                issue: r.observed_status.clone(),
                severity: Severity::Critical,
            }),
            CanonStatus::Ornamental => ornamental.push(OrnamentalEntry {
                name: r.name.clone(),
                responsibility: r.claimed_responsibility.clone(),
            }),
        }
    }
    for issue in issues.iter().filter(|i| i.severity == Severity::Critical) {
        critical_blockers.push(Blocker {
            service: None,
            kind: Some(issue.kind.clone()),
            issue: issue.message.clone(),
            severity: Severity::Critical,
        });
    }

    let ornamental_only = !records.is_empty() && ornamental.len() == records.len();
    // Ornamental claims carry no proof either way, so they stay out of the
    // verified ratio and are named in the rationale instead.
    let total = verified.len() + degraded.len();

    let (executive_truth, rationale) = if !critical_blockers.is_empty() {
        (
            ExecutiveTruth::PartiallyOperational,
            format!(
                "{} critical blocker(s) prevent full operation",
                critical_blockers.len()
            ),
        )
    } else if !degraded.is_empty() {
        (
            ExecutiveTruth::OperationalWithDegradations,
            format!("{} service(s) show degraded behavior", degraded.len()),
        )
    } else if !verified.is_empty() && total > 0 {
        let pct = verified.len() as f64 * 100.0 / total as f64;
        let mut rationale = format!("{}/{} services verified ({:.0}%)", verified.len(), total, pct);
        if !ornamental.is_empty() {
            rationale.push_str(&format!(
                "; {} ornamental claim(s) without a probe target",
                ornamental.len()
            ));
        }
        (ExecutiveTruth::FullyOperational, rationale)
    } else if ornamental_only {
        (
            ExecutiveTruth::InsufficientEvidence,
            format!(
                "all {} service claim(s) are ornamental: no probe target declared",
                ornamental.len()
            ),
        )
    } else {
        (
            ExecutiveTruth::InsufficientEvidence,
            "Limited service verification capability in current environment".to_string(),
        )
    };

    Verdict {
        executive_truth,
        rationale,
        verified,
        degraded,
        ornamental,
        critical_blockers,
        unresolved_matches: Vec::new(),
        ornamental_only,
    }
}
