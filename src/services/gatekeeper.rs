use crate::domain::constants::SLOT_VERDICT;
use crate::domain::documents::VerdictView;
use crate::domain::models::{FailureKind, GateDecision};
use crate::services::storage::EvidenceStore;

fn blocker_line(b: &serde_json::Value) -> String {
    let who = b
        .get("service")
        .or_else(|| b.get("type"))
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown");
    let issue = b
        .get("issue")
        .or_else(|| b.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown");
    format!("{}: {}", who, issue)
}

/// Gate rules over a verdict. `None` means the verdict slot was absent.
pub fn evaluate(view: Option<&VerdictView>, max_degraded: usize) -> GateDecision {
    let Some(view) = view else {
        return GateDecision {
            passed: false,
            message: "CI FAIL: Canon verdict not found. Run canon-verifier before the gate."
                .to_string(),
            executive_truth: "Unknown".to_string(),
            rationale: String::new(),
            verified_count: 0,
            degraded_count: 0,
            ornamental_count: 0,
            blocker_count: 0,
            blockers: vec![],
            max_degraded,
            failure: Some(FailureKind::Missing),
        };
    };
    let v = &view.verdict;
    let truth = v.executive_truth.as_str();
    let degraded = v.degraded.len();
    let blockers = v.critical_blockers.len();

    let (passed, message, failure) = if truth.contains("Fully operational") {
        (
            true,
            "CI PASS: Canon integrity verified - fully operational".to_string(),
            None,
        )
    } else if truth.contains("Operational with degradations") {
        if degraded <= max_degraded {
            (
                true,
                format!(
                    "CI PASS: Canon integrity verified with {} minor degradation(s)",
                    degraded
                ),
                None,
            )
        } else {
            (
                false,
                format!(
                    "CI FAIL: Too many degradations ({}) - threshold {} exceeded",
                    degraded, max_degraded
                ),
                Some(FailureKind::Mismatch),
            )
        }
    } else if truth.contains("Partially operational") {
        (
            false,
            format!("CI FAIL: Canon truth broken - {} critical blocker(s)", blockers),
            Some(FailureKind::Mismatch),
        )
    } else {
        (
            false,
            format!("CI FAIL: Cannot determine operational status - {}", truth),
            Some(FailureKind::InsufficientEvidence),
        )
    };

    GateDecision {
        passed,
        message,
        executive_truth: truth.to_string(),
        rationale: v.rationale.clone(),
        verified_count: v.verified.len(),
        degraded_count: degraded,
        ornamental_count: v.ornamental.len(),
        blocker_count: blockers,
        blockers: v.critical_blockers.iter().map(blocker_line).collect(),
        max_degraded,
        failure,
    }
}

pub fn gate(store: &EvidenceStore, max_degraded: usize) -> GateDecision {
    let view = store.read_payload::<VerdictView>(SLOT_VERDICT);
    if view.is_none() {
        log::error!("verdict slot {} missing in {}", SLOT_VERDICT, store.dir().display());
    }
    evaluate(view.as_ref(), max_degraded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(truth: &str, degraded: usize) -> VerdictView {
        let degraded: Vec<_> = (0..degraded)
            .map(|i| json!({"name": format!("svc-{}", i), "issue": "HTTP 503"}))
            .collect();
        serde_json::from_value(json!({
            "verdict": {
                "executive_truth": truth,
                "rationale": "r",
                "degraded": degraded,
                "critical_blockers": [{"type": "high_load", "message": "load 30"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn degradation_threshold_is_inclusive() {
        let truth = "Operational with degradations";
        assert!(evaluate(Some(&view(truth, 2)), 2).passed);
        let d = evaluate(Some(&view(truth, 3)), 2);
        assert!(!d.passed);
        assert_eq!(d.failure, Some(FailureKind::Mismatch));
    }

    #[test]
    fn fully_operational_passes() {
        let d = evaluate(Some(&view("Fully operational operating system", 0)), 2);
        assert!(d.passed);
        assert!(d.failure.is_none());
    }

    #[test]
    fn partial_and_unknown_fail() {
        let d = evaluate(Some(&view("Partially operational architecture", 0)), 2);
        assert!(!d.passed);
        assert_eq!(d.blockers, vec!["high_load: load 30"]);
        let d = evaluate(Some(&view("Insufficient evidence for determination", 0)), 2);
        assert!(!d.passed);
        assert_eq!(d.failure, Some(FailureKind::InsufficientEvidence));
    }

    #[test]
    fn legacy_field_names_are_read() {
        let v: VerdictView = serde_json::from_value(json!({
            "verdict": {
                "executive_truth": "Operational with degradations",
                "degraded_systems": [{"name": "a"}, {"name": "b"}, {"name": "c"}]
            }
        }))
        .unwrap();
        assert!(!evaluate(Some(&v), 2).passed);
    }

    #[test]
    fn missing_verdict_fails_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let d = gate(&EvidenceStore::new(dir.path()), 2);
        assert!(!d.passed);
        assert_eq!(d.failure, Some(FailureKind::Missing));
    }
}
