use crate::domain::documents::{MatrixAnalysis, RuntimeMapping};
use crate::domain::models::{
    CanonStatus, FailureKind, ProofKind, RuntimeBinding, ServiceRecord, UnresolvedMatch,
};
use crate::services::naming::{names_overlap, normalize_service_name, NameRules};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// Index of the single matching record.
    Exact(usize),
    Ambiguous(Vec<String>),
    NoMatch,
}

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub records: Vec<ServiceRecord>,
    pub enriched: usize,
    pub inserted: usize,
    pub ambiguous: Vec<UnresolvedMatch>,
    pub unobserved: Vec<String>,
}

/// Finds the record a runtime unit belongs to.
///
/// An equal normalized name wins outright. Otherwise a substring match in
/// either direction is accepted only when it is unique.
pub fn find_match(unit: &str, records: &[ServiceRecord], rules: &NameRules) -> MatchResult {
    let key = normalize_service_name(unit, rules);
    if key.is_empty() {
        return MatchResult::NoMatch;
    }
    let names: Vec<String> = records
        .iter()
        .map(|r| normalize_service_name(&r.name, rules))
        .collect();

    let equal: Vec<usize> = (0..names.len()).filter(|&i| names[i] == key).collect();
    if equal.len() == 1 {
        return MatchResult::Exact(equal[0]);
    }

    let fuzzy: Vec<usize> = (0..names.len())
        .filter(|&i| names_overlap(&names[i], &key))
        .collect();
    match fuzzy.len() {
        0 => MatchResult::NoMatch,
        1 => MatchResult::Exact(fuzzy[0]),
        _ => MatchResult::Ambiguous(fuzzy.iter().map(|&i| records[i].name.clone()).collect()),
    }
}

fn binding_for(m: &RuntimeMapping) -> RuntimeBinding {
    RuntimeBinding {
        runtime: m.runtime,
        unit: m.unit.clone(),
        active: m.observed_activity,
        interfaces: m.interfaces.clone(),
    }
}

/// Adds `unit` to the record's bindings. A unit already bound is refreshed in
/// place, so re-merging the same units leaves the row unchanged.
fn bind(record: &mut ServiceRecord, unit: &RuntimeMapping) {
    let binding = binding_for(unit);
    match record
        .runtime_bindings
        .iter_mut()
        .find(|b| b.runtime == binding.runtime && b.unit == binding.unit)
    {
        Some(existing) => *existing = binding,
        None => {
            if !record.runtime_bindings.is_empty() {
                log::warn!(
                    "{} is bound to {} runtime units",
                    record.name,
                    record.runtime_bindings.len() + 1
                );
            }
            record.runtime_bindings.push(binding);
        }
    }
}

/// A runtime-only row is verified only while every bound unit is active.
fn settle_runtime_status(record: &mut ServiceRecord) {
    let active = record
        .runtime_bindings
        .iter()
        .all(|b| b.active == Some(true));
    record.observed_status = if active { "running" } else { "not_found" }.to_string();
    record.canon_status = if active {
        CanonStatus::Verified
    } else {
        CanonStatus::Blocked
    };
}

/// Merges runtime units into probe records.
///
/// Units are matched against the incoming records only, never against rows
/// this merge inserted. Probe verdicts are never overwritten: a matched record
/// only gains a runtime binding. Unmatched units with known activity become
/// `runtime_enumeration` rows, one per normalized name. Merging the same units
/// twice leaves the table unchanged.
pub fn merge(records: Vec<ServiceRecord>, units: &[RuntimeMapping], rules: &NameRules) -> MergeReport {
    let primary = records.len();
    let mut report = MergeReport {
        records,
        ..MergeReport::default()
    };

    for unit in units {
        match find_match(&unit.unit, &report.records[..primary], rules) {
            MatchResult::Exact(i) => {
                bind(&mut report.records[i], unit);
                report.enriched += 1;
            }
            MatchResult::Ambiguous(candidates) => {
                log::warn!(
                    "{} unit {} matches {} records, needs manual reconciliation",
                    unit.runtime,
                    unit.unit,
                    candidates.len()
                );
                report.ambiguous.push(UnresolvedMatch {
                    unit: unit.unit.clone(),
                    runtime: unit.runtime,
                    candidates,
                    failure: FailureKind::AmbiguousMatch,
                });
            }
            MatchResult::NoMatch => {
                if unit.observed_activity.is_none() {
                    report.unobserved.push(unit.unit.clone());
                    continue;
                }
                let key = normalize_service_name(&unit.unit, rules);
                if let Some(row) = report.records[primary..]
                    .iter_mut()
                    .find(|r| normalize_service_name(&r.name, rules) == key)
                {
                    bind(row, unit);
                    settle_runtime_status(row);
                    report.enriched += 1;
                    continue;
                }
                let mut row = ServiceRecord {
                    name: unit.unit.clone(),
                    claimed_responsibility: unit.declared_responsibility.clone(),
                    source_reference: unit.repo_path.clone(),
                    proof_kind: ProofKind::RuntimeEnumeration,
                    endpoint: unit.interfaces.first().cloned(),
                    ..ServiceRecord::default()
                };
                bind(&mut row, unit);
                settle_runtime_status(&mut row);
                report.records.push(row);
                report.inserted += 1;
            }
        }
    }
    report
}

pub fn analyze(report: &MergeReport) -> MatrixAnalysis {
    let records = &report.records;
    let count = |s: CanonStatus| records.iter().filter(|r| r.canon_status == s).count();
    MatrixAnalysis {
        total_services: records.len(),
        verified: count(CanonStatus::Verified),
        degraded: count(CanonStatus::Degraded),
        blocked: count(CanonStatus::Blocked),
        ornamental: count(CanonStatus::Ornamental),
        services_with_evidence: records
            .iter()
            .filter(|r| r.proof_kind == ProofKind::Probe && r.endpoint.is_some())
            .count(),
        services_with_runtime: records
            .iter()
            .filter(|r| !r.runtime_bindings.is_empty())
            .count(),
        multi_unit_services: records
            .iter()
            .filter(|r| r.runtime_bindings.len() > 1)
            .count(),
        ambiguous_matches: report.ambiguous.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RuntimeKind;

    fn probe(name: &str, status: CanonStatus) -> ServiceRecord {
        ServiceRecord {
            name: name.to_string(),
            claimed_responsibility: format!("{} duties", name),
            endpoint: Some(format!("http://localhost/{}", name)),
            canon_status: status,
            ..ServiceRecord::default()
        }
    }

    fn unit(name: &str, runtime: RuntimeKind, active: Option<bool>) -> RuntimeMapping {
        RuntimeMapping {
            unit: name.to_string(),
            runtime,
            repo_path: format!("services/{}", name),
            interfaces: vec!["http://localhost:9000".to_string()],
            declared_responsibility: "declared".to_string(),
            observed_activity: active,
            canon_status: String::new(),
        }
    }

    #[test]
    fn equal_name_beats_fuzzy_candidates() {
        let r = NameRules::default();
        let records = vec![
            probe("Backend", CanonStatus::Verified),
            probe("Backend API", CanonStatus::Verified),
        ];
        assert_eq!(find_match("backend-service", &records, &r), MatchResult::Exact(0));
        assert_eq!(find_match("prod-backend-api", &records, &r), MatchResult::Exact(1));
    }

    #[test]
    fn several_fuzzy_candidates_are_ambiguous() {
        let r = NameRules::default();
        let records = vec![
            probe("Backend API", CanonStatus::Verified),
            probe("Backend Worker", CanonStatus::Verified),
        ];
        match find_match("backend", &records, &r) {
            MatchResult::Ambiguous(c) => assert_eq!(c, vec!["Backend API", "Backend Worker"]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(find_match("billing", &records, &r), MatchResult::NoMatch);
    }

    #[test]
    fn exact_match_enriches_without_touching_status() {
        let r = NameRules::default();
        let report = merge(
            vec![probe("Auth Service", CanonStatus::Degraded)],
            &[unit("auth", RuntimeKind::Pm2, Some(true))],
            &r,
        );
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.enriched, 1);
        let rec = &report.records[0];
        assert_eq!(rec.canon_status, CanonStatus::Degraded);
        assert_eq!(rec.runtime_bindings.len(), 1);
        let b = &rec.runtime_bindings[0];
        assert_eq!(b.runtime, RuntimeKind::Pm2);
        assert_eq!(b.active, Some(true));
    }

    #[test]
    fn unmatched_units_are_inserted_by_activity() {
        let r = NameRules::default();
        let report = merge(
            vec![],
            &[
                unit("streaming", RuntimeKind::Docker, Some(true)),
                unit("mailer", RuntimeKind::Docker, Some(false)),
                unit("ghost", RuntimeKind::Pm2, None),
            ],
            &r,
        );
        assert_eq!(report.inserted, 2);
        assert_eq!(report.records[0].canon_status, CanonStatus::Verified);
        assert_eq!(report.records[0].proof_kind, ProofKind::RuntimeEnumeration);
        assert_eq!(report.records[0].observed_status, "running");
        assert_eq!(report.records[1].canon_status, CanonStatus::Blocked);
        assert_eq!(report.records[1].observed_status, "not_found");
        assert_eq!(report.unobserved, vec!["ghost"]);
    }

    #[test]
    fn ambiguity_is_reported_not_resolved() {
        let r = NameRules::default();
        let records = vec![
            probe("Backend API", CanonStatus::Verified),
            probe("Backend Worker", CanonStatus::Blocked),
        ];
        let report = merge(
            records.clone(),
            &[unit("backend", RuntimeKind::Docker, Some(true))],
            &r,
        );
        assert_eq!(report.records, records);
        assert_eq!(report.ambiguous.len(), 1);
        assert_eq!(report.ambiguous[0].failure, FailureKind::AmbiguousMatch);
        assert_eq!(analyze(&report).ambiguous_matches, 1);
    }

    #[test]
    fn merging_twice_does_not_duplicate() {
        let r = NameRules::default();
        let units = vec![
            unit("auth", RuntimeKind::Pm2, Some(true)),
            unit("streaming", RuntimeKind::Docker, Some(true)),
            unit("mailer", RuntimeKind::Docker, Some(false)),
        ];
        let once = merge(vec![probe("Auth", CanonStatus::Verified)], &units, &r);
        let twice = merge(once.records.clone(), &units, &r);
        assert_eq!(once.records.len(), 3);
        assert_eq!(twice.records, once.records);
        assert_eq!(twice.inserted, 0);
    }

    #[test]
    fn analysis_counts_categories() {
        let r = NameRules::default();
        let report = merge(
            vec![
                probe("alpha", CanonStatus::Verified),
                probe("bravo", CanonStatus::Degraded),
                ServiceRecord {
                    name: "charlie".to_string(),
                    ..ServiceRecord::default()
                },
            ],
            &[unit("zulu", RuntimeKind::Docker, Some(false))],
            &r,
        );
        let a = analyze(&report);
        assert_eq!(a.total_services, 4);
        assert_eq!((a.verified, a.degraded, a.blocked, a.ornamental), (1, 1, 1, 1));
        assert_eq!(a.services_with_evidence, 2);
        assert_eq!(a.services_with_runtime, 1);
    }

    #[test]
    fn overlapping_unmatched_units_keep_separate_rows() {
        let r = NameRules::default();
        let report = merge(
            vec![],
            &[
                unit("backend", RuntimeKind::Docker, Some(true)),
                unit("backend-worker", RuntimeKind::Docker, Some(false)),
            ],
            &r,
        );
        assert_eq!(report.inserted, 2);
        assert_eq!(report.enriched, 0);
        let rows: Vec<_> = report
            .records
            .iter()
            .map(|r| (r.name.as_str(), r.canon_status))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("backend", CanonStatus::Verified),
                ("backend-worker", CanonStatus::Blocked)
            ]
        );
        let v = crate::services::verdict::classify(&report.records, &[]);
        assert_eq!(v.critical_blockers.len(), 1);

        let units = [
            unit("backend", RuntimeKind::Docker, Some(true)),
            unit("backend-worker", RuntimeKind::Docker, Some(false)),
        ];
        let again = merge(report.records.clone(), &units, &r);
        assert_eq!(again.records, report.records);
    }

    #[test]
    fn units_sharing_a_row_are_all_recorded() {
        let r = NameRules::default();
        let report = merge(
            vec![probe("Auth", CanonStatus::Verified)],
            &[
                unit("auth", RuntimeKind::Pm2, Some(true)),
                unit("prod-auth-service", RuntimeKind::Docker, Some(false)),
            ],
            &r,
        );
        assert_eq!(report.records.len(), 1);
        let rec = &report.records[0];
        assert_eq!(rec.canon_status, CanonStatus::Verified);
        let bound: Vec<_> = rec
            .runtime_bindings
            .iter()
            .map(|b| (b.unit.as_str(), b.active))
            .collect();
        assert_eq!(bound, vec![("auth", Some(true)), ("prod-auth-service", Some(false))]);
        assert_eq!(analyze(&report).multi_unit_services, 1);
    }

    #[test]
    fn runtime_only_row_blocks_when_any_unit_is_down() {
        let r = NameRules::default();
        let report = merge(
            vec![],
            &[
                unit("prod-mailer", RuntimeKind::Docker, Some(true)),
                unit("mailer", RuntimeKind::Pm2, Some(false)),
            ],
            &r,
        );
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.records[0].runtime_bindings.len(), 2);
        assert_eq!(report.records[0].canon_status, CanonStatus::Blocked);
        assert_eq!(report.records[0].observed_status, "not_found");
    }
}
