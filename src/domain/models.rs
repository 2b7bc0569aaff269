use crate::domain::constants::{
    TRUTH_DEGRADED, TRUTH_FULLY_OPERATIONAL, TRUTH_INSUFFICIENT, TRUTH_PARTIAL,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// User-visible failure taxonomy. Every failure surfaced by a report carries
/// one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Missing,
    Mismatch,
    Timeout,
    DeadLink,
    AmbiguousMatch,
    InsufficientEvidence,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Missing => "MISSING",
            FailureKind::Mismatch => "MISMATCH",
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::DeadLink => "DEAD_LINK",
            FailureKind::AmbiguousMatch => "AMBIGUOUS_MATCH",
            FailureKind::InsufficientEvidence => "INSUFFICIENT_EVIDENCE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonStatus {
    Verified,
    Degraded,
    Blocked,
    /// A responsibility claim with nothing to prove it against.
    #[default]
    Ornamental,
}

impl CanonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonStatus::Verified => "VERIFIED",
            CanonStatus::Degraded => "DEGRADED",
            CanonStatus::Blocked => "BLOCKED",
            CanonStatus::Ornamental => "ORNAMENTAL",
        }
    }
}

impl fmt::Display for CanonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    #[default]
    Probe,
    RuntimeEnumeration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Docker,
    Pm2,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::Docker => f.write_str("docker"),
            RuntimeKind::Pm2 => f.write_str("pm2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeBinding {
    pub runtime: RuntimeKind,
    pub unit: String,
    /// `None` when no inventory evidence was available.
    pub active: Option<bool>,
    pub interfaces: Vec<String>,
}

/// One row of the service responsibility matrix.
///
/// `canon_status` is only ever assigned from observed evidence: a probe
/// outcome or a runtime enumeration. A row read back without a status
/// defaults to `ORNAMENTAL`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceRecord {
    pub name: String,
    pub claimed_responsibility: String,
    pub source_reference: String,
    pub proof_kind: ProofKind,
    pub observed_status: String,
    pub canon_status: CanonStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Every runtime unit matched to this row, one entry per `(runtime, unit)`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub runtime_bindings: Vec<RuntimeBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Warning,
}

/// An externally detected condition, e.g. resource exhaustion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyNode {
    pub name: String,
    pub depends_on: Vec<String>,
    pub consumed_by: Vec<String>,
    pub interfaces: Vec<String>,
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyEdge {
    pub from_service: String,
    pub to_service: String,
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadLink {
    pub service: String,
    pub missing_dependency: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphAnalysis {
    pub total_services: usize,
    pub total_edges: usize,
    pub edges: Vec<DependencyEdge>,
    pub dead_links: Vec<DeadLink>,
    pub critical_services: Vec<String>,
}

/// A runtime unit that fuzzy-matched more than one matrix row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedMatch {
    pub unit: String,
    pub runtime: RuntimeKind,
    pub candidates: Vec<String>,
    pub failure: FailureKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutiveTruth {
    #[serde(rename = "Fully operational operating system")]
    FullyOperational,
    #[serde(rename = "Operational with degradations")]
    OperationalWithDegradations,
    #[serde(rename = "Partially operational architecture")]
    PartiallyOperational,
    #[serde(rename = "Insufficient evidence for determination")]
    InsufficientEvidence,
}

impl ExecutiveTruth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutiveTruth::FullyOperational => TRUTH_FULLY_OPERATIONAL,
            ExecutiveTruth::OperationalWithDegradations => TRUTH_DEGRADED,
            ExecutiveTruth::PartiallyOperational => TRUTH_PARTIAL,
            ExecutiveTruth::InsufficientEvidence => TRUTH_INSUFFICIENT,
        }
    }
}

impl fmt::Display for ExecutiveTruth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEntry {
    pub name: String,
    pub responsibility: String,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedEntry {
    pub name: String,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrnamentalEntry {
    pub name: String,
    pub responsibility: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blocker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub issue: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub executive_truth: ExecutiveTruth,
    pub rationale: String,
    pub verified: Vec<VerifiedEntry>,
    pub degraded: Vec<DegradedEntry>,
    pub ornamental: Vec<OrnamentalEntry>,
    pub critical_blockers: Vec<Blocker>,
    pub unresolved_matches: Vec<UnresolvedMatch>,
    /// Set when every record is ORNAMENTAL: nothing failed, nothing was proven.
    pub ornamental_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    Succeeded,
    Failed,
    TimedOut,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub name: String,
    pub slot: String,
    pub status: PhaseStatus,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub file: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: String,
    pub output_dir: String,
    pub results: Vec<PhaseResult>,
    pub success_count: usize,
    pub fail_count: usize,
    pub skipped_count: usize,
    pub artifacts: Vec<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive_truth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.fail_count == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhasePlanItem {
    pub name: String,
    pub slot: String,
    pub invocation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateDecision {
    pub passed: bool,
    pub message: String,
    pub executive_truth: String,
    pub rationale: String,
    pub verified_count: usize,
    pub degraded_count: usize,
    pub ornamental_count: usize,
    pub blocker_count: usize,
    /// One `<service or type>: <issue>` line per critical blocker.
    pub blockers: Vec<String>,
    pub max_degraded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warning,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub name: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoStatus {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "NO-GO")]
    NoGo,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoNoGoReport {
    pub timestamp: String,
    pub log_dir: String,
    pub phases: Vec<CheckItem>,
    pub total_phases: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub overall_status: GoStatus,
    pub verdict: String,
    pub message: String,
    pub interrupted: bool,
}
