//! Evidence payload schemas, one per slot.
//!
//! Default policy: every struct here is `#[serde(default)]`. A missing list is
//! empty, a missing count is zero, a missing string is empty, a missing
//! optional is `None`. Fields nobody reads are ignored on input.

use crate::domain::models::{
    CanonStatus, DependencyNode, GraphAnalysis, Issue, RuntimeKind, ServiceRecord, Severity,
    UnresolvedMatch, Verdict,
};
use serde::{Deserialize, Serialize};

/// Envelope written into every slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct EvidenceDocument<T> {
    pub phase_name: String,
    pub timestamp: String,
    pub payload: T,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub ports: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pm2Process {
    pub name: String,
    pub pm_id: i64,
    pub status: String,
    pub pid: i64,
    pub cpu: f64,
    pub memory: u64,
    pub cwd: String,
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListeningPort {
    pub port: String,
    pub address: String,
    pub protocol: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemLoad {
    pub load_1min: f64,
    pub load_5min: f64,
    pub load_15min: f64,
    /// `normal`, `warning`, `critical`, or `unknown` when load could not be read.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    pub raw: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryDoc {
    pub docker_containers: Vec<DockerContainer>,
    pub pm2_processes: Vec<Pm2Process>,
    pub listening_ports: Vec<ListeningPort>,
    pub system_load: SystemLoad,
    pub total_runtime_units: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsibilityDoc {
    pub services_tested: Vec<ServiceRecord>,
    pub verified_count: usize,
    pub degraded_count: usize,
    pub blocked_count: usize,
    pub ornamental_count: usize,
}

impl ResponsibilityDoc {
    pub fn from_records(services_tested: Vec<ServiceRecord>) -> Self {
        let count = |s: CanonStatus| services_tested.iter().filter(|r| r.canon_status == s).count();
        Self {
            verified_count: count(CanonStatus::Verified),
            degraded_count: count(CanonStatus::Degraded),
            blocked_count: count(CanonStatus::Blocked),
            ornamental_count: count(CanonStatus::Ornamental),
            services_tested,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDoc {
    pub dependency_graph: Vec<DependencyNode>,
    pub analysis: GraphAnalysis,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalEvent {
    pub name: String,
    pub source: String,
    pub consumers: Vec<String>,
    pub critical: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFlow {
    pub event: String,
    pub source: String,
    pub consumers: Vec<String>,
    pub consumer_count: usize,
    pub critical: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventIssue {
    pub event: String,
    pub issue: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventAnalysis {
    pub total_events: usize,
    pub critical_events: usize,
    pub event_flows: Vec<EventFlow>,
    pub potential_issues: Vec<EventIssue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDoc {
    pub canonical_events: Vec<CanonicalEvent>,
    pub analysis: EventAnalysis,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainStep {
    pub step: u32,
    pub name: String,
    pub component: String,
    pub endpoint: String,
    pub validates: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainAnalysis {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub missing_components: Vec<String>,
    pub chain_integrity: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaClaimDoc {
    pub chain_definition: Vec<ChainStep>,
    pub analysis: ChainAnalysis,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareStep {
    pub step: u32,
    pub name: String,
    pub component: String,
    pub logic: String,
    pub requires_human: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleEntry {
    pub path: String,
    pub exists: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesCheck {
    pub total_checked: usize,
    pub found: usize,
    pub modules: Vec<ModuleEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareDoc {
    pub hardware_workflow: Vec<HardwareStep>,
    pub modules_check: ModulesCheck,
    pub logic_completeness: String,
    pub human_interpretation_required: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessHealth {
    pub top_cpu_consumers: Vec<String>,
    pub top_memory_consumers: Vec<String>,
    pub zombie_processes: usize,
    pub deadlock_detected: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceDoc {
    pub system_load: SystemLoad,
    pub process_health: ProcessHealth,
    pub issues_detected: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeMapping {
    pub unit: String,
    pub runtime: RuntimeKind,
    pub repo_path: String,
    pub interfaces: Vec<String>,
    pub declared_responsibility: String,
    /// `None` when the inventory slot was absent.
    pub observed_activity: Option<bool>,
    /// `verified`, `not_running` or `unobserved`.
    pub canon_status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeMapDoc {
    pub docker_mappings: Vec<RuntimeMapping>,
    pub pm2_mappings: Vec<RuntimeMapping>,
    pub total_mappings: usize,
    pub verified_count: usize,
    pub not_running_count: usize,
    pub unobserved_count: usize,
}

impl RuntimeMapDoc {
    pub fn all_mappings(&self) -> Vec<RuntimeMapping> {
        self.docker_mappings
            .iter()
            .chain(self.pm2_mappings.iter())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixAnalysis {
    pub total_services: usize,
    pub verified: usize,
    pub degraded: usize,
    pub blocked: usize,
    pub ornamental: usize,
    pub services_with_evidence: usize,
    pub services_with_runtime: usize,
    /// Rows bound to more than one runtime unit.
    pub multi_unit_services: usize,
    pub ambiguous_matches: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixDoc {
    pub service_responsibility_matrix: Vec<ServiceRecord>,
    pub ambiguous: Vec<UnresolvedMatch>,
    pub unobserved: Vec<String>,
    pub analysis: MatrixAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerdictDoc {
    pub verdict: Verdict,
    pub phase_results_analyzed: Vec<String>,
}

/// Tolerant read-side view of the verdict slot, used by the gatekeeper.
///
/// The gatekeeper matches on the executive truth text rather than the enum so
/// that a verdict written by an older or foreign producer still gates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerdictView {
    pub verdict: VerdictViewInner,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerdictViewInner {
    pub executive_truth: String,
    pub rationale: String,
    #[serde(alias = "verified_systems")]
    pub verified: Vec<serde_json::Value>,
    #[serde(alias = "degraded_systems")]
    pub degraded: Vec<serde_json::Value>,
    #[serde(alias = "ornamental_systems")]
    pub ornamental: Vec<serde_json::Value>,
    pub critical_blockers: Vec<serde_json::Value>,
    pub unresolved_matches: Vec<serde_json::Value>,
}

impl Default for VerdictViewInner {
    fn default() -> Self {
        Self {
            executive_truth: "Unknown".to_string(),
            rationale: String::new(),
            verified: Vec::new(),
            degraded: Vec::new(),
            ornamental: Vec::new(),
            critical_blockers: Vec::new(),
            unresolved_matches: Vec::new(),
        }
    }
}
