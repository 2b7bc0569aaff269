pub const DEFAULT_CONFIG_FILE: &str = "canon-verifier.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LOGS_DIR: &str = "logs";
pub const DEFAULT_ASSET_CONFIG: &str = "config/canon_assets.json";
pub const LOG_DIR_ENV: &str = "CANON_LOG_DIR";
pub const OUTPUT_DIR_ENV: &str = "CANON_OUTPUT_DIR";

pub const SLOT_INVENTORY: &str = "inventory";
pub const SLOT_RESPONSIBILITY: &str = "service-responsibility-matrix";
pub const SLOT_DEPENDENCY_GRAPH: &str = "dependency-graph";
pub const SLOT_EVENTS: &str = "event-propagation-report";
pub const SLOT_META_CLAIM: &str = "meta-claim-validation";
pub const SLOT_HARDWARE: &str = "hardware-simulation";
pub const SLOT_PERFORMANCE: &str = "performance-sanity";
pub const SLOT_RUNTIME_MAP: &str = "runtime-truth-map";
pub const SLOT_MATRIX: &str = "service-responsibility-matrix-complete";
pub const SLOT_VERDICT: &str = "canon-verdict";

/// Slots owned by the built-in phases; all are cleared before a run.
pub const BUILTIN_SLOTS: &[&str] = &[
    SLOT_INVENTORY,
    SLOT_RESPONSIBILITY,
    SLOT_DEPENDENCY_GRAPH,
    SLOT_EVENTS,
    SLOT_META_CLAIM,
    SLOT_HARDWARE,
    SLOT_PERFORMANCE,
    SLOT_RUNTIME_MAP,
    SLOT_MATRIX,
    SLOT_VERDICT,
];

pub const TRUTH_FULLY_OPERATIONAL: &str = "Fully operational operating system";
pub const TRUTH_DEGRADED: &str = "Operational with degradations";
pub const TRUTH_PARTIAL: &str = "Partially operational architecture";
pub const TRUTH_INSUFFICIENT: &str = "Insufficient evidence for determination";

pub const DEFAULT_PHASE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_HARNESS_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_MAX_DEGRADED: usize = 2;

pub const DEFAULT_CRITICAL_LOAD: f64 = 20.0;
pub const DEFAULT_WARNING_LOAD: f64 = 10.0;
pub const DEFAULT_DEADLOCK_ZOMBIES: usize = 5;

pub const DEFAULT_MIN_ASSET_SIZE: u64 = 1024;
pub const DEFAULT_MAX_ASSET_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_ASSET_FORMATS: &[&str] = &["svg", "png"];
pub const DEFAULT_REQUIRED_ASSET_KEYS: &[&str] = &["asset_path"];
pub const DEFAULT_REQUIRED_DIRS: &[&str] = &["config"];

pub const PHASE_DIRECTORY_STRUCTURE: &str = "directory_structure";
pub const PHASE_CONFIGURATION: &str = "configuration";
pub const PHASE_ASSET: &str = "asset";
pub const PHASE_SERVICE_READINESS: &str = "service_readiness";
pub const PHASE_NESTED_RUN: &str = "canon_verifier_harness";
pub const DEFAULT_CRITICAL_PHASES: &[&str] =
    &[PHASE_ASSET, PHASE_DIRECTORY_STRUCTURE, PHASE_CONFIGURATION];

pub const DEFAULT_STRIP_PREFIXES: &[&str] = &["prod-", "production-", "staging-", "dev-"];
pub const DEFAULT_STRIP_SUFFIXES: &[&str] = &["-service", "-svc", "-container"];

pub const READINESS_TOOLS: &[&str] = &["pm2", "docker", "docker-compose"];

/// Exit code used when the harness observes SIGINT/SIGTERM.
pub const EXIT_INTERRUPTED: i32 = 130;
