use crate::domain::constants::*;
use crate::domain::documents::{CanonicalEvent, ChainStep, HardwareStep};
use crate::domain::models::{DependencyNode, RuntimeKind};
use crate::services::naming::{normalize_service_name, NameRules};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{path} is missing required keys: {}", .keys.join(", "))]
    MissingKeys { path: PathBuf, keys: Vec<String> },
    #[error("duplicate service name after normalization: {0} and {1}")]
    DuplicateService(String, String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub phase_secs: u64,
    pub probe_secs: u64,
    pub command_secs: u64,
    pub readiness_secs: u64,
    pub harness_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            phase_secs: DEFAULT_PHASE_TIMEOUT_SECS,
            probe_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            command_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            readiness_secs: DEFAULT_READINESS_TIMEOUT_SECS,
            harness_secs: DEFAULT_HARNESS_TIMEOUT_SECS,
        }
    }
}

impl Timeouts {
    pub fn phase(&self) -> Duration {
        Duration::from_secs(self.phase_secs)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub fn readiness(&self) -> Duration {
        Duration::from_secs(self.readiness_secs)
    }

    pub fn harness(&self) -> Duration {
        Duration::from_secs(self.harness_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub max_degraded: usize,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            max_degraded: DEFAULT_MAX_DEGRADED,
        }
    }
}

/// Extra decorations to strip when normalizing names. These extend the
/// built-in lists rather than replacing them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatrixSettings {
    pub strip_prefixes: Vec<String>,
    pub strip_suffixes: Vec<String>,
}

impl MatrixSettings {
    pub fn name_rules(&self) -> NameRules {
        let mut rules = NameRules::default();
        rules.prefixes.extend(self.strip_prefixes.iter().cloned());
        rules.suffixes.extend(self.strip_suffixes.iter().cloned());
        rules
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    pub critical_load: f64,
    pub warning_load: f64,
    pub deadlock_zombies: usize,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            critical_load: DEFAULT_CRITICAL_LOAD,
            warning_load: DEFAULT_WARNING_LOAD,
            deadlock_zombies: DEFAULT_DEADLOCK_ZOMBIES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    pub required_dirs: Vec<String>,
    pub asset_config: String,
    pub required_keys: Vec<String>,
    pub critical_phases: Vec<String>,
    pub logs_dir: String,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            required_dirs: DEFAULT_REQUIRED_DIRS.iter().map(|s| s.to_string()).collect(),
            asset_config: DEFAULT_ASSET_CONFIG.to_string(),
            required_keys: DEFAULT_REQUIRED_ASSET_KEYS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            critical_phases: DEFAULT_CRITICAL_PHASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            logs_dir: DEFAULT_LOGS_DIR.to_string(),
        }
    }
}

/// A service that claims a responsibility. Without an `endpoint` there is
/// nothing to probe and the claim stays ornamental.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceDecl {
    pub name: String,
    pub endpoint: Option<String>,
    pub responsibility: String,
    pub source_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeUnitDecl {
    pub name: String,
    pub runtime: RuntimeKind,
    pub source_path: String,
    pub interfaces: Vec<String>,
    pub responsibility: String,
}

/// A `[[phases]]` entry. Exactly one of `builtin` / `command` names the target;
/// when neither resolves the phase is skipped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhaseDecl {
    pub name: String,
    pub slot: Option<String>,
    pub builtin: Option<String>,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub timeouts: Timeouts,
    pub gate: GateSettings,
    pub matrix: MatrixSettings,
    pub performance: PerformanceSettings,
    pub harness: HarnessSettings,
    pub services: Vec<ServiceDecl>,
    pub runtime_units: Vec<RuntimeUnitDecl>,
    pub nodes: Vec<DependencyNode>,
    pub events: Vec<CanonicalEvent>,
    pub chain_steps: Vec<ChainStep>,
    pub hardware_steps: Vec<HardwareStep>,
    pub hardware_modules: Vec<String>,
    pub phases: Vec<PhaseDecl>,
}

impl VerifierConfig {
    pub fn parse(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let config: VerifierConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Declared service names must stay unique once normalized, otherwise
    /// the matrix could not keep one row per service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rules = self.matrix.name_rules();
        let mut seen: HashMap<String, &str> = HashMap::new();
        for s in &self.services {
            let key = normalize_service_name(&s.name, &rules);
            if let Some(first) = seen.insert(key, &s.name) {
                return Err(ConfigError::DuplicateService(
                    first.to_string(),
                    s.name.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Loads the verifier config. A missing file yields defaults; a file that
/// exists but does not parse is an error.
pub fn load_config(path: &Path) -> Result<VerifierConfig, ConfigError> {
    if !path.exists() {
        log::warn!(
            "config {} not found, using defaults (no declared services)",
            path.display()
        );
        return Ok(VerifierConfig::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    VerifierConfig::parse(path, &raw)
}

/// Governs the GO/NO-GO asset check.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub asset_path: String,
    pub min_size: u64,
    pub max_size: u64,
    pub allowed_formats: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            asset_path: String::new(),
            min_size: DEFAULT_MIN_ASSET_SIZE,
            max_size: DEFAULT_MAX_ASSET_SIZE,
            allowed_formats: DEFAULT_ASSET_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Reads the asset config, requiring it to exist, parse, and carry every key
/// in `required_keys`.
pub fn load_asset_config(path: &Path, required_keys: &[String]) -> Result<AssetConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let missing: Vec<String> = required_keys
        .iter()
        .filter(|k| value.get(k.as_str()).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::MissingKeys {
            path: path.to_path_buf(),
            keys: missing,
        });
    }
    serde_json::from_value(value).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_reference_defaults() {
        let c = VerifierConfig::parse(Path::new("x.toml"), "").unwrap();
        assert_eq!(c.timeouts.phase_secs, 30);
        assert_eq!(c.timeouts.probe_secs, 5);
        assert_eq!(c.timeouts.harness_secs, 120);
        assert_eq!(c.gate.max_degraded, 2);
        assert_eq!(c.harness.critical_phases.len(), 3);
        assert!(c.services.is_empty());
    }

    #[test]
    fn parses_services_units_and_nodes() {
        let raw = r#"
[gate]
max_degraded = 1

[[services]]
name = "Backend API"
endpoint = "http://localhost:3000/api/health"
responsibility = "Core API gateway"

[[runtime_units]]
name = "backend-api"
runtime = "pm2"

[[nodes]]
name = "Backend API"
depends_on = ["Database"]
critical = true
"#;
        let c = VerifierConfig::parse(Path::new("x.toml"), raw).unwrap();
        assert_eq!(c.gate.max_degraded, 1);
        assert_eq!(c.services[0].name, "Backend API");
        assert_eq!(c.runtime_units[0].runtime, RuntimeKind::Pm2);
        assert!(c.nodes[0].critical);
        assert!(c.nodes[0].consumed_by.is_empty());
    }

    #[test]
    fn rejects_services_that_collide_after_normalization() {
        let raw = r#"
[[services]]
name = "Auth Service"
[[services]]
name = "auth"
"#;
        let err = VerifierConfig::parse(Path::new("x.toml"), raw).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateService(_, _)));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = VerifierConfig::parse(Path::new("x.toml"), "[[services]\nname=").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn asset_config_requires_declared_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        std::fs::write(&path, r#"{"min_size": 10}"#).unwrap();
        let err = load_asset_config(&path, &["asset_path".to_string()]).unwrap_err();
        match err {
            ConfigError::MissingKeys { keys, .. } => assert_eq!(keys, vec!["asset_path"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn asset_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        std::fs::write(&path, r#"{"asset_path": "branding/logo.svg"}"#).unwrap();
        let cfg = load_asset_config(&path, &["asset_path".to_string()]).unwrap();
        assert_eq!(cfg.min_size, 1024);
        assert_eq!(cfg.max_size, 10 * 1024 * 1024);
        assert_eq!(cfg.allowed_formats, vec!["svg", "png"]);
    }

    #[test]
    fn asset_config_rejects_invalid_json_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        assert!(matches!(
            load_asset_config(&path, &[]),
            Err(ConfigError::NotFound(_))
        ));
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_asset_config(&path, &[]),
            Err(ConfigError::Json { .. })
        ));
    }
}
