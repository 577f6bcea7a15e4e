// epistemic-config/src/config.rs
// ============================================================================
// Module: Engine Configuration
// Description: Configuration loading and validation for the coordination
// engine.
// Purpose: Provide strict, fail-closed config parsing with sane production
// defaults for every ceiling, threshold, and initial weight.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with a strict size limit. An
//! absent or empty file is not an error: every field falls back to its
//! production default. Values are validated once at load time and never
//! silently clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "epistemic.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "EPISTEMIC_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Store Ceilings
// ============================================================================

/// Per-store size ceilings; `0` means unbounded. Every downstream store
/// evicts its oldest record (or trims to half on history overflow) above
/// these limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreCeilingsConfig {
    /// Knowledge store ceiling.
    pub knowledge: usize,
    /// Evidence store ceiling.
    pub evidence: usize,
    /// Outcome store ceiling.
    pub outcome: usize,
    /// Skill store ceiling.
    pub skill: usize,
    /// Project store ceiling.
    pub project: usize,
    /// Protocol store ceiling.
    pub protocol: usize,
    /// Interlock store ceiling.
    pub interlock: usize,
    /// Commitment store ceiling.
    pub commitment: usize,
    /// Verification pipeline run-history ceiling.
    pub verification_run_history: usize,
    /// Weight-update audit history ceiling (trimmed to half on overflow).
    pub weight_update_history: usize,
    /// Per-sandbox audit trail ceiling.
    pub sandbox_audit: usize,
}

impl Default for StoreCeilingsConfig {
    fn default() -> Self {
        Self {
            knowledge: 100_000,
            evidence: 250_000,
            outcome: 100_000,
            skill: 20_000,
            project: 5_000,
            protocol: 5_000,
            interlock: 5_000,
            commitment: 20_000,
            verification_run_history: 5_000,
            weight_update_history: 100,
            sandbox_audit: 2_000,
        }
    }
}

impl StoreCeilingsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.weight_update_history != 0 && self.weight_update_history < 2 {
            return Err(ConfigError::Invalid(
                "store_ceilings.weight_update_history must be at least 2 when bounded".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Scheduler priority weights and weight-learning thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Initial priority signal weights, each in `[-0.5, 0.5]`.
    pub initial_weights: BTreeMap<String, f64>,
    /// Minimum recent outcomes required before `runWeightLearning` adjusts
    /// anything.
    pub min_samples: usize,
    /// Maximum per-run magnitude of a single weight adjustment.
    pub max_adjustment: f64,
    /// Minimum outcomes before an affinity recommendation is offered.
    pub affinity_min_samples: usize,
    /// Minimum success rate for `assign` to prefer the learned role over the
    /// work item's default role.
    pub affinity_min_rate: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let mut initial_weights = BTreeMap::new();
        initial_weights.insert("impact".to_string(), 0.0);
        initial_weights.insert("risk".to_string(), 0.0);
        initial_weights.insert("urgency".to_string(), 0.0);
        initial_weights.insert("confidence".to_string(), 0.0);
        Self {
            initial_weights,
            min_samples: 20,
            max_adjustment: 0.1,
            affinity_min_samples: 10,
            affinity_min_rate: 0.6,
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (signal, weight) in &self.initial_weights {
            if !(-0.5..=0.5).contains(weight) {
                return Err(ConfigError::Invalid(format!(
                    "scheduler.initial_weights.{signal} must be within [-0.5, 0.5]"
                )));
            }
        }
        if self.max_adjustment <= 0.0 {
            return Err(ConfigError::Invalid("scheduler.max_adjustment must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.affinity_min_rate) {
            return Err(ConfigError::Invalid("scheduler.affinity_min_rate must be within [0, 1]".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Default ranges and minimums used by the built-in check types.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Minimum citation markers a `citation` check requires.
    pub citation_min_count: usize,
    /// Maximum age, in milliseconds, a `freshness` check tolerates.
    pub freshness_max_age_ms: u64,
    /// Minimum supporting cross-reference edges a `cross_reference` check
    /// expects before warning.
    pub cross_reference_min_count: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            citation_min_count: 1,
            freshness_max_age_ms: 90 * 24 * 60 * 60 * 1000,
            cross_reference_min_count: 1,
        }
    }
}

impl VerificationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.freshness_max_age_ms == 0 {
            return Err(ConfigError::Invalid("verification.freshness_max_age_ms must be positive".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Truth Lifecycle
// ============================================================================

/// Stagnation detection threshold.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TruthConfig {
    /// Default idle threshold, in milliseconds, passed to
    /// `detectStagnation` when the caller does not override it.
    pub stagnation_threshold_ms: u64,
}

impl Default for TruthConfig {
    fn default() -> Self {
        Self {
            stagnation_threshold_ms: 7 * 24 * 60 * 60 * 1000,
        }
    }
}

impl TruthConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.stagnation_threshold_ms == 0 {
            return Err(ConfigError::Invalid("truth.stagnation_threshold_ms must be positive".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Protocol
// ============================================================================

/// Coordination protocol limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Maximum participants admitted to a single protocol.
    pub max_participants: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self { max_participants: 50 }
    }
}

impl ProtocolConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_participants == 0 {
            return Err(ConfigError::Invalid("protocol.max_participants must be positive".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Commitment
// ============================================================================

/// Accountability attribution weighting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommitmentConfig {
    /// Weight applied to an actor's received edge weight when computing
    /// total attribution (direct + `received_weight` * received).
    pub received_weight: f64,
}

impl Default for CommitmentConfig {
    fn default() -> Self {
        Self { received_weight: 0.3 }
    }
}

impl CommitmentConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.received_weight) {
            return Err(ConfigError::Invalid("commitment.received_weight must be within [0, 1]".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Rule Engine
// ============================================================================

/// Vote-threshold ratios for amendable rule tiers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleEngineConfig {
    /// Minimum `for / (for + against)` ratio required to amend a
    /// constitutional-tier rule.
    pub constitutional_supermajority: f64,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            constitutional_supermajority: 2.0 / 3.0,
        }
    }
}

impl RuleEngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.5..=1.0).contains(&self.constitutional_supermajority) {
            return Err(ConfigError::Invalid(
                "rule_engine.constitutional_supermajority must be within [0.5, 1.0]".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Sandbox & Resources
// ============================================================================

/// Sandbox scoped-memory bound and resource-pool alert thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum scoped-memory keys a single sandbox may hold.
    pub max_memory_items: usize,
    /// Default execution time budget, in milliseconds, before
    /// `enforceTimeLimit` auto-kills a sandbox.
    pub default_max_execution_time_ms: u64,
    /// Utilization above which an exhaustion alert is raised.
    pub alert_utilization: f64,
    /// Utilization above which an alert is `high` severity.
    pub high_utilization: f64,
    /// Utilization above which an alert is `critical` severity.
    pub critical_utilization: f64,
    /// Projected seconds-until-exhaustion below which an alert is raised
    /// even under the utilization threshold.
    pub exhaustion_projection_seconds: f64,
    /// Window, in seconds, used to compute the consumption rate for
    /// exhaustion projection.
    pub consumption_rate_window_seconds: f64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_memory_items: 1_000,
            default_max_execution_time_ms: 30_000,
            alert_utilization: 0.8,
            high_utilization: 0.9,
            critical_utilization: 0.95,
            exhaustion_projection_seconds: 300.0,
            consumption_rate_window_seconds: 60.0,
        }
    }
}

impl SandboxConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_memory_items == 0 {
            return Err(ConfigError::Invalid("sandbox.max_memory_items must be positive".to_string()));
        }
        if !(self.alert_utilization < self.high_utilization && self.high_utilization < self.critical_utilization) {
            return Err(ConfigError::Invalid(
                "sandbox utilization thresholds must satisfy alert < high < critical".to_string(),
            ));
        }
        if self.critical_utilization > 1.0 {
            return Err(ConfigError::Invalid("sandbox.critical_utilization must not exceed 1.0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Engine Configuration
// ============================================================================

/// Top-level configuration for the coordination engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-store size ceilings.
    pub store_ceilings: StoreCeilingsConfig,
    /// Scheduler weights and learning thresholds.
    pub scheduler: SchedulerConfig,
    /// Verification check defaults.
    pub verification: VerificationConfig,
    /// Truth lifecycle stagnation threshold.
    pub truth: TruthConfig,
    /// Coordination protocol limits.
    pub protocol: ProtocolConfig,
    /// Commitment accountability weighting.
    pub commitment: CommitmentConfig,
    /// Constitutional rule engine vote thresholds.
    pub rule_engine: RuleEngineConfig,
    /// Sandbox and resource pool thresholds.
    pub sandbox: SandboxConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_ceilings: StoreCeilingsConfig::default(),
            scheduler: SchedulerConfig::default(),
            verification: VerificationConfig::default(),
            truth: TruthConfig::default(),
            protocol: ProtocolConfig::default(),
            commitment: CommitmentConfig::default(),
            rule_engine: RuleEngineConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from disk using the default resolution rules: an
    /// explicit `path`, then the `EPISTEMIC_CONFIG` environment variable,
    /// then `epistemic.toml` in the working directory.
    ///
    /// A missing default file is treated as an empty document (every field
    /// falls back to its default); a missing explicit `path` is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, oversized,
    /// malformed, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let explicit = path.is_some() || env::var(CONFIG_ENV_VAR).is_ok();
        let content = match fs::read(&resolved) {
            Ok(bytes) => {
                if bytes.len() > MAX_CONFIG_FILE_SIZE {
                    return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
                }
                String::from_utf8(bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?
            }
            Err(err) if explicit => return Err(ConfigError::Io(err.to_string())),
            Err(_) => String::new(),
        };
        let config: Self = toml::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every sub-configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first invalid field
    /// encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store_ceilings.validate()?;
        self.scheduler.validate()?;
        self.verification.validate()?;
        self.truth.validate()?;
        self.protocol.validate()?;
        self.commitment.validate()?;
        self.rule_engine.validate()?;
        self.sandbox.validate()?;
        Ok(())
    }
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_internally_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.toml");
        let config = EngineConfig::load(Some(&missing));
        assert!(matches!(config, Err(ConfigError::Io(_))));
    }

    #[test]
    fn loads_partial_overrides_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler]\nmin_samples = 42\n").unwrap();
        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.scheduler.min_samples, 42);
        assert_eq!(config.protocol.max_participants, 50);
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler.initial_weights]\nimpact = 0.9\n").unwrap();
        let err = EngineConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_oversized_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let padding = "# ".to_string() + &"x".repeat(MAX_CONFIG_FILE_SIZE + 1);
        writeln!(file, "{padding}").unwrap();
        let err = EngineConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_utilization_ordering() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sandbox]\nalert_utilization = 0.9\nhigh_utilization = 0.8\n").unwrap();
        let err = EngineConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
