// epistemic-config/src/lib.rs
// ============================================================================
// Crate: epistemic-config
// Description: Loads and validates ceilings, trim sizes, initial scheduler
// weights, and threshold constants from TOML.
// ============================================================================

//! Configuration is loaded from a TOML file with strict validation; every
//! field has a production default so an empty file still loads. Out-of-range
//! values fail closed at load time rather than being silently clamped.

mod config;

pub use config::CommitmentConfig;
pub use config::ConfigError;
pub use config::EngineConfig;
pub use config::ProtocolConfig;
pub use config::RuleEngineConfig;
pub use config::SandboxConfig;
pub use config::SchedulerConfig;
pub use config::StoreCeilingsConfig;
pub use config::TruthConfig;
pub use config::VerificationConfig;
