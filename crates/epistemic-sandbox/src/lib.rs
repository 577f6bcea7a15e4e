// epistemic-sandbox/src/lib.rs
// ============================================================================
// Crate: epistemic-sandbox
// Description: Sandboxed execution budgets, scoped memory, permissions, and
// environmental resource pools with QoS-ordered triage.
// ============================================================================

//! ## Overview
//! [`sandbox`] holds per-sandbox budgets, scoped memory, and audit trails.
//! [`resources`] holds the environment-wide resource pools those sandboxes
//! draw from.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod error;
pub mod resources;
pub mod sandbox;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ResourceError;
pub use error::SandboxError;
pub use resources::AlertSeverity;
pub use resources::ExhaustionAlert;
pub use resources::ResourceBudget;
pub use resources::ResourcePool;
pub use resources::ResourceType;
pub use resources::CONSUMPTION_SAMPLE_CEILING;
pub use sandbox::AuditEntry;
pub use sandbox::Budget;
pub use sandbox::QosPriority;
pub use sandbox::Sandbox;
pub use sandbox::SandboxKind;
pub use sandbox::SandboxStatus;
pub use sandbox::SandboxStore;
pub use sandbox::AUDIT_TRAIL_CEILING;
pub use sandbox::DEFAULT_CEILING;
