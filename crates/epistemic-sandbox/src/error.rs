// epistemic-sandbox/src/error.rs
// ============================================================================
// Module: Sandbox Errors
// Description: Error taxonomy for sandbox budgets, memory, and permissions,
// plus the environmental resource pools.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by a [`crate::sandbox::Sandbox`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SandboxError {
    /// No sandbox exists with the given id.
    #[error("sandbox not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// `consumeBudget` was called against a non-active sandbox.
    #[error("sandbox is not active: {status}")]
    NotActive {
        /// The sandbox's current status.
        status: String,
    },
    /// `consumeBudget` would push `used` past `total`.
    #[error("budget exceeded: used {used} + cost {cost} > total {total}")]
    BudgetExceeded {
        /// Budget already consumed.
        used: f64,
        /// The cost that would have been consumed.
        cost: f64,
        /// The budget's total.
        total: f64,
    },
    /// A memory write would exceed `maxMemoryItems` for a new key.
    #[error("scoped memory is full: {max_items} items")]
    MemoryFull {
        /// The configured ceiling.
        max_items: usize,
    },
}

impl SandboxError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotActive { .. } => "not_active",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::MemoryFull { .. } => "memory_full",
        }
    }
}

/// Errors raised by [`crate::resources::ResourcePool`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No budget exists for the given resource type.
    #[error("resource budget not found: {resource_type}")]
    NotFound {
        /// The resource type that was looked up.
        resource_type: String,
    },
    /// `reserve` or `consume` would push usage past the budget's total.
    #[error("resource exhausted: {resource_type}")]
    Exhausted {
        /// The resource type that was exhausted.
        resource_type: String,
    },
    /// `release` or `consume` referenced a reservation that does not exist.
    #[error("reservation not found: {reservation_id}")]
    ReservationNotFound {
        /// The reservation id that was looked up.
        reservation_id: String,
    },
}

impl ResourceError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Exhausted { .. } => "resource_exhausted",
            Self::ReservationNotFound { .. } => "reservation_not_found",
        }
    }
}
