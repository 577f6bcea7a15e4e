// epistemic-sandbox/src/resources.rs
// ============================================================================
// Module: Environmental Resource Pools
// Description: Reserve/consume/release budgets per resource type, exhaustion
// alerts, and QoS-ordered triage.
// Dependencies: epistemic-core, epistemic-config
// ============================================================================

//! ## Overview
//! [`ResourcePool`] tracks one [`ResourceBudget`] per [`ResourceType`],
//! supports `reserve`/`consume`/`release`, and raises [`ExhaustionAlert`]s
//! from either instantaneous utilization or a projected time-to-exhaustion
//! computed from a rolling consumption rate.

use std::collections::BTreeMap;

use epistemic_config::SandboxConfig;
use epistemic_core::BoundedHistory;
use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ResourceError;

/// One of the six resource kinds the engine tracks environmentally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// CPU-equivalent compute capacity.
    Compute,
    /// Working memory.
    Memory,
    /// Persistent storage.
    Storage,
    /// Wall-clock time allotment.
    Time,
    /// Network bandwidth.
    Bandwidth,
    /// Operator/reviewer attention, the scarcest resource of all.
    Attention,
}

impl ResourceType {
    const fn key(self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Memory => "memory",
            Self::Storage => "storage",
            Self::Time => "time",
            Self::Bandwidth => "bandwidth",
            Self::Attention => "attention",
        }
    }
}

/// Alert severity for an exhaustion warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Utilization above `alertUtilization`.
    Warning,
    /// Utilization above `highUtilization`.
    High,
    /// Utilization above `criticalUtilization`.
    Critical,
}

/// An exhaustion alert raised for one resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExhaustionAlert {
    /// The resource type this alert concerns.
    pub resource_type: ResourceType,
    /// Current `used / total`.
    pub utilization: f64,
    /// Projected seconds until `used` reaches `total` at the current
    /// consumption rate, if a rate could be computed.
    pub projected_seconds_to_exhaustion: Option<f64>,
    /// This alert's severity.
    pub severity: AlertSeverity,
}

/// A single outstanding hold against a resource budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reservation {
    resource_type: ResourceType,
    amount: f64,
}

/// Budget-plus-usage for one resource type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceBudget {
    /// The resource type this budget tracks.
    pub resource_type: ResourceType,
    /// Total allotment.
    pub total: f64,
    /// Reserved plus consumed so far.
    pub used: f64,
}

impl ResourceBudget {
    /// Current `used / total`, or `0.0` if `total` is `0.0`.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.total > 0.0 {
            self.used / self.total
        } else {
            0.0
        }
    }
}

struct Pool {
    budget: ResourceBudget,
    /// (when, delta consumed) samples, used to compute a rolling rate.
    consumption_samples: BoundedHistory<(Instant, f64)>,
}

/// Manages the budgets for every environmental resource type.
pub struct ResourcePool {
    pools: BTreeMap<&'static str, Pool>,
    reservations: BTreeMap<String, Reservation>,
}

/// Ceiling for each resource type's consumption-rate sample history.
pub const CONSUMPTION_SAMPLE_CEILING: usize = 500;

impl ResourcePool {
    /// Creates a pool with the given total for every resource type.
    #[must_use]
    pub fn new(totals: &BTreeMap<ResourceType, f64>) -> Self {
        let mut pools = BTreeMap::new();
        for resource_type in [
            ResourceType::Compute,
            ResourceType::Memory,
            ResourceType::Storage,
            ResourceType::Time,
            ResourceType::Bandwidth,
            ResourceType::Attention,
        ] {
            let total = totals.get(&resource_type).copied().unwrap_or(0.0);
            pools.insert(
                resource_type.key(),
                Pool {
                    budget: ResourceBudget { resource_type, total, used: 0.0 },
                    consumption_samples: BoundedHistory::new(CONSUMPTION_SAMPLE_CEILING),
                },
            );
        }
        Self { pools, reservations: BTreeMap::new() }
    }

    /// Reserves `amount` of `resource_type`, returning a reservation id.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if the resource type is unknown
    /// (unreachable for the fixed six-type pool), or
    /// [`ResourceError::Exhausted`] if the reservation would exceed the
    /// budget's total.
    pub fn reserve(&mut self, resource_type: ResourceType, amount: f64, services: &Services) -> Result<String, ResourceError> {
        let pool = self.pools.get_mut(resource_type.key()).ok_or_else(|| ResourceError::NotFound { resource_type: resource_type.key().to_string() })?;
        if pool.budget.used + amount > pool.budget.total {
            return Err(ResourceError::Exhausted { resource_type: resource_type.key().to_string() });
        }
        pool.budget.used += amount;
        let reservation_id = services.new_id("resv");
        self.reservations.insert(reservation_id.clone(), Reservation { resource_type, amount });
        Ok(reservation_id)
    }

    /// Finalizes a reservation as permanently consumed, recording a
    /// consumption sample used for rate projection.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ReservationNotFound`] if no such
    /// reservation exists.
    pub fn consume(&mut self, reservation_id: &str, now: Instant) -> Result<(), ResourceError> {
        let reservation = self
            .reservations
            .remove(reservation_id)
            .ok_or_else(|| ResourceError::ReservationNotFound { reservation_id: reservation_id.to_string() })?;
        if let Some(pool) = self.pools.get_mut(reservation.resource_type.key()) {
            pool.consumption_samples.push((now, reservation.amount));
        }
        Ok(())
    }

    /// Releases a reservation, returning its amount to the budget.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ReservationNotFound`] if no such
    /// reservation exists.
    pub fn release(&mut self, reservation_id: &str) -> Result<(), ResourceError> {
        let reservation = self
            .reservations
            .remove(reservation_id)
            .ok_or_else(|| ResourceError::ReservationNotFound { reservation_id: reservation_id.to_string() })?;
        if let Some(pool) = self.pools.get_mut(reservation.resource_type.key()) {
            pool.budget.used = (pool.budget.used - reservation.amount).max(0.0);
        }
        Ok(())
    }

    /// Reads the current budget for a resource type.
    #[must_use]
    pub fn budget(&self, resource_type: ResourceType) -> Option<ResourceBudget> {
        self.pools.get(resource_type.key()).map(|pool| pool.budget)
    }

    fn consumption_rate_per_second(&self, resource_type: ResourceType, now: Instant, config: &SandboxConfig) -> Option<f64> {
        let pool = self.pools.get(resource_type.key())?;
        #[allow(clippy::cast_possible_truncation, reason = "window is a small configured number of seconds, not an untrusted magnitude")]
        let window_millis = (config.consumption_rate_window_seconds * 1000.0) as i64;
        let window_start = Instant::from_millis(now.as_millis().saturating_sub(window_millis));
        let total: f64 = pool
            .consumption_samples
            .iter()
            .filter(|(when, _)| *when >= window_start)
            .map(|(_, amount)| amount)
            .sum();
        if total <= 0.0 {
            return None;
        }
        Some(total / config.consumption_rate_window_seconds)
    }

    /// Raises exhaustion alerts for every resource type currently over
    /// threshold, either by instantaneous utilization or by a projected
    /// time-to-exhaustion under the configured window.
    #[must_use]
    pub fn alerts(&self, now: Instant, config: &SandboxConfig) -> Vec<ExhaustionAlert> {
        let mut alerts = Vec::new();
        for resource_type in [
            ResourceType::Compute,
            ResourceType::Memory,
            ResourceType::Storage,
            ResourceType::Time,
            ResourceType::Bandwidth,
            ResourceType::Attention,
        ] {
            let Some(pool) = self.pools.get(resource_type.key()) else { continue };
            let utilization = pool.budget.utilization();
            let rate = self.consumption_rate_per_second(resource_type, now, config);
            let projected = rate.map(|rate_per_second| (pool.budget.total - pool.budget.used).max(0.0) / rate_per_second);

            let over_utilization = utilization > config.alert_utilization;
            let projected_soon = projected.is_some_and(|seconds| seconds < config.exhaustion_projection_seconds);
            if !over_utilization && !projected_soon {
                continue;
            }
            let severity = if utilization > config.critical_utilization {
                AlertSeverity::Critical
            } else if utilization > config.high_utilization {
                AlertSeverity::High
            } else {
                AlertSeverity::Warning
            };
            alerts.push(ExhaustionAlert {
                resource_type,
                utilization,
                projected_seconds_to_exhaustion: projected,
                severity,
            });
        }
        alerts
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
