// epistemic-sandbox/src/sandbox.rs
// ============================================================================
// Module: Sandbox
// Description: Per-sandbox budget, scoped memory, permissions, and audit
// trail, plus the bounded store that holds them.
// Dependencies: epistemic-core, epistemic-config
// ============================================================================

//! ## Overview
//! A [`Sandbox`] wraps an agent or app's execution limits: a consumable
//! [`Budget`], a FIFO-bounded [`ScopedMemory`], a permission list, and a
//! bounded audit trail. [`SandboxStore`] holds every sandbox created in the
//! engine.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use epistemic_core::BoundedHistory;
use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::SandboxError;

/// Whether a sandbox was created on behalf of an agent or a standalone app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxKind {
    /// Created for an autonomous agent.
    Agent,
    /// Created for a standalone application.
    App,
}

/// Quality-of-service priority used to order triage decisions. Variants are
/// declared lowest-first so the derived [`Ord`] sorts `Background` below
/// `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QosPriority {
    /// Suspended first under pressure.
    Background,
    /// Kept only after every higher tier is satisfied.
    Normal,
    /// Kept ahead of `Normal` and `Background`.
    High,
    /// Never suspended while any capacity remains.
    Critical,
}

/// A sandbox's lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxStatus {
    /// Accepting budget consumption and memory writes.
    Active,
    /// Suspended by triage under critical resource pressure.
    Suspended,
    /// Terminated; no further mutation is accepted.
    Killed,
}

/// A consumable cost budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Budget {
    /// The total allotment.
    pub total: f64,
    /// The amount consumed so far.
    pub used: f64,
}

impl Budget {
    /// Creates a budget with nothing yet consumed.
    #[must_use]
    pub const fn new(total: f64) -> Self {
        Self { total, used: 0.0 }
    }

    /// The unconsumed remainder.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        (self.total - self.used).max(0.0)
    }
}

/// A bounded key/value scope: FIFO eviction at `maxMemoryItems`, but
/// updating a key already present never counts toward the cap.
#[derive(Debug, Clone)]
pub struct ScopedMemory {
    ceiling: usize,
    map: BTreeMap<String, Value>,
    order: VecDeque<String>,
}

impl ScopedMemory {
    /// Creates an empty scope with the given ceiling.
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            map: BTreeMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Writes `key`. A write to an existing key never evicts; a write to a
    /// new key evicts the oldest key once the ceiling is exceeded.
    pub fn write(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.map.contains_key(&key) {
            self.map.insert(key, value);
            return;
        }
        self.order.push_back(key.clone());
        self.map.insert(key, value);
        if self.ceiling > 0 && self.map.len() > self.ceiling {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
    }

    /// Reads `key`.
    #[must_use]
    pub fn read(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Number of keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the scope holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The event tag, e.g. `"budget_exceeded"`, `"killed"`.
    pub event: String,
    /// When the event occurred.
    pub recorded_at: Instant,
}

/// Ceiling for a sandbox's audit trail.
pub const AUDIT_TRAIL_CEILING: usize = 1_000;
/// Default ceiling for [`SandboxStore`] before FIFO eviction.
pub const DEFAULT_CEILING: usize = 5_000;

/// A sandboxed execution context.
pub struct Sandbox {
    id: String,
    kind: SandboxKind,
    status: SandboxStatus,
    qos: QosPriority,
    budget: Budget,
    memory: ScopedMemory,
    permissions: BTreeSet<String>,
    audit: BoundedHistory<AuditEntry>,
    started_at: Instant,
    max_execution_time_ms: u64,
}

impl epistemic_core::Indexed for Sandbox {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

impl Sandbox {
    /// Creates a new active sandbox.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "construction mirrors the wire-level createAgent/createApp payload field for field")]
    pub fn new(
        id: String,
        kind: SandboxKind,
        qos: QosPriority,
        total_budget: f64,
        max_memory_items: usize,
        max_execution_time_ms: u64,
        permissions: BTreeSet<String>,
        started_at: Instant,
    ) -> Self {
        Self {
            id,
            kind,
            status: SandboxStatus::Active,
            qos,
            budget: Budget::new(total_budget),
            memory: ScopedMemory::new(max_memory_items),
            permissions,
            audit: BoundedHistory::new(AUDIT_TRAIL_CEILING),
            started_at,
            max_execution_time_ms,
        }
    }

    /// This sandbox's id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// This sandbox's QoS priority for triage ordering.
    #[must_use]
    pub const fn qos(&self) -> QosPriority {
        self.qos
    }

    /// Whether this sandbox was created for an agent or an app.
    #[must_use]
    pub const fn kind(&self) -> SandboxKind {
        self.kind
    }

    /// This sandbox's current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SandboxStatus {
        self.status
    }

    /// This sandbox's budget.
    #[must_use]
    pub const fn budget(&self) -> Budget {
        self.budget
    }

    /// The audit trail, oldest first.
    pub fn audit_trail(&self) -> impl Iterator<Item = &AuditEntry> {
        self.audit.iter()
    }

    fn audit(&mut self, event: &str, now: Instant) {
        self.audit.push(AuditEntry {
            event: event.to_string(),
            recorded_at: now,
        });
    }

    /// Consumes `cost` from the budget.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::NotActive`] if this sandbox is not active, or
    /// [`SandboxError::BudgetExceeded`] if `used + cost` would exceed
    /// `total`.
    pub fn consume_budget(&mut self, cost: f64, now: Instant) -> Result<(), SandboxError> {
        if self.status != SandboxStatus::Active {
            return Err(SandboxError::NotActive { status: status_key(self.status).to_string() });
        }
        if self.budget.used + cost > self.budget.total {
            self.audit("budget_exceeded", now);
            return Err(SandboxError::BudgetExceeded {
                used: self.budget.used,
                cost,
                total: self.budget.total,
            });
        }
        self.budget.used += cost;
        self.audit("budget_consumed", now);
        Ok(())
    }

    /// Checks whether `permission` is granted, auditing a denial.
    pub fn check_permission(&mut self, permission: &str, now: Instant) -> bool {
        let granted = self.permissions.contains("*") || self.permissions.contains(permission);
        if !granted {
            self.audit("permission_denied", now);
        }
        granted
    }

    /// Writes a key into scoped memory.
    pub fn write_memory(&mut self, key: impl Into<String>, value: Value) {
        self.memory.write(key, value);
    }

    /// Reads a key from scoped memory.
    #[must_use]
    pub fn read_memory(&self, key: &str) -> Option<&Value> {
        self.memory.read(key)
    }

    /// Number of keys currently held in scoped memory.
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Terminates this sandbox.
    pub fn kill(&mut self, reason: &str, now: Instant) {
        self.status = SandboxStatus::Killed;
        self.audit(&format!("killed:{reason}"), now);
    }

    /// Suspends this sandbox under triage.
    pub fn suspend(&mut self, now: Instant) {
        if self.status == SandboxStatus::Active {
            self.status = SandboxStatus::Suspended;
            self.audit("suspended", now);
        }
    }

    /// Resumes a suspended sandbox.
    pub fn resume(&mut self, now: Instant) {
        if self.status == SandboxStatus::Suspended {
            self.status = SandboxStatus::Active;
            self.audit("resumed", now);
        }
    }

    /// If `now` is past `started_at + maxExecutionTimeMs`, auto-kills this
    /// sandbox and returns `true`.
    pub fn enforce_time_limit(&mut self, now: Instant) -> bool {
        if self.status == SandboxStatus::Killed {
            return false;
        }
        if now.millis_since(self.started_at) > self.max_execution_time_ms {
            self.kill("execution_time_exceeded", now);
            return true;
        }
        false
    }
}

const fn status_key(status: SandboxStatus) -> &'static str {
    match status {
        SandboxStatus::Active => "active",
        SandboxStatus::Suspended => "suspended",
        SandboxStatus::Killed => "killed",
    }
}

/// Holds every sandbox created in the engine.
pub struct SandboxStore {
    store: epistemic_core::BoundedIndexedStore<Sandbox>,
}

impl SandboxStore {
    /// Creates an empty store with the given ceiling.
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            store: epistemic_core::BoundedIndexedStore::new(ceiling),
        }
    }

    /// Creates a sandbox for an agent or an app and stores it.
    #[allow(clippy::too_many_arguments, reason = "mirrors the wire-level createAgent/createApp payload field for field")]
    pub fn create(
        &mut self,
        kind: SandboxKind,
        qos: QosPriority,
        total_budget: f64,
        max_memory_items: usize,
        max_execution_time_ms: u64,
        permissions: BTreeSet<String>,
        services: &Services,
    ) -> String {
        let prefix = match kind {
            SandboxKind::Agent => "sbx_agent",
            SandboxKind::App => "sbx_app",
        };
        let id = services.new_id(prefix);
        let sandbox = Sandbox::new(id.clone(), kind, qos, total_budget, max_memory_items, max_execution_time_ms, permissions, services.now());
        self.store.put(sandbox);
        id
    }

    /// Under resource pressure, keeps the `available` highest-QoS active
    /// sandboxes running and suspends the rest, highest priority first.
    pub fn perform_triage(&mut self, available: usize, now: Instant) -> Vec<String> {
        let mut active: Vec<(QosPriority, String)> = self.store.list().filter(|sandbox| sandbox.status() == SandboxStatus::Active).map(|sandbox| (sandbox.qos(), sandbox.id().to_string())).collect();
        active.sort_by(|a, b| b.0.cmp(&a.0));

        let mut suspended = Vec::new();
        for (_, id) in active.into_iter().skip(available) {
            if let Some(sandbox) = self.store.get_mut(&id) {
                sandbox.suspend(now);
                suspended.push(id);
            }
        }
        suspended
    }

    /// Looks up a sandbox by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Sandbox> {
        self.store.get(id)
    }

    /// Applies `f` to the sandbox with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::NotFound`] if no such sandbox exists.
    pub fn with_mut<T>(&mut self, id: &str, f: impl FnOnce(&mut Sandbox) -> T) -> Result<T, SandboxError> {
        let sandbox = self.store.get_mut(id).ok_or_else(|| SandboxError::NotFound { id: id.to_string() })?;
        Ok(f(sandbox))
    }

    /// Runs [`Sandbox::enforce_time_limit`] on every non-killed sandbox,
    /// returning the ids that were auto-killed.
    pub fn enforce_time_limits(&mut self, now: Instant) -> Vec<String> {
        let ids: Vec<String> = self.store.list().map(|sandbox| sandbox.id().to_string()).collect();
        let mut killed = Vec::new();
        for id in ids {
            if let Some(sandbox) = self.store.get_mut(&id) {
                if sandbox.enforce_time_limit(now) {
                    killed.push(id);
                }
            }
        }
        killed
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use epistemic_core::ManualClock;

    use super::*;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    #[test]
    fn consuming_past_the_budget_is_rejected_and_audited() {
        let services = services();
        let mut store = SandboxStore::new(0);
        let id = store.create(SandboxKind::Agent, QosPriority::Normal, 10.0, 100, 30_000, BTreeSet::new(), &services);

        store.with_mut(&id, |sandbox| sandbox.consume_budget(4.0, services.now())).unwrap().unwrap();
        let err = store.with_mut(&id, |sandbox| sandbox.consume_budget(7.0, services.now())).unwrap().unwrap_err();
        assert_eq!(err.code(), "budget_exceeded");

        let sandbox = store.get(&id).unwrap();
        assert!((sandbox.budget().used - 4.0).abs() < f64::EPSILON);
        assert!(sandbox.audit_trail().any(|e| e.event == "budget_exceeded"));
    }

    #[test]
    fn wildcard_permission_grants_everything() {
        let services = services();
        let mut store = SandboxStore::new(0);
        let id = store.create(SandboxKind::App, QosPriority::Normal, 10.0, 100, 30_000, BTreeSet::from(["*".to_string()]), &services);
        let granted = store.with_mut(&id, |sandbox| sandbox.check_permission("network", services.now())).unwrap();
        assert!(granted);
    }

    #[test]
    fn denied_permission_is_audited() {
        let services = services();
        let mut store = SandboxStore::new(0);
        let id = store.create(SandboxKind::App, QosPriority::Normal, 10.0, 100, 30_000, BTreeSet::new(), &services);
        let granted = store.with_mut(&id, |sandbox| sandbox.check_permission("network", services.now())).unwrap();
        assert!(!granted);
        assert!(store.get(&id).unwrap().audit_trail().any(|e| e.event == "permission_denied"));
    }

    #[test]
    fn updating_an_existing_key_never_evicts() {
        let services = services();
        let mut store = SandboxStore::new(0);
        let id = store.create(SandboxKind::Agent, QosPriority::Normal, 10.0, 2, 30_000, BTreeSet::new(), &services);
        store
            .with_mut(&id, |sandbox| {
                sandbox.write_memory("a", Value::from(1));
                sandbox.write_memory("b", Value::from(2));
                sandbox.write_memory("a", Value::from(99));
            })
            .unwrap();
        let sandbox = store.get(&id).unwrap();
        assert_eq!(sandbox.memory_len(), 2);
        assert_eq!(sandbox.read_memory("a"), Some(&Value::from(99)));
    }

    #[test]
    fn writing_past_the_memory_ceiling_evicts_the_oldest_key() {
        let services = services();
        let mut store = SandboxStore::new(0);
        let id = store.create(SandboxKind::Agent, QosPriority::Normal, 10.0, 2, 30_000, BTreeSet::new(), &services);
        store
            .with_mut(&id, |sandbox| {
                sandbox.write_memory("a", Value::from(1));
                sandbox.write_memory("b", Value::from(2));
                sandbox.write_memory("c", Value::from(3));
            })
            .unwrap();
        let sandbox = store.get(&id).unwrap();
        assert_eq!(sandbox.memory_len(), 2);
        assert!(sandbox.read_memory("a").is_none());
        assert!(sandbox.read_memory("c").is_some());
    }

    #[test]
    fn exceeding_the_execution_time_limit_auto_kills() {
        let clock = Arc::new(ManualClock::new(Instant::from_millis(0)));
        let services = Services::with_clock(clock.clone());
        let mut store = SandboxStore::new(0);
        let id = store.create(SandboxKind::Agent, QosPriority::Normal, 10.0, 100, 1_000, BTreeSet::new(), &services);

        clock.advance(1_500);
        let killed = store.enforce_time_limits(services.now());
        assert_eq!(killed, vec![id.clone()]);
        assert_eq!(store.get(&id).unwrap().status(), SandboxStatus::Killed);
    }

    #[test]
    fn triage_keeps_the_highest_priority_sandboxes_and_suspends_the_rest() {
        let services = services();
        let mut store = SandboxStore::new(0);
        let background = store.create(SandboxKind::Agent, QosPriority::Background, 10.0, 100, 30_000, BTreeSet::new(), &services);
        let critical = store.create(SandboxKind::Agent, QosPriority::Critical, 10.0, 100, 30_000, BTreeSet::new(), &services);
        let normal = store.create(SandboxKind::Agent, QosPriority::Normal, 10.0, 100, 30_000, BTreeSet::new(), &services);

        let suspended = store.perform_triage(1, services.now());
        assert_eq!(suspended.len(), 2);
        assert!(suspended.contains(&background));
        assert!(suspended.contains(&normal));
        assert_eq!(store.get(&critical).unwrap().status(), SandboxStatus::Active);
    }
}
