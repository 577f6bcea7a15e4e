// epistemic-engine/src/context.rs
// ============================================================================
// Module: Engine Context
// Description: The composition root wiring every domain store behind one
// shared clock/id generator and one shared configuration.
// Dependencies: every other workspace crate
// ============================================================================

//! ## Overview
//! [`EngineContext`] owns one instance of each domain store, constructed
//! from a single [`EngineConfig`]. It holds no dispatch logic of its own;
//! [`crate::registry`] borrows it mutably per operation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use epistemic_config::EngineConfig;
use epistemic_constitution::RuleEngine;
use epistemic_coordination::AccountabilityGraph;
use epistemic_coordination::CommitmentStore;
use epistemic_coordination::InterlockStore;
use epistemic_coordination::ProtocolStore;
use epistemic_coordination::RollbackStore;
use epistemic_core::EvidenceStore;
use epistemic_core::KnowledgeStore;
use epistemic_core::Services;
use epistemic_core::TruthLifecycle;
use epistemic_projects::ProjectStore;
use epistemic_sandbox::ResourcePool;
use epistemic_sandbox::SandboxStore;
use epistemic_scheduler::OutcomeStore;
use epistemic_scheduler::Scheduler;
use epistemic_scheduler::WeightLearner;
use epistemic_skills::SkillStore;
use epistemic_verify::PipelineEngine;

/// One instance of every domain store, built from a single [`EngineConfig`].
pub struct EngineContext {
    /// Shared id generator and clock.
    pub services: Services,
    /// The configuration this context was built from.
    pub config: EngineConfig,
    /// Knowledge units.
    pub knowledge: KnowledgeStore,
    /// Evidence attached to knowledge units.
    pub evidence: EvidenceStore,
    /// Per-unit truth lifecycle state.
    pub truth: TruthLifecycle,
    /// Verification pipelines and run history.
    pub verification: PipelineEngine,
    /// Priority scheduler.
    pub scheduler: Scheduler,
    /// Outcome records and derived role affinity.
    pub outcomes: OutcomeStore,
    /// Per-signal weight learner.
    pub weight_learner: WeightLearner,
    /// Reasoning templates, playbooks, and test bundles.
    pub skills: SkillStore,
    /// Project DAGs.
    pub projects: ProjectStore,
    /// Multi-actor coordination protocols.
    pub protocols: ProtocolStore,
    /// Mutual-exclusion and admission-control interlocks.
    pub interlocks: InterlockStore,
    /// Tracked commitments.
    pub commitments: CommitmentStore,
    /// Attribution graph over accountability edges.
    pub accountability: AccountabilityGraph,
    /// Coordinated multi-actor rollbacks.
    pub rollbacks: RollbackStore,
    /// Constitutional rule engine.
    pub rules: RuleEngine,
    /// Sandboxed execution budgets.
    pub sandboxes: SandboxStore,
    /// Environmental resource pools.
    pub resources: ResourcePool,
}

impl EngineContext {
    /// Builds a fresh context from `config`, using the system clock.
    #[must_use]
    pub fn new(config: EngineConfig, known_work_types: BTreeSet<String>) -> Self {
        Self::with_services(config, known_work_types, Services::system())
    }

    /// Builds a fresh context from `config` against an explicit services
    /// handle, for deterministic tests (a [`epistemic_core::ManualClock`]
    /// wrapped in [`Services::with_clock`]).
    #[must_use]
    pub fn with_services(config: EngineConfig, known_work_types: BTreeSet<String>, services: Services) -> Self {
        let ceilings = &config.store_ceilings;
        let rules = RuleEngine::new(epistemic_constitution::DEFAULT_CEILING, &services);
        let resource_totals = BTreeMap::new();
        Self {
            knowledge: KnowledgeStore::new(ceilings.knowledge),
            evidence: EvidenceStore::new(ceilings.evidence),
            truth: TruthLifecycle::new(),
            verification: PipelineEngine::new(ceilings.verification_run_history),
            scheduler: Scheduler::new(known_work_types, config.scheduler.initial_weights.clone()),
            outcomes: OutcomeStore::new(ceilings.outcome),
            weight_learner: WeightLearner::new(config.scheduler.initial_weights.clone()),
            skills: SkillStore::new(ceilings.skill),
            projects: ProjectStore::new(ceilings.project),
            protocols: ProtocolStore::new(ceilings.protocol),
            interlocks: InterlockStore::new(ceilings.interlock),
            commitments: CommitmentStore::new(ceilings.commitment),
            accountability: AccountabilityGraph::new(),
            rollbacks: RollbackStore::new(ceilings.protocol),
            rules,
            sandboxes: SandboxStore::new(0),
            resources: ResourcePool::new(&resource_totals),
            services,
            config,
        }
    }
}
