// epistemic-verify/src/pipeline.rs
// ============================================================================
// Module: Pipeline Engine
// Description: Named, ordered check pipelines and bounded run history.
// Purpose: Run every applicable pipeline against a knowledge unit and record
// a replayable trail of results.
// Dependencies: crate::checks, epistemic_core::bounded_store, epistemic_core::ids
// ============================================================================

//! ## Overview
//! A [`PipelineDefinition`] is an ordered list of [`crate::checks::CheckDefinition`]s
//! filtered to a domain. [`PipelineEngine::run_pipeline`] executes the enabled
//! checks in order and folds their outcomes into one [`RunOutcome`].
//! [`PipelineEngine::verify_ku`] runs every pipeline whose domain filter
//! matches the unit's tags.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use epistemic_core::BoundedHistory;
use epistemic_core::Direction;
use epistemic_core::EvidenceType;
use epistemic_core::Instant;
use epistemic_core::KnowledgeUnit;
use epistemic_core::Services;

use crate::checks::CheckDefinition;
use crate::checks::CheckEnv;
use crate::checks::CheckOutcome;
use crate::checks::CheckResult;
use crate::checks::run_check;
use crate::error::VerifyError;

/// Default run-history ceiling.
pub const DEFAULT_RUN_HISTORY_CEILING: usize = 5_000;

// ============================================================================
// SECTION: Pipeline Definition
// ============================================================================

/// A named, ordered sequence of checks filtered to an optional domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Unique pipeline name.
    pub name: String,
    /// Only units carrying this tag are in scope; `None` matches every unit.
    pub domain_filter: Option<String>,
    /// Checks to run, in order.
    pub checks: Vec<CheckDefinition>,
}

impl PipelineDefinition {
    fn matches(&self, ku: &KnowledgeUnit) -> bool {
        match &self.domain_filter {
            None => true,
            Some(domain) => ku.tags.contains(domain),
        }
    }
}

// ============================================================================
// SECTION: Run Outcome & Record
// ============================================================================

/// Overall result of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// No check failed or warned.
    Pass,
    /// At least one check warned, none failed.
    Warning,
    /// At least one check failed.
    Fail,
}

impl RunOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warning => "warning",
            Self::Fail => "fail",
        }
    }
}

/// One recorded pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Opaque identifier, `run_...`.
    pub id: String,
    /// Name of the pipeline that was run.
    pub pipeline_name: String,
    /// Target knowledge unit.
    pub ku_id: String,
    /// Overall outcome.
    pub outcome: RunOutcome,
    /// Per-check results, in pipeline order.
    pub check_results: Vec<CheckResult>,
    /// Instant the run completed.
    pub ran_at: Instant,
}

/// Evidence a completed run should be recorded as, left for the caller to
/// hand to an evidence store (this crate does not depend on one).
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedEvidence {
    /// Target knowledge unit.
    pub target: String,
    /// Always [`EvidenceType::TestResult`].
    pub evidence_type: EvidenceType,
    /// `supports` on pass, `refutes` on fail, `neutral` on warning.
    pub direction: Direction,
    /// `pass_count / enabled_count`.
    pub strength: f64,
    /// `{"pipeline": name, "result": "pass" | "fail" | "warning"}`.
    pub data: serde_json::Value,
    /// The pipeline's name.
    pub source: String,
}

// ============================================================================
// SECTION: Pipeline Engine
// ============================================================================

/// Holds registered pipelines and a bounded, per-KU-indexed run history.
pub struct PipelineEngine {
    pipelines: BTreeMap<String, PipelineDefinition>,
    history: BoundedHistory<PipelineRun>,
    ku_index: BTreeMap<String, Vec<String>>,
}

impl PipelineEngine {
    /// Creates a new engine with the given run-history ceiling (`0` means
    /// unbounded; see [`DEFAULT_RUN_HISTORY_CEILING`]).
    #[must_use]
    pub fn new(run_history_ceiling: usize) -> Self {
        Self {
            pipelines: BTreeMap::new(),
            history: BoundedHistory::new(run_history_ceiling),
            ku_index: BTreeMap::new(),
        }
    }

    /// Registers a new pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::DuplicatePipeline`] if the name is already
    /// registered.
    pub fn create_pipeline(&mut self, definition: PipelineDefinition) -> Result<(), VerifyError> {
        if self.pipelines.contains_key(&definition.name) {
            return Err(VerifyError::DuplicatePipeline { name: definition.name });
        }
        self.pipelines.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Lists every registered pipeline.
    pub fn list_pipelines(&self) -> impl Iterator<Item = &PipelineDefinition> {
        self.pipelines.values()
    }

    /// Runs a single named pipeline against `ku`, recording the result in
    /// history.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::PipelineNotFound`] if no such pipeline is
    /// registered, or [`VerifyError::InvalidCheckConfig`] if a check's
    /// configuration cannot be interpreted.
    pub fn run_pipeline(
        &mut self,
        name: &str,
        ku: &KnowledgeUnit,
        env: &dyn CheckEnv,
        services: &Services,
    ) -> Result<(PipelineRun, DerivedEvidence), VerifyError> {
        let pipeline = self.pipelines.get(name).ok_or_else(|| VerifyError::PipelineNotFound { name: name.to_string() })?;
        let now = services.now();

        let mut results = Vec::new();
        let mut pass_count = 0usize;
        let mut enabled_count = 0usize;
        let mut any_fail = false;
        let mut any_warning = false;
        for check in &pipeline.checks {
            if !check.enabled {
                continue;
            }
            enabled_count += 1;
            let result = run_check(check, ku, env, now)?;
            match result.outcome {
                CheckOutcome::Pass => pass_count += 1,
                CheckOutcome::Fail | CheckOutcome::Error => any_fail = true,
                CheckOutcome::Warning => any_warning = true,
                CheckOutcome::Skip => {}
            }
            results.push(result);
        }

        let outcome = if any_fail {
            RunOutcome::Fail
        } else if any_warning {
            RunOutcome::Warning
        } else {
            RunOutcome::Pass
        };

        #[allow(clippy::cast_precision_loss, reason = "check counts are small and the ratio is a display strength, not an exact value")]
        let strength = if enabled_count == 0 { 0.0 } else { pass_count as f64 / enabled_count as f64 };

        let direction = match outcome {
            RunOutcome::Pass => Direction::Supports,
            RunOutcome::Fail => Direction::Refutes,
            RunOutcome::Warning => Direction::Neutral,
        };

        let run = PipelineRun {
            id: services.new_id("run"),
            pipeline_name: name.to_string(),
            ku_id: ku.id.clone(),
            outcome,
            check_results: results,
            ran_at: now,
        };

        self.record_run(run.clone());

        let evidence = DerivedEvidence {
            target: ku.id.clone(),
            evidence_type: EvidenceType::TestResult,
            direction,
            strength,
            data: json!({ "pipeline": name, "result": outcome.as_str() }),
            source: name.to_string(),
        };

        Ok((run, evidence))
    }

    /// Runs every pipeline whose domain filter matches `ku`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidCheckConfig`] if any matching
    /// pipeline's check configuration cannot be interpreted.
    pub fn verify_ku(
        &mut self,
        ku: &KnowledgeUnit,
        env: &dyn CheckEnv,
        services: &Services,
    ) -> Result<Vec<(PipelineRun, DerivedEvidence)>, VerifyError> {
        let matching: Vec<String> =
            self.pipelines.values().filter(|pipeline| pipeline.matches(ku)).map(|pipeline| pipeline.name.clone()).collect();
        let mut out = Vec::with_capacity(matching.len());
        for name in matching {
            out.push(self.run_pipeline(&name, ku, env, services)?);
        }
        Ok(out)
    }

    /// Returns the run history for `ku_id`, oldest first.
    pub fn history_for_ku(&self, ku_id: &str) -> Vec<&PipelineRun> {
        let Some(ids) = self.ku_index.get(ku_id) else {
            return Vec::new();
        };
        let wanted: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
        self.history.iter().filter(|run| wanted.contains(run.id.as_str())).collect()
    }

    /// Returns the full run history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &PipelineRun> {
        self.history.iter()
    }

    fn record_run(&mut self, run: PipelineRun) {
        let before = self.history.len();
        self.history.push(run.clone());
        let after = self.history.len();
        if after <= before {
            // A trim happened inside `push`; the per-KU index may now point
            // at evicted runs, so rebuild it from what remains.
            self.rebuild_ku_index();
        } else {
            self.ku_index.entry(run.ku_id).or_default().push(run.id);
        }
    }

    fn rebuild_ku_index(&mut self) {
        self.ku_index.clear();
        for run in self.history.iter() {
            self.ku_index.entry(run.ku_id.clone()).or_default().push(run.id.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckDefinition;
    use crate::checks::CheckSeverity;
    use crate::checks::CheckType;
    use crate::checks::NoEdges;
    use epistemic_core::ManualClock;
    use epistemic_core::Tier;
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    fn sample_unit(services: &Services) -> KnowledgeUnit {
        let now = services.now();
        KnowledgeUnit {
            id: "ku_1".to_string(),
            title: "title".to_string(),
            body: "a well-formed body".to_string(),
            tier: Tier::Regular,
            tags: BTreeSet::from(["physics".to_string()]),
            resonance: 0.5,
            coherence: 0.5,
            stability: 0.5,
            edges: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn consistency_only(name: &str, domain_filter: Option<String>) -> PipelineDefinition {
        PipelineDefinition {
            name: name.to_string(),
            domain_filter,
            checks: vec![CheckDefinition {
                name: "consistency".to_string(),
                check_type: CheckType::Consistency,
                config: json!({}),
                severity: CheckSeverity::Error,
                enabled: true,
            }],
        }
    }

    #[test]
    fn run_pipeline_produces_supporting_evidence_on_pass() {
        let services = services();
        let unit = sample_unit(&services);
        let mut engine = PipelineEngine::new(0);
        engine.create_pipeline(consistency_only("core", None)).unwrap();
        let (run, evidence) = engine.run_pipeline("core", &unit, &NoEdges, &services).unwrap();
        assert_eq!(run.outcome, RunOutcome::Pass);
        assert_eq!(evidence.direction, Direction::Supports);
        assert!((evidence.strength - 1.0).abs() < 1e-9);
        assert_eq!(evidence.data["result"], json!("pass"));
    }

    #[test]
    fn run_pipeline_produces_refuting_evidence_on_fail() {
        let services = services();
        let mut unit = sample_unit(&services);
        unit.body = String::new();
        let mut engine = PipelineEngine::new(0);
        engine.create_pipeline(consistency_only("core", None)).unwrap();
        let (run, evidence) = engine.run_pipeline("core", &unit, &NoEdges, &services).unwrap();
        assert_eq!(run.outcome, RunOutcome::Fail);
        assert_eq!(evidence.direction, Direction::Refutes);
    }

    #[test]
    fn duplicate_pipeline_name_is_rejected() {
        let mut engine = PipelineEngine::new(0);
        engine.create_pipeline(consistency_only("core", None)).unwrap();
        let err = engine.create_pipeline(consistency_only("core", None)).unwrap_err();
        assert_eq!(err.code(), "duplicate_pipeline");
    }

    #[test]
    fn unknown_pipeline_is_not_found() {
        let services = services();
        let unit = sample_unit(&services);
        let mut engine = PipelineEngine::new(0);
        let err = engine.run_pipeline("missing", &unit, &NoEdges, &services).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn verify_ku_only_runs_matching_domain_pipelines() {
        let services = services();
        let unit = sample_unit(&services);
        let mut engine = PipelineEngine::new(0);
        engine.create_pipeline(consistency_only("physics_only", Some("physics".to_string()))).unwrap();
        engine.create_pipeline(consistency_only("chemistry_only", Some("chemistry".to_string()))).unwrap();
        let runs = engine.verify_ku(&unit, &NoEdges, &services).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].0.pipeline_name, "physics_only");
    }

    #[test]
    fn history_is_indexed_per_ku_and_trims_with_index_intact() {
        let services = services();
        let unit = sample_unit(&services);
        let mut engine = PipelineEngine::new(4);
        engine.create_pipeline(consistency_only("core", None)).unwrap();
        for _ in 0..10 {
            engine.run_pipeline("core", &unit, &NoEdges, &services).unwrap();
        }
        assert!(engine.history().count() <= 4);
        let for_ku = engine.history_for_ku(&unit.id);
        assert_eq!(for_ku.len(), engine.history().count());
    }
}
