// epistemic-verify/src/checks.rs
// ============================================================================
// Module: Check Types
// Description: The fixed set of pure check functions a pipeline can run
// against a knowledge unit.
// Purpose: Each check is `(ku, env) -> {outcome, message, details}`, free of
// side effects, so pipeline runs are deterministic and replayable.
// Dependencies: epistemic_core::knowledge, serde, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use epistemic_core::EdgeType;
use epistemic_core::Instant;
use epistemic_core::KnowledgeUnit;

use crate::error::VerifyError;

// ============================================================================
// SECTION: Fixed Enumerations
// ============================================================================

/// One of the built-in check implementations a [`CheckDefinition`] selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    /// Quality fields in range, title/body non-empty as required by tier.
    Consistency,
    /// Declared required fields are present.
    Schema,
    /// No `contradicts` edge touches the unit.
    ContradictionScan,
    /// Body/metadata carry at least a minimum number of citation markers.
    Citation,
    /// Declared fields are non-empty (after trimming strings).
    Completeness,
    /// Declared numeric fields fall within configured bounds.
    Range,
    /// The unit was updated recently enough.
    Freshness,
    /// The unit has enough supporting cross-reference edges.
    CrossReference,
}

/// Severity a [`CheckDefinition`] is configured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    /// Informational only.
    Info,
    /// Worth surfacing but not blocking.
    Warning,
    /// Blocking.
    Error,
}

/// Outcome of running a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The check's condition held.
    Pass,
    /// The check's condition did not hold.
    Fail,
    /// The check raised a concern without failing the run.
    Warning,
    /// The check did not apply and was not run.
    Skip,
    /// The check could not be evaluated (bad config).
    Error,
}

// ============================================================================
// SECTION: Check Definition & Result
// ============================================================================

/// One check within a [`crate::pipeline::PipelineDefinition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDefinition {
    /// Check name, unique within its pipeline.
    pub name: String,
    /// Which built-in implementation to run.
    pub check_type: CheckType,
    /// Check-specific configuration, shape depends on `check_type`.
    #[serde(default)]
    pub config: Value,
    /// Severity this check is configured at.
    pub severity: CheckSeverity,
    /// Whether the check is currently active.
    pub enabled: bool,
}

/// Result of running one [`CheckDefinition`] against a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check that produced this result.
    pub check_name: String,
    /// What happened.
    pub outcome: CheckOutcome,
    /// Human-readable explanation.
    pub message: String,
    /// Structured detail payload.
    pub details: Value,
}

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Read-only access to cross-unit state a check may need (edge queries).
pub trait CheckEnv {
    /// Number of `contradicts` edges with either endpoint at `ku_id`.
    fn contradiction_count(&self, ku_id: &str) -> usize;
    /// Number of `supports` edges arriving at `ku_id`.
    fn incoming_support_count(&self, ku_id: &str) -> usize;
}

// ============================================================================
// SECTION: Per-type Config
// ============================================================================

#[derive(Debug, Deserialize)]
struct SchemaConfig {
    required_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CompletenessConfig {
    fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FieldRange {
    field: String,
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct RangeConfig {
    #[serde(default = "default_quality_ranges")]
    fields: Vec<FieldRange>,
}

fn default_quality_ranges() -> Vec<FieldRange> {
    ["resonance", "coherence", "stability"]
        .into_iter()
        .map(|field| FieldRange {
            field: field.to_string(),
            min: 0.0,
            max: 1.0,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct CitationConfig {
    #[serde(default = "default_citation_min_count")]
    min_count: usize,
}

const fn default_citation_min_count() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct FreshnessConfig {
    max_age_ms: u64,
}

#[derive(Debug, Deserialize)]
struct CrossReferenceConfig {
    #[serde(default = "default_cross_reference_min_count")]
    min_count: usize,
}

const fn default_cross_reference_min_count() -> usize {
    1
}

fn numeric_field(ku: &KnowledgeUnit, field: &str) -> Option<f64> {
    match field {
        "resonance" => Some(ku.resonance),
        "coherence" => Some(ku.coherence),
        "stability" => Some(ku.stability),
        _ => None,
    }
}

fn text_field_non_empty(ku: &KnowledgeUnit, field: &str) -> Option<bool> {
    match field {
        "title" => Some(!ku.title.trim().is_empty()),
        "body" => Some(!ku.body.trim().is_empty()),
        "tags" => Some(!ku.tags.is_empty()),
        _ => None,
    }
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// Runs a single check against `ku`.
///
/// # Errors
///
/// Returns [`VerifyError::InvalidCheckConfig`] only for configuration that
/// cannot be interpreted; a condition that is merely unmet produces a
/// [`CheckOutcome::Fail`] or [`CheckOutcome::Warning`] result, not an error.
pub fn run_check(
    def: &CheckDefinition,
    ku: &KnowledgeUnit,
    env: &dyn CheckEnv,
    now: Instant,
) -> Result<CheckResult, VerifyError> {
    let outcome_of = |outcome: CheckOutcome, message: String, details: Value| CheckResult {
        check_name: def.name.clone(),
        outcome,
        message,
        details,
    };

    match def.check_type {
        CheckType::Consistency => {
            for field in ["resonance", "coherence", "stability"] {
                let value = numeric_field(ku, field).unwrap_or(0.0);
                if !(0.0..=1.0).contains(&value) {
                    return Ok(outcome_of(
                        CheckOutcome::Fail,
                        format!("{field} is outside [0, 1]"),
                        json!({ "field": field, "value": value }),
                    ));
                }
            }
            if ku.title.trim().is_empty() {
                return Ok(outcome_of(CheckOutcome::Fail, "title is empty".to_string(), json!({})));
            }
            if ku.tier != epistemic_core::Tier::Shadow && ku.body.trim().is_empty() {
                return Ok(outcome_of(
                    CheckOutcome::Fail,
                    "body is empty for a non-shadow tier".to_string(),
                    json!({}),
                ));
            }
            Ok(outcome_of(CheckOutcome::Pass, "consistent".to_string(), json!({})))
        }

        CheckType::Schema => {
            let config: SchemaConfig = serde_json::from_value(def.config.clone()).map_err(|err| {
                VerifyError::InvalidCheckConfig { check: def.name.clone(), reason: err.to_string() }
            })?;
            let missing: Vec<&str> = config
                .required_fields
                .iter()
                .filter(|field| text_field_non_empty(ku, field) != Some(true))
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                Ok(outcome_of(CheckOutcome::Pass, "all required fields present".to_string(), json!({})))
            } else {
                Ok(outcome_of(
                    CheckOutcome::Fail,
                    format!("missing required fields: {}", missing.join(", ")),
                    json!({ "missing": missing }),
                ))
            }
        }

        CheckType::Completeness => {
            let config: CompletenessConfig = serde_json::from_value(def.config.clone()).map_err(|err| {
                VerifyError::InvalidCheckConfig { check: def.name.clone(), reason: err.to_string() }
            })?;
            let empty: Vec<&str> = config
                .fields
                .iter()
                .filter(|field| text_field_non_empty(ku, field) != Some(true))
                .map(String::as_str)
                .collect();
            if empty.is_empty() {
                Ok(outcome_of(CheckOutcome::Pass, "all fields complete".to_string(), json!({})))
            } else {
                Ok(outcome_of(
                    CheckOutcome::Fail,
                    format!("empty fields: {}", empty.join(", ")),
                    json!({ "empty": empty }),
                ))
            }
        }

        CheckType::Range => {
            let config: RangeConfig = if def.config.is_null() {
                RangeConfig { fields: default_quality_ranges() }
            } else {
                serde_json::from_value(def.config.clone()).map_err(|err| VerifyError::InvalidCheckConfig {
                    check: def.name.clone(),
                    reason: err.to_string(),
                })?
            };
            for range in &config.fields {
                let Some(value) = numeric_field(ku, &range.field) else {
                    continue;
                };
                if value < range.min || value > range.max {
                    return Ok(outcome_of(
                        CheckOutcome::Fail,
                        format!("{} is outside [{}, {}]", range.field, range.min, range.max),
                        json!({ "field": range.field, "value": value, "min": range.min, "max": range.max }),
                    ));
                }
            }
            Ok(outcome_of(CheckOutcome::Pass, "all fields within range".to_string(), json!({})))
        }

        CheckType::Citation => {
            let config: CitationConfig = if def.config.is_null() {
                CitationConfig { min_count: default_citation_min_count() }
            } else {
                serde_json::from_value(def.config.clone()).map_err(|err| VerifyError::InvalidCheckConfig {
                    check: def.name.clone(),
                    reason: err.to_string(),
                })?
            };
            let count = count_citation_markers(&ku.body);
            if count >= config.min_count {
                Ok(outcome_of(CheckOutcome::Pass, format!("{count} citation markers found"), json!({ "count": count })))
            } else {
                Ok(outcome_of(
                    CheckOutcome::Warning,
                    format!("only {count} citation markers found, expected at least {}", config.min_count),
                    json!({ "count": count, "min_count": config.min_count }),
                ))
            }
        }

        CheckType::Freshness => {
            let config: FreshnessConfig = serde_json::from_value(def.config.clone()).map_err(|err| {
                VerifyError::InvalidCheckConfig { check: def.name.clone(), reason: err.to_string() }
            })?;
            let age = now.millis_since(ku.updated_at);
            if age <= config.max_age_ms {
                Ok(outcome_of(CheckOutcome::Pass, "within freshness window".to_string(), json!({ "age_ms": age })))
            } else {
                Ok(outcome_of(
                    CheckOutcome::Warning,
                    format!("stale by {} ms", age - config.max_age_ms),
                    json!({ "age_ms": age, "max_age_ms": config.max_age_ms }),
                ))
            }
        }

        CheckType::ContradictionScan => {
            let count = env.contradiction_count(&ku.id);
            if count == 0 {
                Ok(outcome_of(CheckOutcome::Pass, "no contradictions".to_string(), json!({})))
            } else {
                Ok(outcome_of(
                    CheckOutcome::Fail,
                    format!("{count} contradicting edges found"),
                    json!({ "count": count }),
                ))
            }
        }

        CheckType::CrossReference => {
            let config: CrossReferenceConfig = if def.config.is_null() {
                CrossReferenceConfig { min_count: default_cross_reference_min_count() }
            } else {
                serde_json::from_value(def.config.clone()).map_err(|err| VerifyError::InvalidCheckConfig {
                    check: def.name.clone(),
                    reason: err.to_string(),
                })?
            };
            let count = env.incoming_support_count(&ku.id);
            if count >= config.min_count {
                Ok(outcome_of(CheckOutcome::Pass, format!("{count} supporting cross-references"), json!({ "count": count })))
            } else {
                Ok(outcome_of(
                    CheckOutcome::Warning,
                    format!("only {count} supporting cross-references, expected at least {}", config.min_count),
                    json!({ "count": count, "min_count": config.min_count }),
                ))
            }
        }
    }
}

/// Counts URL-like substrings and bracketed citation markers in `body`.
fn count_citation_markers(body: &str) -> usize {
    let url_count = body.matches("http://").count() + body.matches("https://").count();
    let mut bracket_count = 0;
    let mut depth_start: Option<usize> = None;
    for (index, ch) in body.char_indices() {
        match ch {
            '[' => depth_start = Some(index + 1),
            ']' => {
                if let Some(start) = depth_start.take() {
                    if body.get(start..index).is_some_and(|inner| !inner.trim().is_empty()) {
                        bracket_count += 1;
                    }
                }
            }
            _ => {}
        }
    }
    url_count + bracket_count
}

/// Marker type used where a caller has no edges to report (e.g. unit tests
/// exercising checks in isolation).
pub struct NoEdges;

impl CheckEnv for NoEdges {
    fn contradiction_count(&self, _ku_id: &str) -> usize {
        0
    }

    fn incoming_support_count(&self, _ku_id: &str) -> usize {
        0
    }
}

impl CheckEnv for epistemic_core::KnowledgeStore {
    fn contradiction_count(&self, ku_id: &str) -> usize {
        self.edges_touching(ku_id, EdgeType::Contradicts).len()
    }

    fn incoming_support_count(&self, ku_id: &str) -> usize {
        self.incoming_edge_count(ku_id, EdgeType::Supports)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use epistemic_core::ManualClock;
    use epistemic_core::Services;
    use epistemic_core::Tier;
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
            body: "see https://example.com for details".to_string(),
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

    fn def(name: &str, check_type: CheckType, config: Value) -> CheckDefinition {
        CheckDefinition { name: name.to_string(), check_type, config, severity: CheckSeverity::Error, enabled: true }
    }

    #[test]
    fn consistency_passes_for_well_formed_unit() {
        let services = services();
        let unit = sample_unit(&services);
        let result = run_check(&def("c", CheckType::Consistency, json!({})), &unit, &NoEdges, services.now()).unwrap();
        assert_eq!(result.outcome, CheckOutcome::Pass);
    }

    #[test]
    fn consistency_fails_empty_body_for_non_shadow() {
        let services = services();
        let mut unit = sample_unit(&services);
        unit.body = String::new();
        let result = run_check(&def("c", CheckType::Consistency, json!({})), &unit, &NoEdges, services.now()).unwrap();
        assert_eq!(result.outcome, CheckOutcome::Fail);
    }

    #[test]
    fn range_check_flags_out_of_bounds_field() {
        let services = services();
        let mut unit = sample_unit(&services);
        unit.coherence = 1.5;
        let result = run_check(&def("r", CheckType::Range, Value::Null), &unit, &NoEdges, services.now()).unwrap();
        assert_eq!(result.outcome, CheckOutcome::Fail);
    }

    #[test]
    fn citation_counts_url_and_bracket_markers() {
        let services = services();
        let mut unit = sample_unit(&services);
        unit.body = "see https://example.com and [Smith 2020] for more".to_string();
        let result =
            run_check(&def("cite", CheckType::Citation, json!({ "min_count": 2 })), &unit, &NoEdges, services.now()).unwrap();
        assert_eq!(result.outcome, CheckOutcome::Pass);
        assert_eq!(result.details["count"], json!(2));
    }

    #[test]
    fn citation_warns_below_minimum() {
        let services = services();
        let mut unit = sample_unit(&services);
        unit.body = "no citations here".to_string();
        let result =
            run_check(&def("cite", CheckType::Citation, json!({ "min_count": 1 })), &unit, &NoEdges, services.now()).unwrap();
        assert_eq!(result.outcome, CheckOutcome::Warning);
    }

    #[test]
    fn freshness_warns_when_stale() {
        let clock = Arc::new(ManualClock::new(Instant::from_millis(0)));
        let services = Services::with_clock(clock.clone());
        let unit = sample_unit(&services);
        clock.advance(10_000);
        let result = run_check(
            &def("fresh", CheckType::Freshness, json!({ "max_age_ms": 1_000 })),
            &unit,
            &NoEdges,
            services.now(),
        )
        .unwrap();
        assert_eq!(result.outcome, CheckOutcome::Warning);
    }

    #[test]
    fn schema_fails_on_missing_required_field() {
        let services = services();
        let mut unit = sample_unit(&services);
        unit.tags.clear();
        let result = run_check(
            &def("schema", CheckType::Schema, json!({ "required_fields": ["title", "tags"] })),
            &unit,
            &NoEdges,
            services.now(),
        )
        .unwrap();
        assert_eq!(result.outcome, CheckOutcome::Fail);
    }

    #[test]
    fn invalid_config_is_reported_as_an_error_not_a_panic() {
        let services = services();
        let unit = sample_unit(&services);
        let err = run_check(&def("schema", CheckType::Schema, json!({})), &unit, &NoEdges, services.now()).unwrap_err();
        assert_eq!(err.code(), "invalid_check_config");
    }
}
