// epistemic-engine/src/result.rs
// ============================================================================
// Module: Operation Result
// Description: The uniform wire-level return shape every registered
// operation produces.
// Dependencies: serde_json
// ============================================================================

use serde_json::Value;
use serde_json::json;

/// The uniform shape every dispatched operation returns: `ok` plus either
/// `data` or a lowercase snake_case `error` code.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Result payload on success; `Value::Null` when there is nothing to
    /// report beyond `ok`.
    pub data: Value,
    /// Stable lowercase snake_case error code on failure.
    pub error: Option<String>,
}

impl OperationResult {
    /// Builds a successful result carrying `data`.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self { ok: true, data, error: None }
    }

    /// Builds a failed result carrying a stable error `code`.
    #[must_use]
    pub fn err(code: impl Into<String>) -> Self {
        Self { ok: false, data: Value::Null, error: Some(code.into()) }
    }

    /// Renders this result as the wire-level record: `{"ok": ..., ...}`
    /// with `data`'s fields (if it is an object) spliced in alongside `ok`,
    /// or an `"error"` field on failure.
    #[must_use]
    pub fn into_wire(self) -> Value {
        match (self.ok, self.data) {
            (true, Value::Object(mut fields)) => {
                fields.insert("ok".to_string(), Value::Bool(true));
                Value::Object(fields)
            }
            (true, data) => json!({ "ok": true, "data": data }),
            (false, _) => json!({ "ok": false, "error": self.error }),
        }
    }
}
