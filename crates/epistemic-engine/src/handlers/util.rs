// epistemic-engine/src/handlers/util.rs
// ============================================================================
// Module: Handler Utilities
// Description: Shared request-decoding helpers every handler module uses to
// turn a wire-level `Value` into a typed request.
// Dependencies: serde, serde_json
// ============================================================================

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DispatchError;

/// Decodes `input` into `T`, wrapping a mismatch as
/// [`DispatchError::InvalidInput`] against `(domain, name)`.
pub fn decode<T: DeserializeOwned>(domain: &str, name: &str, input: Value) -> Result<T, DispatchError> {
    serde_json::from_value(input).map_err(|err| DispatchError::InvalidInput {
        domain: domain.to_string(),
        name: name.to_string(),
        reason: err.to_string(),
    })
}
