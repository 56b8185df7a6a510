//! JSON Schema validation used to disambiguate `oneOf` variants.

use serde_json::Value;

use crate::error::EngineError;

/// A schema compiled once and reusable across values.
pub struct CompiledSchema {
    validator: jsonschema::Validator,
}

impl CompiledSchema {
    /// Returns true if `value` satisfies the schema.
    pub fn is_valid(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

/// Compile a schema.
///
/// Vocabulary extensions (`@id`, `@relation`, `x-affiliation`) are unknown
/// keywords to the validator and are ignored.
///
/// # Errors
///
/// Returns `EngineError::InvalidSchema` if the schema is malformed.
pub fn compile(schema: &Value) -> Result<CompiledSchema, EngineError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| EngineError::InvalidSchema {
        message: e.to_string(),
    })?;
    Ok(CompiledSchema { validator })
}

/// Compile `schema` and check a single value against it.
pub fn matches(schema: &Value, value: &Value) -> Result<bool, EngineError> {
    Ok(compile(schema)?.is_valid(value))
}
