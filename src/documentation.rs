//! API documentation index.
//!
//! Indexes an OpenAPI-like document by `operationId` and answers the lookups
//! the resolution engine needs: operation descriptors, request and response
//! body schemas, and the response envelope documenting a semantic type.
//!
//! Polymorphic (`oneOf`) request bodies are never edited in place. Pinning a
//! body to one of its variants produces a separate operation, memoized per
//! `(operation id, variant index)`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::types::{semantic_id, Verb, JSON_MEDIA_TYPE};

/// A documented operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Where the parameter goes: `path`, `query`, `header` or `cookie`.
    pub location: String,
    pub required: bool,
    pub schema: Value,
}

impl Parameter {
    fn from_value(value: &Value) -> Option<Self> {
        let name = value.get("name")?.as_str()?.to_string();
        let location = value
            .get("in")
            .and_then(Value::as_str)
            .unwrap_or("query")
            .to_string();
        // Path parameters are always required.
        let required = location == "path"
            || value.get("required").and_then(Value::as_bool).unwrap_or(false);
        let schema = value
            .get("schema")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        Some(Self {
            name,
            location,
            required,
            schema,
        })
    }

    /// The schema's `default`, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.schema.get("default")
    }

    /// Set the schema's `default`, turning a non-object schema into one.
    pub fn set_default(&mut self, value: Value) {
        if !self.schema.is_object() {
            self.schema = Value::Object(Map::new());
        }
        if let Value::Object(schema) = &mut self.schema {
            schema.insert("default".to_string(), value);
        }
    }
}

/// A documented operation, addressed by its `operationId`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: String,
    pub verb: Verb,
    pub path: String,
    pub parameters: Vec<Parameter>,
    /// The OpenAPI Request Body Object (`{ content: { <media>: { schema } } }`).
    pub request_body: Option<Value>,
    /// Response Objects keyed by status code (or `default`).
    pub responses: Map<String, Value>,
}

impl Operation {
    /// Build from a path-item entry. Returns `None` without an `operationId`.
    ///
    /// Path-level parameters are merged in; an operation-level parameter with
    /// the same name and location replaces the path-level one.
    fn from_value(
        path: &str,
        verb: Verb,
        value: &Value,
        path_parameters: &[Parameter],
    ) -> Option<Self> {
        let id = value.get("operationId")?.as_str()?.to_string();

        let own: Vec<Parameter> = value
            .get("parameters")
            .and_then(Value::as_array)
            .map(|params| params.iter().filter_map(Parameter::from_value).collect())
            .unwrap_or_default();

        let mut parameters: Vec<Parameter> = path_parameters
            .iter()
            .filter(|inherited| {
                !own.iter()
                    .any(|p| p.name == inherited.name && p.location == inherited.location)
            })
            .cloned()
            .collect();
        parameters.extend(own);

        Some(Self {
            id,
            verb,
            path: path.to_string(),
            parameters,
            request_body: value.get("requestBody").cloned(),
            responses: value
                .get("responses")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON schema of the request body.
    pub fn request_body_schema(&self) -> Option<&Value> {
        self.request_body
            .as_ref()?
            .get("content")?
            .get(JSON_MEDIA_TYPE)?
            .get("schema")
    }

    pub fn request_body_schema_mut(&mut self) -> Option<&mut Value> {
        self.request_body
            .as_mut()?
            .get_mut("content")?
            .get_mut(JSON_MEDIA_TYPE)?
            .get_mut("schema")
    }

    /// Variants of a polymorphic request body.
    pub fn request_body_variants(&self) -> Option<&Vec<Value>> {
        self.request_body_schema()?.get("oneOf")?.as_array()
    }

    /// Response Object for a status, falling back to `default`.
    pub fn response(&self, status: &str) -> Option<&Value> {
        self.responses
            .get(status)
            .or_else(|| self.responses.get("default"))
    }

    /// Schema documenting the body of a response.
    pub fn response_body_schema(&self, status: &str, media_type: &str) -> Option<&Value> {
        self.response(status)?
            .get("content")?
            .get(media_type)?
            .get("schema")
    }

    /// Schema of the `200` JSON response body.
    pub fn success_body_schema(&self) -> Option<&Value> {
        self.response_body_schema("200", JSON_MEDIA_TYPE)
    }
}

/// An indexed API documentation.
///
/// Shared process-wide (behind an `Arc`) once loaded.
#[derive(Debug)]
pub struct ApiDocumentation {
    document: Value,
    operations: Vec<Operation>,
    by_id: HashMap<String, usize>,
    pinned: Mutex<HashMap<(String, usize), Operation>>,
}

impl ApiDocumentation {
    /// Index a documentation document.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDocument` if the document has no `paths`
    /// object or two operations share an `operationId`.
    pub fn from_value(document: Value) -> Result<Self, LoadError> {
        let paths = document
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| LoadError::InvalidDocument {
                message: "missing paths object".to_string(),
            })?;

        let mut operations = Vec::new();
        let mut by_id = HashMap::new();

        for (path, item) in paths {
            let path_parameters: Vec<Parameter> = item
                .get("parameters")
                .and_then(Value::as_array)
                .map(|params| params.iter().filter_map(Parameter::from_value).collect())
                .unwrap_or_default();

            let Some(item) = item.as_object() else {
                continue;
            };

            for (key, value) in item {
                let Some(verb) = Verb::parse(key) else {
                    continue;
                };
                let Some(operation) = Operation::from_value(path, verb, value, &path_parameters)
                else {
                    continue;
                };

                if by_id.contains_key(&operation.id) {
                    return Err(LoadError::InvalidDocument {
                        message: format!("duplicate operationId '{}'", operation.id),
                    });
                }
                by_id.insert(operation.id.clone(), operations.len());
                operations.push(operation);
            }
        }

        Ok(Self {
            document,
            operations,
            by_id,
            pinned: Mutex::new(HashMap::new()),
        })
    }

    /// The raw (ref-inlined) document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Every indexed operation, in document order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// The operation as documented, never a pinned copy.
    pub fn find_operation_by_id(&self, id: &str) -> Option<&Operation> {
        self.by_id.get(id).map(|&i| &self.operations[i])
    }

    /// The Response Object whose JSON body schema carries `@id == semantic_id`.
    ///
    /// Operations are searched in document order, responses in declaration
    /// order. The Response Object (not just its body schema) is returned
    /// because its `links` describe the controls a resource of that type can
    /// expose.
    pub fn response_body_schema(&self, semantic_id_value: &str) -> Option<&Value> {
        self.operations
            .iter()
            .flat_map(|op| op.responses.values())
            .find(|response| {
                response
                    .get("content")
                    .and_then(|c| c.get(JSON_MEDIA_TYPE))
                    .and_then(|m| m.get("schema"))
                    .and_then(semantic_id)
                    == Some(semantic_id_value)
            })
    }

    /// Request body schema of an operation.
    pub fn request_body_schema<'a>(&self, operation: &'a Operation) -> Option<&'a Value> {
        operation.request_body_schema()
    }

    /// Pin a polymorphic request body to one of its `oneOf` variants.
    ///
    /// Returns a copy of `operation` whose body schema is the chosen variant.
    /// The result is memoized per `(operation id, variant)`, so pinning the
    /// same variant twice yields the same descriptor and pinning different
    /// variants yields distinct ones. Returns `None` if the body is not
    /// polymorphic or `variant` is out of range.
    pub fn pin_request_body(&self, operation: &Operation, variant: usize) -> Option<Operation> {
        let key = (operation.id.clone(), variant);
        if let Some(pinned) = self.lock_pinned().get(&key) {
            return Some(pinned.clone());
        }

        let chosen = operation.request_body_variants()?.get(variant)?.clone();
        let mut pinned = operation.clone();
        *pinned.request_body_schema_mut()? = chosen;

        tracing::debug!(operation = %operation.id, variant, "pinned polymorphic request body");
        self.lock_pinned().insert(key, pinned.clone());
        Some(pinned)
    }

    /// A previously pinned operation, if any.
    pub fn pinned_operation(&self, id: &str, variant: usize) -> Option<Operation> {
        self.lock_pinned().get(&(id.to_string(), variant)).cloned()
    }

    fn lock_pinned(&self) -> MutexGuard<'_, HashMap<(String, usize), Operation>> {
        self.pinned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
