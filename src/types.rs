//! Core types and vocabulary keys shared by the resolution engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema keyword carrying the semantic term of a property or schema.
pub const ID_KEY: &str = "@id";

/// Link-descriptor keyword carrying the semantic relation.
pub const RELATION_KEY: &str = "@relation";

/// Schema keyword marking a nested object as belonging to its enclosing level.
pub const AFFILIATION_KEY: &str = "x-affiliation";

/// The only affiliation value the engine interprets.
pub const PARENT_AFFILIATION: &str = "parent";

/// Payload property listing the hypermedia controls exposed by the server.
pub const CONTROLS_KEY: &str = "_links";

/// Media type used for request and response bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Default timeout for HTTP requests (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns the `@id` of a schema, if it declares one.
pub fn semantic_id(schema: &Value) -> Option<&str> {
    schema.get(ID_KEY).and_then(Value::as_str)
}

/// Returns true when the schema is an object flagged `x-affiliation: parent`.
pub fn is_parent_affiliated(schema: &Value) -> bool {
    schema.get(AFFILIATION_KEY).and_then(Value::as_str) == Some(PARENT_AFFILIATION)
}

/// HTTP verb of a documented operation.
///
/// Serialized lowercase, matching the keys of an OpenAPI path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Verb {
    /// Every verb, in the order an OpenAPI path item lists them.
    pub const ALL: [Verb; 8] = [
        Verb::Get,
        Verb::Put,
        Verb::Post,
        Verb::Delete,
        Verb::Options,
        Verb::Head,
        Verb::Patch,
        Verb::Trace,
    ];

    /// Parse a path-item key. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Put => "put",
            Verb::Post => "post",
            Verb::Delete => "delete",
            Verb::Options => "options",
            Verb::Head => "head",
            Verb::Patch => "patch",
            Verb::Trace => "trace",
        }
    }

    /// Only `get` is considered safe for implicit, engine-initiated reads.
    pub fn is_read(&self) -> bool {
        matches!(self, Verb::Get)
    }

    /// Verbs that carry a request body.
    pub fn has_body(&self) -> bool {
        matches!(self, Verb::Post | Verb::Put | Verb::Patch)
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a resource, decided once when the resource is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Object,
    Array,
    Primitive,
    /// No schema type and nothing to inspect (a JSON `null`).
    Unknown,
}

impl Shape {
    /// Classify from the schema's `type`, falling back to the value itself
    /// when the schema is absent or does not declare a type.
    pub fn classify(schema: Option<&Value>, value: &Value) -> Self {
        match schema.and_then(|s| s.get("type")).and_then(Value::as_str) {
            Some("object") => Shape::Object,
            Some("array") => Shape::Array,
            Some(_) => Shape::Primitive,
            None => match value {
                Value::Object(_) => Shape::Object,
                Value::Array(_) => Shape::Array,
                Value::Null => Shape::Unknown,
                _ => Shape::Primitive,
            },
        }
    }
}

/// Options for the HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Base URL that operation paths are appended to.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl TransportOptions {
    /// Create options for the given base URL with the default timeout.
    ///
    /// A trailing slash is dropped so documented paths (`/projects/{id}`)
    /// can be appended as-is.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
