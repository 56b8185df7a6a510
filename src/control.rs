//! Hypermedia controls embedded in payloads.
//!
//! A payload advertises the operations it allows through its `_links` array.
//! Each entry is either a bare control name or an object
//! `{ "relation": <name>, "parameters": { <param>: <default> } }`.

use serde_json::{Map, Value};

use crate::types::CONTROLS_KEY;

/// One control exposed by a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct HypermediaControl {
    /// Control name, matched against the keys of the response `links`.
    pub relation: String,
    /// Default values supplied by the server, keyed by parameter name.
    pub parameters: Map<String, Value>,
}

impl HypermediaControl {
    /// Parse one `_links` entry. Returns `None` for malformed entries.
    pub fn parse(entry: &Value) -> Option<Self> {
        match entry {
            Value::String(relation) => Some(Self {
                relation: relation.clone(),
                parameters: Map::new(),
            }),
            Value::Object(obj) => Some(Self {
                relation: obj.get("relation")?.as_str()?.to_string(),
                parameters: obj
                    .get("parameters")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            }),
            _ => None,
        }
    }

    pub fn default_for(&self, parameter: &str) -> Option<&Value> {
        self.parameters.get(parameter)
    }
}

/// Every well-formed control of a payload, in payload order.
pub fn controls_of(payload: &Value) -> Vec<HypermediaControl> {
    let Some(entries) = payload.get(CONTROLS_KEY).and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let control = HypermediaControl::parse(entry);
            if control.is_none() {
                tracing::trace!(%entry, "skipping malformed hypermedia control");
            }
            control
        })
        .collect()
}
