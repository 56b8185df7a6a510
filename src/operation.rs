//! Invocable operation descriptors.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{json, Map, Value};

use crate::context::ApiContext;
use crate::documentation::Operation;
use crate::error::EngineError;
use crate::resource::SemanticResource;
use crate::transport::HttpRequest;

/// Characters escaped in a path parameter value so it stays one segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One documented operation, ready to be invoked.
///
/// Parameter values come from caller-supplied values first, then from the
/// `default` of each parameter schema (filled in from hypermedia controls
/// when the operation was reached through a relation).
#[derive(Debug, Clone)]
pub struct GenericOperation {
    operation: Operation,
    values: BTreeMap<String, Value>,
    body: Option<Value>,
    context: ApiContext,
}

impl GenericOperation {
    pub fn new(operation: Operation, context: ApiContext) -> Self {
        Self {
            operation,
            values: BTreeMap::new(),
            body: None,
            context,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn id(&self) -> &str {
        &self.operation.id
    }

    /// Bind a parameter value, overriding any default.
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_value(name, value);
        self
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Use `body` as the request body instead of the schema defaults.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Bound value of a parameter: caller value, else schema default.
    pub fn parameter_value(&self, name: &str) -> Option<&Value> {
        self.values
            .get(name)
            .or_else(|| self.operation.parameter(name)?.default_value())
    }

    /// Names of required parameters with neither a value nor a default.
    pub fn missing_required_parameters(&self) -> Vec<&str> {
        self.operation
            .parameters
            .iter()
            .filter(|p| p.required && self.parameter_value(&p.name).is_none())
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn is_missing_required_parameters(&self) -> bool {
        !self.missing_required_parameters().is_empty()
    }

    /// Body sent for write verbs.
    ///
    /// The caller's body if one was set, otherwise an object assembled from
    /// the `default` of each request body property. `None` for verbs without
    /// a body or when there is nothing to send.
    pub fn request_body(&self) -> Option<Value> {
        if !self.operation.verb.has_body() {
            return None;
        }
        if let Some(body) = &self.body {
            return Some(body.clone());
        }

        let properties = self
            .operation
            .request_body_schema()?
            .get("properties")?
            .as_object()?;
        let defaults: Map<String, Value> = properties
            .iter()
            .filter_map(|(name, prop)| Some((name.clone(), prop.get("default")?.clone())))
            .collect();

        (!defaults.is_empty()).then_some(Value::Object(defaults))
    }

    /// Bind parameters into a request.
    ///
    /// Path values are percent-encoded as a single segment; query values are
    /// left to the transport.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnboundParameter` if a path parameter has no value.
    pub fn to_request(&self) -> Result<HttpRequest, EngineError> {
        let mut path = self.operation.path.clone();
        let mut query = Vec::new();

        for parameter in &self.operation.parameters {
            let value = self.parameter_value(&parameter.name);
            match (parameter.location.as_str(), value) {
                ("path", Some(value)) => {
                    let segment = utf8_percent_encode(&scalar(value), PATH_SEGMENT).to_string();
                    path = path.replace(&format!("{{{}}}", parameter.name), &segment);
                }
                ("path", None) => {
                    return Err(EngineError::UnboundParameter {
                        operation_id: self.operation.id.clone(),
                        name: parameter.name.clone(),
                    });
                }
                ("query", Some(Value::Array(items))) => {
                    query.extend(items.iter().map(|v| (parameter.name.clone(), scalar(v))));
                }
                ("query", Some(value)) => query.push((parameter.name.clone(), scalar(value))),
                // Headers and cookies belong to the transport.
                _ => {}
            }
        }

        Ok(HttpRequest {
            verb: self.operation.verb,
            path,
            query,
            body: self.request_body(),
        })
    }

    /// Execute the operation and wrap the response.
    ///
    /// # Errors
    ///
    /// Transport failures propagate unchanged; nothing is retried.
    pub async fn call(&self) -> Result<SemanticResource, EngineError> {
        let request = self.to_request()?;
        tracing::debug!(
            operation = %self.operation.id,
            verb = %request.verb,
            path = %request.path,
            "calling operation"
        );

        let response = self.context.transport().send(request).await?;
        SemanticResource::from_response(&self.operation, response, self.context.clone())
    }

    /// JSON summary of the descriptor and its bound values.
    pub fn describe(&self) -> Value {
        let parameters: Map<String, Value> = self
            .operation
            .parameters
            .iter()
            .map(|p| {
                let value = self.parameter_value(&p.name).cloned().unwrap_or(Value::Null);
                (p.name.clone(), value)
            })
            .collect();

        json!({
            "operationId": self.operation.id,
            "verb": self.operation.verb,
            "path": self.operation.path,
            "parameters": parameters,
            "body": self.request_body(),
            "missingRequiredParameters": self.missing_required_parameters(),
        })
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
