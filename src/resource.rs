//! Semantic view over one JSON payload.
//!
//! A [`SemanticResource`] answers questions in terms of semantic identifiers
//! rather than JSON property names:
//!
//! - [`get`](SemanticResource::get): the value carrying a semantic term,
//!   looked up in the payload and, failing that, through a single
//!   parent-affiliated link.
//! - [`get_relation`](SemanticResource::get_relation): the operations the
//!   payload's hypermedia controls expose for a semantic relation, with
//!   control defaults injected into their parameter and body schemas.
//! - [`get_other_data`](SemanticResource::get_other_data) /
//!   [`get_other_relations`](SemanticResource::get_other_relations): what
//!   has not been surfaced yet.
//!
//! Each resource tracks which properties and relations it has handed out.
//! That state belongs to the instance alone: nested resources start with
//! empty read-sets, and clones carry independent copies.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use serde_json::Value;

use crate::context::ApiContext;
use crate::control::{controls_of, HypermediaControl};
use crate::diagnostics::{Diagnostic, AMBIGUOUS_REMOTE_VALUE, MISSING_OPERATION};
use crate::documentation::{Operation, Parameter};
use crate::error::EngineError;
use crate::operation::GenericOperation;
use crate::transport::HttpResponse;
use crate::types::{is_parent_affiliated, semantic_id, Shape, RELATION_KEY};
use crate::validator;

/// Result of a semantic lookup.
#[derive(Debug, Clone)]
pub enum Resolved {
    One(SemanticResource),
    /// The matched property is an array; one resource per element.
    Many(Vec<SemanticResource>),
}

impl Resolved {
    /// Raw JSON, with `Many` collapsed back into an array.
    pub fn into_value(self) -> Value {
        match self {
            Resolved::One(resource) => resource.into_value(),
            Resolved::Many(resources) => Value::Array(
                resources
                    .into_iter()
                    .map(SemanticResource::into_value)
                    .collect(),
            ),
        }
    }

    pub fn as_one(&self) -> Option<&SemanticResource> {
        match self {
            Resolved::One(resource) => Some(resource),
            Resolved::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[SemanticResource]> {
        match self {
            Resolved::One(_) => None,
            Resolved::Many(resources) => Some(resources),
        }
    }
}

/// An available operation reached through a hypermedia control.
#[derive(Debug, Clone)]
pub struct Relation {
    /// Key of the link in the response `links`, also the control name.
    pub key: String,
    /// Semantic relation declared by the link.
    pub relation: Option<String>,
    pub operation: GenericOperation,
}

/// Where a semantic term lives in the payload.
struct PropertyMatch<'a> {
    outer: &'a str,
    /// Set when the term sits inside a parent-affiliated object.
    inner: Option<&'a str>,
    schema: &'a Value,
}

/// A JSON payload together with the schemas describing it.
#[derive(Debug, Clone)]
pub struct SemanticResource {
    value: Value,
    schema: Option<Value>,
    response_schema: Option<Value>,
    semantic_type: Option<String>,
    shape: Shape,
    read_data: BTreeSet<String>,
    read_relations: BTreeSet<String>,
    context: ApiContext,
}

impl SemanticResource {
    /// Wrap `value`.
    ///
    /// When `resource_schema` declares `oneOf`, the variant describing the
    /// value is chosen by validation: among validating variants the one with
    /// the most `required` fields wins, ties going to the first declared. If
    /// none validates the resource has no schema and no type.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidSchema` if a variant cannot be compiled.
    pub fn new(
        value: Value,
        resource_schema: Option<Value>,
        response_schema: Option<Value>,
        context: ApiContext,
    ) -> Result<Self, EngineError> {
        let (schema, semantic_type) = match resource_schema {
            Some(declared) => match declared.get("oneOf").and_then(Value::as_array) {
                Some(variants) => match select_variant(variants, &value)? {
                    Some(variant) => {
                        let semantic_type = type_of(variant).or_else(|| type_of(&declared));
                        (Some(variant.clone()), semantic_type)
                    }
                    None => (None, None),
                },
                None => {
                    let semantic_type = type_of(&declared);
                    (Some(declared), semantic_type)
                }
            },
            None => (None, None),
        };

        let shape = Shape::classify(schema.as_ref(), &value);

        Ok(Self {
            value,
            schema,
            response_schema,
            semantic_type,
            shape,
            read_data: BTreeSet::new(),
            read_relations: BTreeSet::new(),
            context,
        })
    }

    /// Wrap a response to `operation`.
    ///
    /// The Response Object for the status becomes the response schema (its
    /// `links` describe the controls), and its body schema for the response
    /// media type becomes the resource schema.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UndocumentedResponse` if the status is not
    /// documented, or any error of [`SemanticResource::new`].
    pub fn from_response(
        operation: &Operation,
        response: HttpResponse,
        context: ApiContext,
    ) -> Result<Self, EngineError> {
        let media_type = response.media_type().to_string();
        let envelope = operation
            .response(&response.status.to_string())
            .ok_or_else(|| EngineError::UndocumentedResponse {
                operation_id: operation.id.clone(),
                status: response.status,
                media_type: media_type.clone(),
            })?;

        let schema = envelope
            .get("content")
            .and_then(|c| c.get(media_type.as_str()))
            .and_then(|m| m.get("schema"))
            .cloned();

        Self::new(response.value, schema, Some(envelope.clone()), context)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// The resolved schema (the chosen variant for `oneOf` schemas).
    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    pub fn response_schema(&self) -> Option<&Value> {
        self.response_schema.as_ref()
    }

    /// `@id` of the resolved schema, else its `type`.
    pub fn semantic_type(&self) -> Option<&str> {
        self.semantic_type.as_deref()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_object(&self) -> bool {
        self.shape == Shape::Object
    }

    pub fn is_array(&self) -> bool {
        self.shape == Shape::Array
    }

    pub fn is_primitive(&self) -> bool {
        self.shape == Shape::Primitive
    }

    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    /// Top-level properties surfaced so far.
    pub fn read_data(&self) -> impl Iterator<Item = &str> {
        self.read_data.iter().map(String::as_str)
    }

    /// Relation keys surfaced so far.
    pub fn read_relations(&self) -> impl Iterator<Item = &str> {
        self.read_relations.iter().map(String::as_str)
    }

    /// Forget every surfaced property and relation.
    pub fn reset_read_counter(&mut self) -> &mut Self {
        self.read_data.clear();
        self.read_relations.clear();
        self
    }

    /// Look `semantic_key` up in the payload, then through a parent link.
    ///
    /// The remote path is only taken on a local miss. It considers the
    /// parent-affiliated controls of the payload whose operation is a `get`
    /// with every required parameter bound, and whose `200` body declares a
    /// property with `@id == semantic_key`. With exactly one such control the
    /// operation is called; with several the lookup is ambiguous, reported,
    /// and resolves to `None`.
    ///
    /// # Errors
    ///
    /// Transport failures of the remote call propagate.
    pub async fn get(&mut self, semantic_key: &str) -> Result<Option<Resolved>, EngineError> {
        if let Some(found) = self.get_local(semantic_key)? {
            return Ok(Some(found));
        }
        self.get_remote(semantic_key).await
    }

    /// Like [`get`](Self::get), unwrapped to raw JSON.
    pub async fn get_value(&mut self, semantic_key: &str) -> Result<Option<Value>, EngineError> {
        Ok(self.get(semantic_key).await?.map(Resolved::into_value))
    }

    /// Look `semantic_key` up in the payload only. Never suspends.
    ///
    /// Objects match the first declared property whose `@id` is the key,
    /// looking through parent-affiliated nested objects as if their
    /// properties were declared at this level. Arrays never match. A
    /// primitive matches itself when its type is the key.
    pub fn get_local(&mut self, semantic_key: &str) -> Result<Option<Resolved>, EngineError> {
        match self.shape {
            Shape::Object => {}
            Shape::Primitive => {
                let matched = self.semantic_type.as_deref() == Some(semantic_key);
                return Ok(matched.then(|| Resolved::One(self.clone())));
            }
            Shape::Array | Shape::Unknown => return Ok(None),
        }

        let Some(found) = self.find_property(semantic_key) else {
            return Ok(None);
        };
        let Some(raw) = self.raw_value(&found).cloned() else {
            return Ok(None);
        };
        let outer = found.outer.to_string();
        let schema = found.schema.clone();

        self.read_data.insert(outer);
        wrap(raw, &schema, &self.context).map(Some)
    }

    /// Like [`get_local`](Self::get_local), unwrapped to raw JSON.
    pub fn get_local_value(&mut self, semantic_key: &str) -> Result<Option<Value>, EngineError> {
        Ok(self.get_local(semantic_key)?.map(Resolved::into_value))
    }

    /// Every declared property not surfaced yet, with its resolved value.
    ///
    /// Keyed by property name in declaration order. Properties without an
    /// `@id` or without a value are left out. Only the payload is consulted,
    /// and the read-set is the same after the call as before it.
    pub fn get_other_data(&mut self) -> Result<Vec<(String, Resolved)>, EngineError> {
        let Some(properties) = self
            .schema
            .as_ref()
            .and_then(|s| s.get("properties"))
            .and_then(Value::as_object)
        else {
            return Ok(Vec::new());
        };

        let pending: Vec<(String, String)> = properties
            .iter()
            .filter(|(name, _)| !self.read_data.contains(name.as_str()))
            .filter_map(|(name, schema)| Some((name.clone(), semantic_id(schema)?.to_string())))
            .collect();

        let read_before = self.read_data.clone();
        let resolved: Result<Vec<_>, EngineError> = pending
            .into_iter()
            .map(|(name, id)| Ok(self.get_local(&id)?.map(|found| (name, found))))
            .collect();
        self.read_data = read_before;

        Ok(resolved?.into_iter().flatten().collect())
    }

    /// Available operations for a semantic relation, up to `limit`.
    ///
    /// A link declared in the response `links` with `@relation == relation`
    /// is available only when the payload exposes a control of the same
    /// name. `None` and `Some(0)` both mean no limit. Returned relations are
    /// recorded as read.
    pub fn get_relation(&mut self, relation: &str, limit: Option<usize>) -> Vec<Relation> {
        let mut relations = self.resolve_relations(|_, link| {
            link.get(RELATION_KEY).and_then(Value::as_str) == Some(relation)
        });
        if let Some(limit) = limit.filter(|&n| n > 0) {
            relations.truncate(limit);
        }
        for found in &relations {
            self.read_relations.insert(found.key.clone());
        }
        relations
    }

    /// The first available operation for a semantic relation.
    pub fn first_relation(&mut self, relation: &str) -> Option<Relation> {
        self.get_relation(relation, Some(1)).into_iter().next()
    }

    /// Concatenation of [`get_relation`](Self::get_relation) for each relation.
    pub fn get_relations(&mut self, relations: &[&str]) -> Vec<Relation> {
        relations
            .iter()
            .flat_map(|relation| self.get_relation(relation, None))
            .collect()
    }

    /// True if at least one operation is available for `relation`.
    ///
    /// Does not record anything as read.
    pub fn is_relation_available(&self, relation: &str) -> bool {
        !self
            .resolve_relations(|_, link| {
                link.get(RELATION_KEY).and_then(Value::as_str) == Some(relation)
            })
            .is_empty()
    }

    /// Every control of the payload not surfaced yet, resolved.
    ///
    /// Controls without a documented link or operation are left out. Does not
    /// record anything as read.
    pub fn get_other_relations(&self) -> Vec<Relation> {
        let mut seen = BTreeSet::new();
        controls_of(&self.value)
            .into_iter()
            .filter(|control| !self.read_relations.contains(&control.relation))
            .filter(|control| seen.insert(control.relation.clone()))
            .flat_map(|control| self.resolve_relations(|key, _| key == control.relation))
            .collect()
    }

    async fn get_remote(&self, semantic_key: &str) -> Result<Option<Resolved>, EngineError> {
        let mut candidates: Vec<(Relation, String, Value)> = self
            .resolve_relations(|_, link| is_parent_affiliated(link))
            .into_iter()
            .filter(|found| {
                found.operation.operation().verb.is_read()
                    && !found.operation.is_missing_required_parameters()
            })
            .filter_map(|found| {
                let (name, schema) = property_in_response(found.operation.operation(), semantic_key)?;
                Some((found, name, schema))
            })
            .collect();

        if candidates.len() > 1 {
            let keys: Vec<&str> = candidates.iter().map(|(found, _, _)| found.key.as_str()).collect();
            self.context.diagnostics().report(Diagnostic::warning(
                AMBIGUOUS_REMOTE_VALUE,
                format!(
                    "{} parent links can provide '{}': {}",
                    candidates.len(),
                    semantic_key,
                    keys.join(", ")
                ),
            ));
            return Ok(None);
        }
        let Some((found, name, schema)) = candidates.pop() else {
            return Ok(None);
        };

        let linked = found.operation.call().await?;
        let Some(raw) = linked.value().get(name.as_str()).cloned() else {
            return Ok(None);
        };
        wrap(raw, &schema, &self.context).map(Some)
    }

    /// Available links of the response schema accepted by `accept`.
    fn resolve_relations<F>(&self, mut accept: F) -> Vec<Relation>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        let Some(links) = self
            .response_schema
            .as_ref()
            .and_then(|s| s.get("links"))
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };

        let controls = controls_of(&self.value);
        let documentation = self.context.documentation();
        let mut relations = Vec::new();

        for (key, link) in links {
            if !accept(key.as_str(), link) {
                continue;
            }
            let Some(control) = controls.iter().find(|c| c.relation == *key) else {
                tracing::trace!(%key, "link not exposed by the payload");
                continue;
            };

            let Some(operation_id) = link.get("operationId").and_then(Value::as_str) else {
                self.context.diagnostics().report_once(
                    key,
                    Diagnostic::error(
                        MISSING_OPERATION,
                        format!("link '{}' declares no operationId", key),
                    ),
                );
                continue;
            };
            let Some(documented) = documentation.find_operation_by_id(operation_id) else {
                self.context.diagnostics().report_once(
                    key,
                    Diagnostic::warning(
                        MISSING_OPERATION,
                        format!(
                            "link '{}' references operation '{}' which is not documented",
                            key, operation_id
                        ),
                    ),
                );
                continue;
            };

            relations.push(Relation {
                key: key.clone(),
                relation: link
                    .get(RELATION_KEY)
                    .and_then(Value::as_str)
                    .map(str::to_string),
                operation: GenericOperation::new(
                    self.prepare_operation(documented, control),
                    self.context.clone(),
                ),
            });
        }

        relations
    }

    /// Pin a polymorphic body and inject the control's defaults.
    fn prepare_operation(&self, documented: &Operation, control: &HypermediaControl) -> Operation {
        let mut operation = match documented.request_body_variants() {
            Some(variants) => {
                let variant = closest_variant(variants, control);
                self.context
                    .documentation()
                    .pin_request_body(documented, variant)
                    .unwrap_or_else(|| documented.clone())
            }
            None => documented.clone(),
        };

        for parameter in &mut operation.parameters {
            if let Some(default) = control.default_for(&parameter.name) {
                parameter.set_default(default.clone());
            } else if parameter.default_value().is_none() {
                if let Some(own) = self.own_value_for(parameter) {
                    parameter.set_default(own.clone());
                }
            }
        }

        if let Some(properties) = operation
            .request_body_schema_mut()
            .and_then(|s| s.get_mut("properties"))
            .and_then(Value::as_object_mut)
        {
            for (name, property) in properties.iter_mut() {
                if let (Some(default), Some(property)) =
                    (control.default_for(name), property.as_object_mut())
                {
                    property.insert("default".to_string(), default.clone());
                }
            }
        }

        operation
    }

    /// Value this payload holds for a parameter: by the parameter schema's
    /// `@id` first, then by a top-level property of the same name.
    fn own_value_for(&self, parameter: &Parameter) -> Option<&Value> {
        if self.shape != Shape::Object {
            return None;
        }
        let by_term = semantic_id(&parameter.schema)
            .and_then(|id| self.find_property(id))
            .and_then(|found| self.raw_value(&found));
        by_term.or_else(|| self.value.get(parameter.name.as_str()))
    }

    fn find_property(&self, semantic_key: &str) -> Option<PropertyMatch<'_>> {
        let properties = self.schema.as_ref()?.get("properties")?.as_object()?;

        for (name, schema) in properties {
            let flattened = schema.get("type").and_then(Value::as_str) == Some("object")
                && is_parent_affiliated(schema);

            if !flattened {
                if semantic_id(schema) == Some(semantic_key) {
                    return Some(PropertyMatch {
                        outer: name.as_str(),
                        inner: None,
                        schema,
                    });
                }
                continue;
            }

            let nested = schema.get("properties").and_then(Value::as_object);
            for (inner, inner_schema) in nested.into_iter().flatten() {
                if semantic_id(inner_schema) == Some(semantic_key) {
                    return Some(PropertyMatch {
                        outer: name.as_str(),
                        inner: Some(inner.as_str()),
                        schema: inner_schema,
                    });
                }
            }
        }

        None
    }

    fn raw_value(&self, found: &PropertyMatch<'_>) -> Option<&Value> {
        let outer = self.value.get(found.outer)?;
        match found.inner {
            Some(inner) => outer.get(inner),
            None => Some(outer),
        }
    }
}

/// Wrap a property value with the property's schema.
///
/// Arrays typed `array` become one resource per element, described by the
/// item schema. Response schemas are looked up by the `@id` of the
/// (item) schema.
fn wrap(raw: Value, schema: &Value, context: &ApiContext) -> Result<Resolved, EngineError> {
    let documentation = context.documentation();
    let typed_array = schema.get("type").and_then(Value::as_str) == Some("array");

    match raw {
        Value::Array(items) if typed_array => {
            let item_schema = schema.get("items").cloned();
            let response = item_schema
                .as_ref()
                .and_then(semantic_id)
                .and_then(|id| documentation.response_body_schema(id))
                .cloned();
            items
                .into_iter()
                .map(|item| {
                    SemanticResource::new(item, item_schema.clone(), response.clone(), context.clone())
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Resolved::Many)
        }
        raw => {
            let response = semantic_id(schema)
                .and_then(|id| documentation.response_body_schema(id))
                .cloned();
            SemanticResource::new(raw, Some(schema.clone()), response, context.clone())
                .map(Resolved::One)
        }
    }
}

/// First variant validating `value`, most `required` fields first.
fn select_variant<'a>(
    variants: &'a [Value],
    value: &Value,
) -> Result<Option<&'a Value>, EngineError> {
    let mut ordered: Vec<&Value> = variants.iter().collect();
    // Stable: equal counts keep declaration order.
    ordered.sort_by_key(|variant| Reverse(required_count(variant)));

    for variant in ordered {
        if validator::matches(variant, value)? {
            return Ok(Some(variant));
        }
    }
    Ok(None)
}

fn required_count(schema: &Value) -> usize {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

fn type_of(schema: &Value) -> Option<String> {
    semantic_id(schema)
        .or_else(|| schema.get("type").and_then(Value::as_str))
        .map(str::to_string)
}

/// Variant sharing the most property names with the control's parameters.
///
/// Ties, and no overlap at all, go to the first declared variant.
fn closest_variant(variants: &[Value], control: &HypermediaControl) -> usize {
    let mut best = (0, 0);
    for (index, variant) in variants.iter().enumerate() {
        let overlap = variant
            .get("properties")
            .and_then(Value::as_object)
            .map_or(0, |props| {
                props
                    .keys()
                    .filter(|name| control.parameters.contains_key(name.as_str()))
                    .count()
            });
        if overlap > best.1 {
            best = (index, overlap);
        }
    }
    best.0
}

/// Property of the operation's `200` body carrying `@id == semantic_key`.
fn property_in_response(operation: &Operation, semantic_key: &str) -> Option<(String, Value)> {
    operation
        .success_body_schema()?
        .get("properties")?
        .as_object()?
        .iter()
        .find(|(_, schema)| semantic_id(schema) == Some(semantic_key))
        .map(|(name, schema)| (name.clone(), schema.clone()))
}
