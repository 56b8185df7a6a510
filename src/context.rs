//! Shared collaborators of every resource built for one API.

use std::sync::Arc;

use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::documentation::ApiDocumentation;
use crate::error::EngineError;
use crate::resource::SemanticResource;
use crate::transport::{HttpResponse, Transport};

/// Documentation, transport and diagnostics sink shared by resources.
///
/// Cloning is cheap; clones share all three.
#[derive(Clone)]
pub struct ApiContext {
    documentation: Arc<ApiDocumentation>,
    transport: Arc<dyn Transport>,
    diagnostics: Diagnostics,
}

impl ApiContext {
    pub fn new(documentation: ApiDocumentation, transport: impl Transport + 'static) -> Self {
        Self::from_shared(Arc::new(documentation), Arc::new(transport))
    }

    pub fn from_shared(documentation: Arc<ApiDocumentation>, transport: Arc<dyn Transport>) -> Self {
        Self {
            documentation,
            transport,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Report into an existing sink instead of a fresh one.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn documentation(&self) -> &ApiDocumentation {
        &self.documentation
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Wrap a payload returned by `operation_id` with the given status.
    ///
    /// Entry point for payloads fetched outside the engine.
    pub fn resource_for(
        &self,
        operation_id: &str,
        status: u16,
        value: Value,
    ) -> Result<SemanticResource, EngineError> {
        self.resource_for_response(operation_id, HttpResponse::json(status, value))
    }

    /// Wrap a full response (status, headers, body) to `operation_id`.
    pub fn resource_for_response(
        &self,
        operation_id: &str,
        response: HttpResponse,
    ) -> Result<SemanticResource, EngineError> {
        let operation = self
            .documentation
            .find_operation_by_id(operation_id)
            .ok_or_else(|| EngineError::UnknownOperation {
                operation_id: operation_id.to_string(),
            })?;
        SemanticResource::from_response(operation, response, self.clone())
    }
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("operations", &self.documentation.operations().len())
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}
