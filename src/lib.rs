//! Semantic Client
//!
//! Client-side resolution engine for hypermedia-driven JSON APIs whose
//! schemas are annotated with semantic identifiers.
//!
//! Given a payload, the schema describing it and the API documentation, the
//! engine answers "what is the value of concept X" and "which operations
//! satisfy relation R" without the caller knowing the payload's property
//! names or link layout.
//!
//! # Example
//!
//! ```
//! use semantic_client::{ApiContext, ApiDocumentation, OfflineTransport};
//! use serde_json::json;
//!
//! let documentation = ApiDocumentation::from_value(json!({
//!     "paths": {
//!         "/projects/{projectId}": {
//!             "get": {
//!                 "operationId": "getProject",
//!                 "responses": {
//!                     "200": {
//!                         "content": {
//!                             "application/json": {
//!                                 "schema": {
//!                                     "type": "object",
//!                                     "@id": "https://schema.org/Project",
//!                                     "properties": {
//!                                         "title": { "type": "string", "@id": "https://schema.org/name" }
//!                                     }
//!                                 }
//!                             }
//!                         }
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let context = ApiContext::new(documentation, OfflineTransport);
//! let mut project = context
//!     .resource_for("getProject", 200, json!({ "title": "Jeera" }))
//!     .unwrap();
//!
//! assert_eq!(project.semantic_type(), Some("https://schema.org/Project"));
//! assert_eq!(
//!     project.get_local_value("https://schema.org/name").unwrap(),
//!     Some(json!("Jeera"))
//! );
//! ```
//!
//! # Vocabulary
//!
//! | Keyword | Where | Meaning |
//! |---------|-------|---------|
//! | `@id` | schema | semantic term carried by a property or schema |
//! | `@relation` | response `links` entry | semantic relation of a link |
//! | `x-affiliation: parent` | nested object schema | its properties belong to the enclosing level |
//! | `x-affiliation: parent` | response `links` entry | the link reaches a resource containing this one |
//! | `_links` | payload | controls the server exposes: names or `{relation, parameters}` |

mod context;
mod control;
mod diagnostics;
mod documentation;
mod error;
mod loader;
mod operation;
mod resource;
mod transport;
mod types;
mod validator;

pub use async_trait::async_trait;
pub use context::ApiContext;
pub use control::{controls_of, HypermediaControl};
pub use diagnostics::{Diagnostic, Diagnostics, Severity, AMBIGUOUS_REMOTE_VALUE, MISSING_OPERATION};
pub use documentation::{ApiDocumentation, Operation, Parameter};
pub use error::{EngineError, LoadError, TransportError};
pub use loader::{
    inline_refs, is_url, load_document, load_document_auto, load_document_str,
    load_documentation, navigate_fragment,
};
pub use operation::GenericOperation;
pub use resource::{Relation, Resolved, SemanticResource};
pub use transport::{HttpRequest, HttpResponse, OfflineTransport, Transport};
pub use types::{
    Shape, TransportOptions, Verb, AFFILIATION_KEY, CONTROLS_KEY, ID_KEY, JSON_MEDIA_TYPE,
    PARENT_AFFILIATION, RELATION_KEY,
};
pub use validator::{compile, CompiledSchema};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
#[cfg(feature = "remote")]
pub use transport::HttpTransport;
