//! HTTP transport boundary.
//!
//! The engine only hands a verb, a path with bound parameters, query
//! parameters and an optional JSON body to a [`Transport`]. Base URLs,
//! authentication and retries belong to the transport implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::types::{Verb, JSON_MEDIA_TYPE};

#[cfg(feature = "remote")]
use crate::types::TransportOptions;

/// A request produced by binding an operation's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub verb: Verb,
    /// Documented path with path parameters substituted.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// A response handed back by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub value: Value,
}

impl HttpResponse {
    /// A JSON response with no other headers.
    pub fn json(status: u16, value: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), JSON_MEDIA_TYPE.to_string());
        Self {
            status,
            headers,
            value,
        }
    }

    /// Media type of the body without parameters (`; charset=...`).
    ///
    /// Defaults to `application/json` when the header is missing.
    pub fn media_type(&self) -> &str {
        self.headers
            .get("content-type")
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(JSON_MEDIA_TYPE)
    }
}

/// Executes requests on behalf of the engine.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport that refuses every request.
///
/// Used when resources are only inspected locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTransport;

#[async_trait]
impl Transport for OfflineTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Offline { path: request.path })
    }
}

/// Transport over `reqwest`.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "remote")]
impl HttpTransport {
    /// # Errors
    ///
    /// Returns `TransportError::Network` if the client cannot be built.
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|source| TransportError::Network {
                url: options.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: options.base_url.clone(),
        })
    }

    fn method(verb: Verb) -> reqwest::Method {
        match verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Put => reqwest::Method::PUT,
            Verb::Post => reqwest::Method::POST,
            Verb::Delete => reqwest::Method::DELETE,
            Verb::Options => reqwest::Method::OPTIONS,
            Verb::Head => reqwest::Method::HEAD,
            Verb::Patch => reqwest::Method::PATCH,
            Verb::Trace => reqwest::Method::TRACE,
        }
    }
}

#[cfg(feature = "remote")]
#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let network_error = |source: reqwest::Error| TransportError::Network {
            url: url.clone(),
            source,
        };

        let mut builder = self
            .client
            .request(Self::method(request.verb), &url)
            .header(reqwest::header::ACCEPT, JSON_MEDIA_TYPE);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(verb = %request.verb, %url, "sending request");
        let response = builder.send().await.map_err(network_error)?;

        // Check for HTTP errors before parsing
        let response = response.error_for_status().map_err(network_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_lowercase(), value.to_str().ok()?.to_string()))
            })
            .collect();

        let bytes = response.bytes().await.map_err(network_error)?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| TransportError::InvalidBody {
                url: url.clone(),
                message: e.to_string(),
            })?
        };

        Ok(HttpResponse {
            status,
            headers,
            value,
        })
    }
}
