//! Document loading from various sources.
//!
//! Handles loading API documentation and payloads from files, strings, and
//! HTTP URLs, and inlining the documentation's internal `$ref` pointers so
//! that schema lookups see complete schemas.

use std::path::Path;

use serde_json::Value;

use crate::documentation::ApiDocumentation;
use crate::error::LoadError;

#[cfg(feature = "remote")]
use crate::types::DEFAULT_TIMEOUT;

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_document_str(&content)
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// isn't valid JSON.
#[cfg(feature = "remote")]
pub async fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source: reqwest::Error| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client.get(url).send().await.map_err(network_error)?;

    // Check for HTTP errors before parsing
    let response = response.error_for_status().map_err(network_error)?;

    response.json().await.map_err(network_error)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a JSON document from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub async fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source).await
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Load an API documentation from a file path or URL and index it.
///
/// Internal `$ref` pointers are inlined before indexing.
pub async fn load_documentation(source: &str) -> Result<ApiDocumentation, LoadError> {
    let mut document = load_document_auto(source).await?;
    inline_refs(&mut document)?;
    ApiDocumentation::from_value(document)
}

/// Navigate a JSON Pointer fragment (e.g., "#/components/schemas/Task").
///
/// Returns the value at the given JSON Pointer path within the document.
pub fn navigate_fragment(document: &Value, fragment: &str) -> Result<Value, LoadError> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(document.clone());
    }

    let mut current = document;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(&key),
        }
        .ok_or_else(|| LoadError::BrokenReference {
            reference: fragment.to_string(),
        })?;
    }
    Ok(current.clone())
}

/// Recursively inline internal `$ref` pointers (`#/...`).
///
/// Keys written next to a `$ref` take precedence over the referenced
/// definition. A reference that is already being expanded further up the
/// tree (a recursive definition) is left as-is. External references are not
/// followed.
pub fn inline_refs(document: &mut Value) -> Result<(), LoadError> {
    let root = document.clone();
    inline_refs_inner(document, &root, &mut Vec::new())
}

fn inline_refs_inner(
    value: &mut Value,
    root: &Value,
    expanding: &mut Vec<String>,
) -> Result<(), LoadError> {
    match value {
        Value::Object(obj) => {
            for child in obj.values_mut() {
                inline_refs_inner(child, root, expanding)?;
            }

            let Some(reference) = obj
                .get("$ref")
                .and_then(Value::as_str)
                .filter(|r| r.starts_with("#/"))
                .map(str::to_string)
            else {
                return Ok(());
            };

            if expanding.contains(&reference) {
                return Ok(());
            }

            let mut target = navigate_fragment(root, &reference)?;
            expanding.push(reference);
            inline_refs_inner(&mut target, root, expanding)?;
            expanding.pop();

            obj.shift_remove("$ref");
            if let Value::Object(target) = target {
                for (k, v) in target {
                    obj.entry(k).or_insert(v);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                inline_refs_inner(item, root, expanding)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_document_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"openapi": "3.0.0", "paths": {{}}}}"#).unwrap();

        let document = load_document(file.path()).unwrap();
        assert_eq!(document["openapi"], "3.0.0");
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/api.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_document(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_document_str_invalid() {
        let result = load_document_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/api.json"));
        assert!(is_url("http://example.com/api.json"));
        assert!(!is_url("/path/to/api.json"));
        assert!(!is_url("api.json"));
    }

    #[test]
    fn navigate_fragment_escapes_and_indices() {
        let document = json!({
            "paths": { "/projects/{id}": { "get": { "tags": ["a", "b"] } } }
        });
        let tag = navigate_fragment(&document, "#/paths/~1projects~1{id}/get/tags/1").unwrap();
        assert_eq!(tag, json!("b"));
    }

    #[test]
    fn navigate_fragment_missing() {
        let result = navigate_fragment(&json!({}), "#/components/schemas/Task");
        assert!(matches!(result, Err(LoadError::BrokenReference { .. })));
    }

    #[test]
    fn inline_refs_replaces_pointer() {
        let mut document = json!({
            "components": {
                "schemas": {
                    "Project": { "type": "object", "@id": "https://schema.org/Project" }
                }
            },
            "paths": {
                "/projects": {
                    "get": {
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Project" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        });

        inline_refs(&mut document).unwrap();

        let schema = &document["paths"]["/projects"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"];
        assert_eq!(schema["@id"], "https://schema.org/Project");
        assert!(schema.get("$ref").is_none());
    }

    #[test]
    fn inline_refs_sibling_keys_win() {
        let mut document = json!({
            "defs": { "Name": { "type": "string", "@id": "https://schema.org/name" } },
            "prop": { "$ref": "#/defs/Name", "@id": "https://schema.org/alternateName" }
        });

        inline_refs(&mut document).unwrap();

        assert_eq!(document["prop"]["@id"], "https://schema.org/alternateName");
        assert_eq!(document["prop"]["type"], "string");
    }

    #[test]
    fn inline_refs_leaves_recursive_pointer() {
        let mut document = json!({
            "defs": {
                "Task": {
                    "type": "object",
                    "properties": { "subtask": { "$ref": "#/defs/Task" } }
                }
            },
            "root": { "$ref": "#/defs/Task" }
        });

        inline_refs(&mut document).unwrap();

        assert_eq!(document["root"]["type"], "object");
        assert_eq!(document["root"]["properties"]["subtask"]["$ref"], "#/defs/Task");
    }

    #[test]
    fn inline_refs_broken_pointer() {
        let mut document = json!({ "schema": { "$ref": "#/nowhere" } });
        let result = inline_refs(&mut document);
        assert!(matches!(result, Err(LoadError::BrokenReference { .. })));
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[tokio::test]
        async fn load_document_url_valid() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("GET", "/api.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"paths": {}}"#)
                .create_async()
                .await;

            let document = load_document_url(&format!("{}/api.json", server.url()))
                .await
                .unwrap();
            assert!(document.get("paths").is_some());
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn load_document_url_404() {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("GET", "/missing.json")
                .with_status(404)
                .create_async()
                .await;

            let result = load_document_url(&format!("{}/missing.json", server.url())).await;
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }
    }
}
