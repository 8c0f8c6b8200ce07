//! Loading documents, schema registries and store fixtures.
//!
//! Handles loading from files, strings, and HTTP URLs.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LoadError;
use crate::memory::MemoryStore;
use crate::schema::SchemaRegistry;

#[cfg(feature = "remote")]
use std::time::Duration;

#[cfg(feature = "remote")]
use crate::types::MEDIA_TYPE;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON value from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a resource document from a file path.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    load_json(path)
}

/// Load a resource document from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a schema registry from a file path.
pub fn load_registry(path: &Path) -> Result<SchemaRegistry, LoadError> {
    load_json(path)
}

/// Load an in-memory store fixture from a file path.
pub fn load_store(path: &Path) -> Result<MemoryStore, LoadError> {
    load_json(path)
}

/// Write a store back out as a fixture.
///
/// # Errors
///
/// Returns `LoadError::WriteError` if the file cannot be written.
pub fn save_store(store: &MemoryStore, path: &Path) -> Result<(), LoadError> {
    let content =
        serde_json::to_string_pretty(store).map_err(|source| LoadError::InvalidJson { source })?;
    std::fs::write(path, content).map_err(|source| LoadError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

/// Fetch and parse JSON from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// doesn't parse.
#[cfg(feature = "remote")]
pub fn load_json_url<T: DeserializeOwned>(url: &str) -> Result<T, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    client
        .get(url)
        .header(
            reqwest::header::ACCEPT,
            format!("{}, application/json", MEDIA_TYPE),
        )
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(network)?
        .json()
        .map_err(network)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load JSON from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_json_auto<T: DeserializeOwned>(source: &str) -> Result<T, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_json_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_json(Path::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_document_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"data": {{"type": "people"}}}}"#).unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc["data"]["type"], "people");
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/doc.json"));
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
    fn load_registry_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"people": {{"attributes": ["name"], "relationships": {{"articles": {{"cardinality": "many", "type": "articles"}}}}}}}}"#
        )
        .unwrap();

        let registry = load_registry(file.path()).unwrap();
        let schema = registry.get("people").unwrap();
        assert!(schema.permits("name"));
        assert!(schema.relationship_named("articles").is_some());
    }

    #[test]
    fn registry_with_wrong_shape_is_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"people": {{"attributes": "name"}}}}"#).unwrap();

        let result = load_registry(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn store_save_and_load() {
        use crate::memory::ModelDefinition;
        use crate::model::Store;
        use crate::types::Scope;

        let mut store = MemoryStore::new().with_model("people", ModelDefinition::new());
        let mut person = store.new_instance(&Scope::new("people")).unwrap();
        store.save(&mut person).unwrap();

        let file = NamedTempFile::new().unwrap();
        save_store(&store, file.path()).unwrap();
        let loaded = load_store(file.path()).unwrap();
        assert_eq!(loaded.count("people"), 1);
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/schemas.json"));
        assert!(is_url("http://example.com/schemas.json"));
        assert!(!is_url("./schemas.json"));
    }

    #[test]
    fn load_json_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"data": {{"type": "articles"}}}}"#).unwrap();

        let doc: Value = load_json_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(doc["data"]["type"], "articles");
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_registry_over_http() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/schemas.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"people": {"attributes": ["name"]}}"#)
                .create();

            let url = format!("{}/schemas.json", server.url());
            let registry: SchemaRegistry = load_json_auto(&url).unwrap();
            assert!(registry.get("people").unwrap().permits("name"));
            mock.assert();
        }

        #[test]
        fn requests_jsonapi_media_type() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/document.json")
                .match_header(
                    "accept",
                    mockito::Matcher::Regex(r"application/vnd\.api\+json".into()),
                )
                .with_status(200)
                .with_header("content-type", "application/vnd.api+json")
                .with_body(r#"{"data": {"type": "people"}}"#)
                .create();

            let url = format!("{}/document.json", server.url());
            let document: Value = load_json_url(&url).unwrap();
            assert_eq!(document["data"]["type"], "people");
            mock.assert();
        }

        #[test]
        fn http_error_status_is_network_error() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let url = format!("{}/missing.json", server.url());
            let result: Result<Value, _> = load_json_url(&url);
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }
    }
}
