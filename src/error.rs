//! Error types for document loading, validation and binding.

use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;

/// A resource document is missing required fields or has them in the wrong shape.
///
/// Carries every offending field found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct ValidationError {
    fields: Vec<String>,
}

impl ValidationError {
    /// Build an error from offending field names, dropping repeats.
    pub fn new<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self { fields: unique }
    }

    /// Offending field names in the order they were found.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The aggregated message, one clause per field.
    pub fn message(&self) -> String {
        self.fields
            .iter()
            .map(|field| format!("Field '{}' is malformed or missing", field))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// No schema could be found for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("no schema registered for '{name}'")]
    SchemaNotFound { name: String },
}

/// Failures reported by a [`Store`](crate::Store) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown resource type '{0}'")]
    UnknownType(String),

    #[error("'{owner_type}' has no relationship '{relationship}' to scope by")]
    UnknownAssociation {
        owner_type: String,
        relationship: String,
    },

    #[error("no '{resource_type}' with id '{id}' to scope by")]
    OwnerNotFound { resource_type: String, id: String },

    #[error("store failure: {0}")]
    Backend(String),
}

/// A domain object refused a value in its setter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AssignError(pub String);

/// Errors raised while binding a document to a domain object.
#[derive(Debug, Error)]
pub enum BindError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("'{resource_type}' does not have attribute '{attribute}'")]
    UnknownAttribute {
        resource_type: String,
        attribute: String,
    },

    #[error("'{resource_type}' does not have relationship '{relationship}'")]
    UnknownRelationship {
        resource_type: String,
        relationship: String,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("'{resource_type}' with id '{id}' not found")]
    NotFound { resource_type: String, id: String },

    #[error("cannot assign '{name}' on '{resource_type}': {source}")]
    Assign {
        resource_type: String,
        name: String,
        #[source]
        source: AssignError,
    },

    #[error("resource document nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BindError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BindError::Discovery(_) | BindError::Store(_) => 2,
            _ => 1,
        }
    }

    /// HTTP status a hosting boundary should answer with.
    pub fn status(&self) -> u16 {
        match self {
            BindError::NotFound { .. } => 404,
            BindError::Discovery(_) | BindError::Store(_) => 500,
            _ => 422,
        }
    }

    /// Short, stable title for the error kind.
    pub fn title(&self) -> &'static str {
        match self {
            BindError::Validation(_) => "Invalid Document",
            BindError::UnknownAttribute { .. } => "Unknown Attribute",
            BindError::UnknownRelationship { .. } => "Unknown Relationship",
            BindError::Discovery(_) => "Schema Not Found",
            BindError::NotFound { .. } => "Not Found",
            BindError::Assign { .. } => "Invalid Assignment",
            BindError::TooDeep { .. } => "Document Too Deep",
            BindError::Store(_) => "Store Failure",
        }
    }

    /// Render as a JSON:API error document.
    pub fn to_error_document(&self) -> Value {
        json!({
            "errors": [{
                "status": self.status().to_string(),
                "title": self.title(),
                "detail": self.to_string(),
            }]
        })
    }
}

/// Errors while loading documents, registries or store fixtures.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. }
            | LoadError::ReadError { .. }
            | LoadError::WriteError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_joins_fields() {
        let err = ValidationError::new(["id", "type"]);
        assert_eq!(
            err.to_string(),
            "Field 'id' is malformed or missing, Field 'type' is malformed or missing"
        );
    }

    #[test]
    fn validation_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(ValidationError::new(["type"]));
        assert_eq!(err.to_string(), "Field 'type' is malformed or missing");
        assert!(err.source().is_none());
    }

    #[test]
    fn validation_fields_deduplicated() {
        let err = ValidationError::new(["data", "data"]);
        assert_eq!(err.fields(), ["data".to_string()]);
        assert_eq!(err.to_string(), "Field 'data' is malformed or missing");
    }

    #[test]
    fn discovery_is_transparent() {
        let err = BindError::from(DiscoveryError::SchemaNotFound {
            name: "hahahhas".into(),
        });
        assert_eq!(err.to_string(), "no schema registered for 'hahahhas'");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bind_error_exit_codes() {
        let err = BindError::UnknownAttribute {
            resource_type: "people".into(),
            attribute: "not_an_attribute".into(),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            err.to_string(),
            "'people' does not have attribute 'not_an_attribute'"
        );

        let err = BindError::Store(StoreError::UnknownType("hahahhas".into()));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn error_document_shape() {
        let err = BindError::UnknownRelationship {
            resource_type: "people".into(),
            relationship: "non_existent".into(),
        };
        let doc = err.to_error_document();
        assert_eq!(doc["errors"][0]["status"], "422");
        assert_eq!(doc["errors"][0]["title"], "Unknown Relationship");
        assert_eq!(
            doc["errors"][0]["detail"],
            "'people' does not have relationship 'non_existent'"
        );
    }

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("doc.json"),
        };
        assert_eq!(err.exit_code(), 3);
    }
}
