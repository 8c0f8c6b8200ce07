//! Shape validation for resource documents.
//!
//! Only the fields needed at the current recursion level are checked. Every
//! violation found in one pass is reported together; the offending field is
//! named by its top-level key in the checked value.

use std::sync::OnceLock;

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::{json, Value};

use crate::error::ValidationError;

/// Field reported for violations inside a resource's `data` object.
const DATA_FIELD: &str = "data";

fn resource_shape() -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "properties": {
            "type": { "type": "string", "minLength": 1 },
            "id": { "type": ["string", "null"] },
            "attributes": { "type": "object" },
            "relationships": {
                "type": "object",
                "additionalProperties": { "type": "object" }
            }
        }
    })
}

fn document_shape() -> Value {
    json!({
        "type": "object",
        "required": [DATA_FIELD],
        "properties": { "data": resource_shape() }
    })
}

fn identifier_shape() -> Value {
    json!({
        "type": "object",
        "required": ["id", "type"],
        "properties": {
            "id": { "type": "string" },
            "type": { "type": "string", "minLength": 1 }
        }
    })
}

/// Compile `shape` on first use. `None` only if the shape itself is invalid.
fn compiled(
    cell: &'static OnceLock<Option<Validator>>,
    shape: fn() -> Value,
) -> Option<&'static Validator> {
    cell.get_or_init(|| jsonschema::validator_for(&shape()).ok())
        .as_ref()
}

fn document_validator() -> Option<&'static Validator> {
    static DOCUMENT: OnceLock<Option<Validator>> = OnceLock::new();
    compiled(&DOCUMENT, document_shape)
}

fn resource_validator() -> Option<&'static Validator> {
    static RESOURCE: OnceLock<Option<Validator>> = OnceLock::new();
    compiled(&RESOURCE, resource_shape)
}

fn identifier_validator() -> Option<&'static Validator> {
    static IDENTIFIER: OnceLock<Option<Validator>> = OnceLock::new();
    compiled(&IDENTIFIER, identifier_shape)
}

/// Validate a top-level resource document.
///
/// Requires `data` to be an object with a non-empty string `type`.
///
/// # Errors
///
/// Returns `ValidationError` naming `data` if the resource is malformed.
pub fn validate_document(document: &Value) -> Result<(), ValidationError> {
    check(document_validator(), document, None)
}

/// Validate a resource nested inside a relationship, as if it were the
/// `data` of its own document.
pub fn validate_nested(resource: &Value) -> Result<(), ValidationError> {
    check(resource_validator(), resource, Some(DATA_FIELD))
}

/// Validate a resource identifier used for lookup.
///
/// Both `id` and `type` must be present and be strings; `type` must not be empty.
///
/// # Errors
///
/// Returns `ValidationError` naming each of `id` and `type` that is invalid.
pub fn validate_identifier(identifier: &Value) -> Result<(), ValidationError> {
    check(identifier_validator(), identifier, None)
}

/// Run `instance` against a compiled shape, collecting offending top-level field names.
///
/// With `field` set, every violation is reported under that one name.
fn check(
    validator: Option<&Validator>,
    instance: &Value,
    field: Option<&str>,
) -> Result<(), ValidationError> {
    let fallback = field.unwrap_or(DATA_FIELD);
    let validator = validator.ok_or_else(|| ValidationError::new([fallback]))?;

    let fields: Vec<String> = validator
        .iter_errors(instance)
        .map(|error| match field {
            Some(name) => name.to_string(),
            None => {
                let path = error.instance_path.to_string();
                top_level_field(&path)
                    .map(String::from)
                    .or_else(|| missing_property(&error.kind))
                    .unwrap_or_else(|| fallback.to_string())
            }
        })
        .collect();

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(fields))
    }
}

/// First segment of a JSON Pointer.
fn top_level_field(pointer: &str) -> Option<&str> {
    pointer
        .strip_prefix('/')
        .and_then(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
}

fn missing_property(kind: &ValidationErrorKind) -> Option<String> {
    match kind {
        ValidationErrorKind::Required { property } => property.as_str().map(String::from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_with_type_is_valid() {
        assert!(validate_document(&json!({ "data": { "type": "people" } })).is_ok());
    }

    #[test]
    fn missing_type_reports_data() {
        let err = validate_document(&json!({ "data": {} })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'data' is malformed or missing");
    }

    #[test]
    fn missing_data_reports_data() {
        let err = validate_document(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Field 'data' is malformed or missing");
    }

    #[test]
    fn non_string_type_reports_data() {
        let err = validate_document(&json!({ "data": { "type": 5 } })).unwrap_err();
        assert_eq!(err.fields(), ["data".to_string()]);
    }

    #[test]
    fn non_object_attributes_report_data() {
        let doc = json!({ "data": { "type": "people", "attributes": [1, 2] } });
        assert!(validate_document(&doc).is_err());
    }

    #[test]
    fn identifier_missing_id() {
        let err = validate_identifier(&json!({ "type": "none" })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'id' is malformed or missing");
    }

    #[test]
    fn identifier_missing_type() {
        let err = validate_identifier(&json!({ "id": "none" })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'type' is malformed or missing");
    }

    #[test]
    fn identifier_integer_id() {
        let err = validate_identifier(&json!({ "id": 1, "type": "none" })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'id' is malformed or missing");
    }

    #[test]
    fn identifier_array_type() {
        let err = validate_identifier(&json!({ "id": "1", "type": ["what"] })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'type' is malformed or missing");
    }

    #[test]
    fn identifier_collects_both_fields() {
        let err = validate_identifier(&json!({})).unwrap_err();
        assert_eq!(err.fields().len(), 2);
        assert!(err.fields().contains(&"id".to_string()));
        assert!(err.fields().contains(&"type".to_string()));
    }

    #[test]
    fn empty_type_reports_data() {
        let err = validate_document(&json!({ "data": { "type": "" } })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'data' is malformed or missing");
    }

    #[test]
    fn identifier_empty_type() {
        let err = validate_identifier(&json!({ "id": "1", "type": "" })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'type' is malformed or missing");
    }

    #[test]
    fn shapes_compile_once() {
        let first = document_validator().unwrap();
        let second = document_validator().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(resource_validator().is_some());
        assert!(identifier_validator().is_some());
    }

    #[test]
    fn nested_resource_reports_data() {
        let err = validate_nested(&json!({ "attributes": { "title": "x" } })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'data' is malformed or missing");
    }

    #[test]
    fn top_level_field_segments() {
        assert_eq!(top_level_field("/data/type"), Some("data"));
        assert_eq!(top_level_field("/id"), Some("id"));
        assert_eq!(top_level_field(""), None);
    }
}
