//! Borrowed views over resource documents.
//!
//! Documents stay caller-owned `serde_json::Value`s. These views only read
//! them, and assume the shape has already been checked by the validator.

use serde_json::{Map, Value};

/// The `data` member of a resource document.
#[derive(Debug, Clone, Copy)]
pub struct ResourceData<'a> {
    pub resource_type: &'a str,
    /// `None` when the id is absent, null or blank.
    pub id: Option<&'a str>,
    attributes: Option<&'a Map<String, Value>>,
    relationships: Option<&'a Map<String, Value>>,
}

impl<'a> ResourceData<'a> {
    /// View a `data` object. Returns `None` if it has no string `type`.
    pub fn from_value(data: &'a Value) -> Option<Self> {
        let resource_type = data.get("type")?.as_str()?;
        let id = data
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty());
        Some(Self {
            resource_type,
            id,
            attributes: data.get("attributes").and_then(Value::as_object),
            relationships: data.get("relationships").and_then(Value::as_object),
        })
    }

    /// Attributes in document order. Absent attributes read as empty.
    pub fn attributes(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.attributes.into_iter().flat_map(|map| map.iter())
    }

    /// Relationships in document order. Absent relationships read as empty.
    pub fn relationships(&self) -> impl Iterator<Item = (&'a String, RelationshipData<'a>)> {
        self.relationships
            .into_iter()
            .flat_map(|map| map.iter())
            .map(|(name, rel)| (name, RelationshipData::from_value(rel)))
    }

    /// True if the value carries attributes or relationships of its own,
    /// i.e. it describes a resource to bind rather than one to look up.
    pub fn is_full_resource(value: &Value) -> bool {
        value.get("attributes").is_some() || value.get("relationships").is_some()
    }
}

/// The `data` member of one relationship entry.
#[derive(Debug, Clone, Copy)]
pub enum RelationshipData<'a> {
    /// No `data` key: the relationship was not supplied.
    Absent,
    /// `data: null`.
    Null,
    /// `data: {...}`, an identifier or a full nested resource.
    One(&'a Value),
    /// `data: [...]`.
    Many(&'a [Value]),
}

impl<'a> RelationshipData<'a> {
    fn from_value(rel: &'a Value) -> Self {
        match rel.get("data") {
            None => RelationshipData::Absent,
            Some(Value::Null) => RelationshipData::Null,
            Some(Value::Array(items)) => RelationshipData::Many(items),
            Some(other) => RelationshipData::One(other),
        }
    }
}
