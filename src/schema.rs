//! Resource schemas and the registry that maps names to them.
//!
//! A schema declares what a bind may touch on one resource type: the
//! permitted attribute names and the relationships with their cardinality
//! and target type. Registries are plain data and load from JSON:
//!
//! ```json
//! {
//!   "people": {
//!     "attributes": ["name"],
//!     "relationships": {
//!       "articles": { "cardinality": "many", "type": "articles" }
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;
use crate::model::Model;
use crate::types::{Cardinality, KeyStrategy};

/// A declared relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSchema {
    pub cardinality: Cardinality,
    #[serde(rename = "type")]
    pub target_type: String,
}

/// Declared shape of one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, rename = "attributes")]
    pub permitted_attributes: BTreeSet<String>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipSchema>,
    /// How ids of this type are matched.
    #[serde(default)]
    pub key: KeyStrategy,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit an attribute.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.permitted_attributes.insert(name.into());
        self
    }

    /// Declare a to-one relationship.
    pub fn has_one(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(name, Cardinality::One, target_type)
    }

    /// Declare a to-many relationship.
    pub fn has_many(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(name, Cardinality::Many, target_type)
    }

    fn relationship(
        mut self,
        name: impl Into<String>,
        cardinality: Cardinality,
        target_type: impl Into<String>,
    ) -> Self {
        self.relationships.insert(
            name.into(),
            RelationshipSchema {
                cardinality,
                target_type: target_type.into(),
            },
        );
        self
    }

    /// Override the key strategy.
    pub fn key(mut self, key: KeyStrategy) -> Self {
        self.key = key;
        self
    }

    pub fn permits(&self, attribute: &str) -> bool {
        self.permitted_attributes.contains(attribute)
    }

    pub fn relationship_named(&self, name: &str) -> Option<&RelationshipSchema> {
        self.relationships.get(name)
    }
}

/// Named schemas, populated before binding starts.
///
/// By convention a resource type's schema is registered under the type name
/// itself; other names serve as per-call overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, returning any schema it replaced.
    pub fn register(&mut self, name: impl Into<String>, schema: Schema) -> Option<Schema> {
        self.schemas.insert(name.into(), schema)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.register(name, schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Key strategy declared for a type, or the default heuristic.
    pub fn key_strategy(&self, resource_type: &str) -> KeyStrategy {
        self.get(resource_type)
            .map(|schema| schema.key)
            .unwrap_or_default()
    }

    /// Find the schema governing `object`.
    ///
    /// An explicit `override_name` wins over the object's own resource type.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::SchemaNotFound` if nothing is registered
    /// under the chosen name.
    pub fn schema_for<M: Model>(
        &self,
        object: &M,
        override_name: Option<&str>,
    ) -> Result<&Schema, DiscoveryError> {
        let name = override_name.unwrap_or_else(|| object.resource_type());
        self.get(name).ok_or_else(|| DiscoveryError::SchemaNotFound {
            name: name.to_string(),
        })
    }
}
