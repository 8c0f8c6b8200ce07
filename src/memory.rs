//! In-memory store and record model.
//!
//! [`MemoryStore`] is a reference [`Store`] for tests, fixtures, and the CLI.
//! Each resource type has a [`ModelDefinition`] listing its settable
//! attributes and relationships. Rows keep related objects as primary keys
//! on the owning side only; inverse relationships are not maintained.
//!
//! Fixtures serialise as:
//!
//! ```json
//! {
//!   "models": {
//!     "people": {
//!       "attributes": ["name"],
//!       "relationships": { "articles": { "cardinality": "many", "type": "articles" } }
//!     }
//!   },
//!   "records": {
//!     "people": { "1": { "uuid": "6d1f-...", "attributes": { "name": "Ben" }, "relationships": { "articles": [2] } } }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{AssignError, StoreError};
use crate::model::{Model, Store};
use crate::schema::RelationshipSchema;
use crate::types::{Association, Cardinality, Related, Scope};

/// Settable fields of one stored resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub attributes: BTreeSet<String>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipSchema>,
}

impl ModelDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into());
        self
    }

    pub fn has_one(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(name, Cardinality::One, target_type)
    }

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
}

/// A stored or newly built resource.
///
/// Related records are loaded one level deep: their own relationships read
/// as empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    resource_type: String,
    id: Option<u64>,
    external_key: Option<String>,
    attributes: Map<String, Value>,
    relationships: BTreeMap<String, Related<Record>>,
    owner: Option<Association>,
    definition: Arc<ModelDefinition>,
}

impl Record {
    /// A new, unsaved record with every relationship empty.
    pub fn new(resource_type: impl Into<String>, definition: Arc<ModelDefinition>) -> Self {
        let relationships = definition
            .relationships
            .iter()
            .map(|(name, rel)| {
                let empty = match rel.cardinality {
                    Cardinality::One => Related::One(None),
                    Cardinality::Many => Related::Many(Vec::new()),
                };
                (name.clone(), empty)
            })
            .collect();
        Self {
            resource_type: resource_type.into(),
            id: None,
            external_key: None,
            attributes: Map::new(),
            relationships,
            owner: None,
            definition,
        }
    }

    /// Primary key, once saved.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn external_key(&self) -> Option<&str> {
        self.external_key.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn related(&self, name: &str) -> Option<&Related<Record>> {
        self.relationships.get(name)
    }

    /// Association this record will be linked into when saved.
    pub fn owner(&self) -> Option<&Association> {
        self.owner.as_ref()
    }

    /// The id clients see: the external key if there is one, else the primary key.
    pub fn document_id(&self) -> Option<String> {
        self.external_key
            .clone()
            .or_else(|| self.id.map(|id| id.to_string()))
    }

    /// A `{type, id}` resource identifier for this record.
    pub fn identifier(&self) -> Value {
        let mut identifier = Map::new();
        identifier.insert("type".into(), Value::String(self.resource_type.clone()));
        if let Some(id) = self.document_id() {
            identifier.insert("id".into(), Value::String(id));
        }
        Value::Object(identifier)
    }

    /// Serialise as a resource document, with related records as identifiers.
    pub fn to_document(&self) -> Value {
        let mut data = match self.identifier() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        data.insert("attributes".into(), Value::Object(self.attributes.clone()));

        let relationships: Map<String, Value> = self
            .relationships
            .iter()
            .map(|(name, related)| {
                let linkage = match related {
                    Related::One(None) => Value::Null,
                    Related::One(Some(record)) => record.identifier(),
                    Related::Many(records) => {
                        Value::Array(records.iter().map(Record::identifier).collect())
                    }
                };
                (name.clone(), json!({ "data": linkage }))
            })
            .collect();
        data.insert("relationships".into(), Value::Object(relationships));

        json!({ "data": data })
    }
}

impl Model for Record {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    fn set_external_key(&mut self, key: &str) {
        self.external_key = Some(key.to_string());
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.definition.attributes.contains(name)
    }

    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AssignError> {
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn has_relationship(&self, name: &str) -> bool {
        self.definition.relationships.contains_key(name)
    }

    fn set_relationship(&mut self, name: &str, value: Related<Self>) -> Result<(), AssignError> {
        let rel = self
            .definition
            .relationships
            .get(name)
            .ok_or_else(|| AssignError(format!("no relationship '{}'", name)))?;

        if value.cardinality() != rel.cardinality {
            return Err(AssignError(match rel.cardinality {
                Cardinality::One => "expected a single related object, got a list".to_string(),
                Cardinality::Many => "expected a list of related objects".to_string(),
            }));
        }
        if let Some(other) = value.iter().find(|r| r.resource_type != rel.target_type) {
            return Err(AssignError(format!(
                "expected '{}', got '{}'",
                rel.target_type, other.resource_type
            )));
        }

        self.relationships.insert(name.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum Link {
    Many(Vec<u64>),
    One(Option<u64>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    relationships: BTreeMap<String, Link>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFixture {
    #[serde(default)]
    models: BTreeMap<String, ModelDefinition>,
    #[serde(default)]
    records: BTreeMap<String, BTreeMap<u64, Row>>,
}

/// A [`Store`] holding rows in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoreFixture", into = "StoreFixture")]
pub struct MemoryStore {
    models: BTreeMap<String, Arc<ModelDefinition>>,
    rows: BTreeMap<String, BTreeMap<u64, Row>>,
    next_id: u64,
}

impl From<StoreFixture> for MemoryStore {
    fn from(fixture: StoreFixture) -> Self {
        let next_id = fixture
            .records
            .values()
            .flat_map(|rows| rows.keys())
            .max()
            .map_or(1, |max| max + 1);
        Self {
            models: fixture
                .models
                .into_iter()
                .map(|(name, def)| (name, Arc::new(def)))
                .collect(),
            rows: fixture.records,
            next_id,
        }
    }
}

impl From<MemoryStore> for StoreFixture {
    fn from(store: MemoryStore) -> Self {
        Self {
            models: store
                .models
                .into_iter()
                .map(|(name, def)| (name, ModelDefinition::clone(&def)))
                .collect(),
            records: store.rows,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            models: BTreeMap::new(),
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Define (or redefine) a resource type.
    pub fn define(&mut self, resource_type: impl Into<String>, definition: ModelDefinition) {
        self.models.insert(resource_type.into(), Arc::new(definition));
    }

    /// Builder form of [`define`](Self::define).
    pub fn with_model(mut self, resource_type: impl Into<String>, definition: ModelDefinition) -> Self {
        self.define(resource_type, definition);
        self
    }

    /// Number of stored rows of a type.
    pub fn count(&self, resource_type: &str) -> usize {
        self.rows.get(resource_type).map_or(0, BTreeMap::len)
    }

    /// Load the stored state of a saved record.
    pub fn reload(&self, record: &Record) -> Option<Record> {
        self.materialize(&record.resource_type, record.id?, true)
    }

    /// Persist a record, returning its primary key.
    ///
    /// Unsaved related records are saved first. A record built inside an
    /// association scope is linked into that association.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the type is unknown or the owning association
    /// no longer resolves.
    pub fn save(&mut self, record: &mut Record) -> Result<u64, StoreError> {
        self.definition(&record.resource_type)?;

        let mut links = BTreeMap::new();
        for (name, related) in record.relationships.iter_mut() {
            let link = match related {
                Related::One(None) => Link::One(None),
                Related::One(Some(other)) => Link::One(Some(self.save_related(other)?)),
                Related::Many(others) => Link::Many(
                    others
                        .iter_mut()
                        .map(|other| self.save_related(other))
                        .collect::<Result<_, _>>()?,
                ),
            };
            links.insert(name.clone(), link);
        }

        let id = match record.id {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };

        let table = self.rows.entry(record.resource_type.clone()).or_default();
        let row = table.entry(id).or_default();
        row.uuid = record.external_key.clone();
        row.attributes = record.attributes.clone();
        row.relationships.extend(links);
        record.id = Some(id);
        debug!(resource_type = %record.resource_type, id, "saved record");

        if let Some(association) = record.owner.take() {
            self.link_member(&association, id)?;
        }
        Ok(id)
    }

    fn save_related(&mut self, record: &mut Record) -> Result<u64, StoreError> {
        match record.id {
            Some(id) => Ok(id),
            None => self.save(record),
        }
    }

    fn definition(&self, resource_type: &str) -> Result<&Arc<ModelDefinition>, StoreError> {
        self.models
            .get(resource_type)
            .ok_or_else(|| StoreError::UnknownType(resource_type.to_string()))
    }

    fn owner_row(&self, association: &Association) -> Result<(u64, &Row), StoreError> {
        let owner_def = self.definition(&association.owner_type)?;
        if !owner_def
            .relationships
            .contains_key(&association.relationship)
        {
            return Err(StoreError::UnknownAssociation {
                owner_type: association.owner_type.clone(),
                relationship: association.relationship.clone(),
            });
        }
        let not_found = || StoreError::OwnerNotFound {
            resource_type: association.owner_type.clone(),
            id: association.owner_id.clone(),
        };
        let owner_id: u64 = association.owner_id.parse().map_err(|_| not_found())?;
        self.rows
            .get(&association.owner_type)
            .and_then(|table| table.get(&owner_id))
            .map(|row| (owner_id, row))
            .ok_or_else(not_found)
    }

    /// Primary keys visible through a scope, or `None` for the whole table.
    fn members(&self, scope: &Scope) -> Result<Option<Vec<u64>>, StoreError> {
        let Some(association) = &scope.association else {
            return Ok(None);
        };
        let (_, row) = self.owner_row(association)?;
        let ids = match row.relationships.get(&association.relationship) {
            Some(Link::Many(ids)) => ids.clone(),
            Some(Link::One(id)) => id.iter().copied().collect(),
            None => Vec::new(),
        };
        Ok(Some(ids))
    }

    fn link_member(&mut self, association: &Association, id: u64) -> Result<(), StoreError> {
        let (owner_id, _) = self.owner_row(association)?;
        let cardinality = self
            .definition(&association.owner_type)?
            .relationships
            .get(&association.relationship)
            .map(|rel| rel.cardinality);

        let row = self
            .rows
            .get_mut(&association.owner_type)
            .and_then(|table| table.get_mut(&owner_id))
            .ok_or_else(|| StoreError::OwnerNotFound {
                resource_type: association.owner_type.clone(),
                id: association.owner_id.clone(),
            })?;

        let link = row
            .relationships
            .entry(association.relationship.clone())
            .or_insert_with(|| match cardinality {
                Some(Cardinality::One) => Link::One(None),
                _ => Link::Many(Vec::new()),
            });
        match link {
            Link::Many(ids) if !ids.contains(&id) => ids.push(id),
            Link::Many(_) => {}
            Link::One(slot) => *slot = Some(id),
        }
        Ok(())
    }

    fn materialize(&self, resource_type: &str, id: u64, deep: bool) -> Option<Record> {
        let row = self.rows.get(resource_type)?.get(&id)?;
        let definition = Arc::clone(self.models.get(resource_type)?);
        let mut record = Record::new(resource_type, Arc::clone(&definition));
        record.id = Some(id);
        record.external_key = row.uuid.clone();
        record.attributes = row.attributes.clone();

        if deep {
            for (name, rel) in &definition.relationships {
                let related = match (rel.cardinality, row.relationships.get(name)) {
                    (Cardinality::One, Some(Link::One(Some(other)))) => Related::One(
                        self.materialize(&rel.target_type, *other, false),
                    ),
                    (Cardinality::One, _) => Related::One(None),
                    (Cardinality::Many, Some(Link::Many(others))) => Related::Many(
                        others
                            .iter()
                            .filter_map(|other| self.materialize(&rel.target_type, *other, false))
                            .collect(),
                    ),
                    (Cardinality::Many, _) => Related::Many(Vec::new()),
                };
                record.relationships.insert(name.clone(), related);
            }
        }
        Some(record)
    }

    fn find_where<F>(&self, scope: &Scope, matches: F) -> Result<Option<Record>, StoreError>
    where
        F: Fn(u64, &Row) -> bool,
    {
        self.definition(&scope.resource_type)?;
        let members = self.members(scope)?;
        let Some(table) = self.rows.get(&scope.resource_type) else {
            return Ok(None);
        };
        let found = table.iter().find(|(id, row)| {
            matches(**id, *row) && members.as_ref().map_or(true, |ids| ids.contains(*id))
        });
        Ok(found.and_then(|(id, _)| self.materialize(&scope.resource_type, *id, true)))
    }
}

impl Store for MemoryStore {
    type Object = Record;

    fn find_by_key(&self, scope: &Scope, key: &str) -> Result<Option<Record>, StoreError> {
        let Ok(key) = key.parse::<u64>() else {
            self.definition(&scope.resource_type)?;
            return Ok(None);
        };
        self.find_where(scope, |id, _| id == key)
    }

    fn find_by_external_key(&self, scope: &Scope, key: &str) -> Result<Option<Record>, StoreError> {
        self.find_where(scope, |_, row| row.uuid.as_deref() == Some(key))
    }

    fn new_instance(&self, scope: &Scope) -> Result<Record, StoreError> {
        let definition = Arc::clone(self.definition(&scope.resource_type)?);
        if let Some(association) = &scope.association {
            self.owner_row(association)?;
        }
        let mut record = Record::new(scope.resource_type.clone(), definition);
        record.owner = scope.association.clone();
        Ok(record)
    }
}
