//! Seams between the binder and the host application.
//!
//! The binder never reflects on objects. A [`Model`] answers capability
//! queries for its settable attributes and relationships, and a [`Store`]
//! finds or constructs models within a [`Scope`].

use serde_json::Value;

use crate::error::{AssignError, StoreError};
use crate::types::{Related, Scope};

/// A domain object that documents can be bound onto.
pub trait Model: Sized {
    /// Resource type name, e.g. `"people"`. Drives schema lookup by convention.
    fn resource_type(&self) -> &str;

    /// True once the object has been saved.
    fn is_persisted(&self) -> bool;

    /// Record a client-supplied external key on a newly built object.
    fn set_external_key(&mut self, key: &str);

    /// True if `name` is a settable attribute.
    fn has_attribute(&self, name: &str) -> bool;

    /// Set an attribute. Called only after `has_attribute(name)` returned true.
    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AssignError>;

    /// True if `name` is a settable relationship.
    fn has_relationship(&self, name: &str) -> bool;

    /// Replace a relationship. Called only after `has_relationship(name)`
    /// returned true; the object may still refuse the value.
    fn set_relationship(&mut self, name: &str, value: Related<Self>) -> Result<(), AssignError>;
}

/// Lookup and construction of models.
///
/// Every call is namespaced to a scope, so an object found or built through
/// an association scope is reachable through that association.
pub trait Store {
    type Object: Model;

    /// Find by primary (server-assigned) key.
    fn find_by_key(&self, scope: &Scope, key: &str) -> Result<Option<Self::Object>, StoreError>;

    /// Find by external (client-visible) key.
    fn find_by_external_key(
        &self,
        scope: &Scope,
        key: &str,
    ) -> Result<Option<Self::Object>, StoreError>;

    /// Build a new, unsaved object of the scope's element type.
    fn new_instance(&self, scope: &Scope) -> Result<Self::Object, StoreError>;
}
