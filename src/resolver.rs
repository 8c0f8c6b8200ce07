//! Object resolution - find an existing object for an id, or build a new one.

use tracing::debug;

use crate::error::StoreError;
use crate::model::{Model, Store};
use crate::schema::SchemaRegistry;
use crate::types::{KeyKind, Scope};

/// Finds or constructs the object a resource's `type` and `id` refer to.
pub struct ObjectResolver<'a, S: Store> {
    store: &'a S,
    registry: &'a SchemaRegistry,
}

impl<'a, S: Store> ObjectResolver<'a, S> {
    pub fn new(store: &'a S, registry: &'a SchemaRegistry) -> Self {
        Self { store, registry }
    }

    /// Resolve `resource_type` and `id`, optionally within `scope`.
    ///
    /// A supplied scope takes precedence over `resource_type`.
    ///
    /// - No id (or a blank one): a new, unsaved object.
    /// - External key: the existing object, or a new one carrying the key.
    /// - Primary key: the existing object, or `None`. Nothing is invented.
    ///
    /// Which key an id is depends on the type's [`KeyStrategy`](crate::KeyStrategy);
    /// by default ids containing a hyphen are external keys.
    ///
    /// # Errors
    ///
    /// Propagates `StoreError` from the underlying store.
    pub fn resolve(
        &self,
        resource_type: &str,
        id: Option<&str>,
        scope: Option<&Scope>,
    ) -> Result<Option<S::Object>, StoreError> {
        let scope = scope
            .cloned()
            .unwrap_or_else(|| Scope::new(resource_type));

        let Some(id) = id.filter(|id| !id.trim().is_empty()) else {
            debug!(resource_type = %scope.resource_type, "building new object");
            return self.store.new_instance(&scope).map(Some);
        };

        match self.registry.key_strategy(&scope.resource_type).classify(id) {
            KeyKind::External => {
                if let Some(found) = self.store.find_by_external_key(&scope, id)? {
                    debug!(resource_type = %scope.resource_type, id, "found by external key");
                    return Ok(Some(found));
                }
                debug!(resource_type = %scope.resource_type, id, "building object for external key");
                let mut object = self.store.new_instance(&scope)?;
                object.set_external_key(id);
                Ok(Some(object))
            }
            KeyKind::Primary => {
                let found = self.store.find_by_key(&scope, id)?;
                debug!(
                    resource_type = %scope.resource_type,
                    id,
                    found = found.is_some(),
                    "looked up by primary key"
                );
                Ok(found)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, ModelDefinition, Record};
    use crate::schema::Schema;
    use crate::types::KeyStrategy;

    const UUID: &str = "8f14e45f-ceea-467f-a0e6-8f1a2b3c4d5e";

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_model(
                "people",
                ModelDefinition::new()
                    .attribute("name")
                    .has_many("articles", "articles"),
            )
            .with_model("articles", ModelDefinition::new().has_one("person", "people"))
    }

    fn saved(store: &mut MemoryStore, resource_type: &str, uuid: Option<&str>) -> Record {
        let mut record = store.new_instance(&Scope::new(resource_type)).unwrap();
        if let Some(uuid) = uuid {
            record.set_external_key(uuid);
        }
        store.save(&mut record).unwrap();
        record
    }

    #[test]
    fn no_id_builds_new_object() {
        let store = store();
        let registry = SchemaRegistry::new();
        let resolver = ObjectResolver::new(&store, &registry);
        let object = resolver.resolve("people", None, None).unwrap().unwrap();
        assert!(!object.is_persisted());
        assert_eq!(object.resource_type(), "people");

        let object = resolver.resolve("people", Some(""), None).unwrap().unwrap();
        assert!(!object.is_persisted());
    }

    #[test]
    fn primary_key_found() {
        let mut store = store();
        let person = saved(&mut store, "people", None);
        let registry = SchemaRegistry::new();
        let resolver = ObjectResolver::new(&store, &registry);
        let id = person.id().unwrap().to_string();
        let found = resolver.resolve("people", Some(&id), None).unwrap();
        assert_eq!(found, Some(person));
    }

    #[test]
    fn primary_key_missing_is_none() {
        let store = store();
        let registry = SchemaRegistry::new();
        let resolver = ObjectResolver::new(&store, &registry);
        assert_eq!(resolver.resolve("people", Some("999"), None).unwrap(), None);
    }

    #[test]
    fn external_key_found() {
        let mut store = store();
        let person = saved(&mut store, "people", Some(UUID));
        let registry = SchemaRegistry::new();
        let resolver = ObjectResolver::new(&store, &registry);
        let found = resolver.resolve("people", Some(UUID), None).unwrap();
        assert_eq!(found, Some(person));
    }

    #[test]
    fn external_key_missing_builds_with_key() {
        let store = store();
        let registry = SchemaRegistry::new();
        let resolver = ObjectResolver::new(&store, &registry);
        let object = resolver.resolve("people", Some(UUID), None).unwrap().unwrap();
        assert!(!object.is_persisted());
        assert_eq!(object.external_key(), Some(UUID));
    }

    #[test]
    fn scope_type_takes_precedence() {
        let store = store();
        let registry = SchemaRegistry::new();
        let resolver = ObjectResolver::new(&store, &registry);
        let scope = Scope::new("articles");
        let object = resolver.resolve("people", None, Some(&scope)).unwrap().unwrap();
        assert_eq!(object.resource_type(), "articles");
    }

    #[test]
    fn scoped_lookup_only_sees_members() {
        let mut store = store();
        let mut person = saved(&mut store, "people", None);
        let owner_id = person.id().unwrap().to_string();
        let member = "0c5d-member";
        let outsider = "0c5d-outsider";
        saved(&mut store, "articles", Some(outsider));

        let mut article = store
            .new_instance(&Scope::new("articles").within("people", owner_id.clone(), "articles"))
            .unwrap();
        article.set_external_key(member);
        store.save(&mut article).unwrap();
        person = store.reload(&person).unwrap();
        assert_eq!(person.related("articles").unwrap().iter().count(), 1);

        let registry = SchemaRegistry::new();
        let resolver = ObjectResolver::new(&store, &registry);
        let scope = Scope::new("articles").within("people", owner_id, "articles");

        let found = resolver.resolve("articles", Some(member), Some(&scope)).unwrap().unwrap();
        assert!(found.is_persisted());

        // Not a member of the association: built fresh inside the scope instead.
        let built = resolver.resolve("articles", Some(outsider), Some(&scope)).unwrap().unwrap();
        assert!(!built.is_persisted());
        assert_eq!(built.owner(), scope.association.as_ref());
    }

    #[test]
    fn declared_strategy_overrides_heuristic() {
        let mut store = store();
        saved(&mut store, "people", Some("42"));
        let registry =
            SchemaRegistry::new().with("people", Schema::new().key(KeyStrategy::External));
        let resolver = ObjectResolver::new(&store, &registry);
        let found = resolver.resolve("people", Some("42"), None).unwrap().unwrap();
        assert!(found.is_persisted());
        assert_eq!(found.external_key(), Some("42"));
    }
}
