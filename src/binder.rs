//! Binding - resolve a resource document onto a domain object.
//!
//! The root object is found or built from `data.type` and `data.id`, then the
//! document's attributes and relationships are assigned to it in document
//! order. Relationship entries are either identifiers (looked up) or full
//! nested resources (bound recursively, each by its own declared type).
//!
//! Binding stops at the first violation. Assignments made before the failing
//! step are not rolled back; nothing is saved either way.

use serde_json::Value;
use tracing::{debug, debug_span, trace, warn};

use crate::document::{RelationshipData, ResourceData};
use crate::error::{BindError, DiscoveryError, ValidationError};
use crate::model::{Model, Store};
use crate::resolver::ObjectResolver;
use crate::schema::{Schema, SchemaRegistry};
use crate::types::{is_blank, BindOptions, Cardinality, Related, Scope, DEFAULT_MAX_DEPTH};
use crate::validator::{validate_document, validate_identifier, validate_nested};

/// Bind `document` with a one-off [`Binder`].
///
/// # Errors
///
/// See [`Binder::bind`].
pub fn bind<S: Store>(
    store: &S,
    registry: &SchemaRegistry,
    document: &Value,
    options: &BindOptions,
) -> Result<S::Object, BindError> {
    Binder::new(store, registry).bind(document, options)
}

/// Binds resource documents against a store and a schema registry.
pub struct Binder<'a, S: Store> {
    store: &'a S,
    registry: &'a SchemaRegistry,
    max_depth: usize,
}

/// Options for nested invocations: caller options apply to the root only.
static NESTED: BindOptions = BindOptions {
    scope: None,
    schema: None,
    permitted: Vec::new(),
};

/// The schema of one invocation, looked up on first use.
struct SchemaSlot<'r, 'o> {
    registry: &'r SchemaRegistry,
    override_name: Option<&'o str>,
    resolved: Option<&'r Schema>,
}

impl<'r, 'o> SchemaSlot<'r, 'o> {
    fn new(registry: &'r SchemaRegistry, override_name: Option<&'o str>) -> Self {
        Self {
            registry,
            override_name,
            resolved: None,
        }
    }

    fn get<M: Model>(&mut self, object: &M) -> Result<&'r Schema, DiscoveryError> {
        if let Some(schema) = self.resolved {
            return Ok(schema);
        }
        let schema = self.registry.schema_for(object, self.override_name)?;
        self.resolved = Some(schema);
        Ok(schema)
    }
}

impl<'a, S: Store> Binder<'a, S> {
    pub fn new(store: &'a S, registry: &'a SchemaRegistry) -> Self {
        Self {
            store,
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deeply nested resources may be bound.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Bind a resource document, returning the resolved root object.
    ///
    /// # Errors
    ///
    /// - `BindError::Validation` if the document or a relationship entry is malformed.
    /// - `BindError::UnknownAttribute` if an attribute is neither permitted by the
    ///   schema nor allow-listed in `options`, or the object cannot set it.
    /// - `BindError::UnknownRelationship` if a relationship is undeclared or the
    ///   object cannot set it.
    /// - `BindError::Discovery` if no schema is registered for a bound object.
    /// - `BindError::NotFound` if a primary key matches nothing.
    /// - `BindError::Assign` if the object's setter refuses a value.
    /// - `BindError::TooDeep` if nesting exceeds [`max_depth`](Self::max_depth).
    pub fn bind(&self, document: &Value, options: &BindOptions) -> Result<S::Object, BindError> {
        validate_document(document)?;
        let data = document
            .get("data")
            .and_then(ResourceData::from_value)
            .ok_or_else(|| ValidationError::new(["data"]))?;

        self.bind_resource(data, options, 0)
    }

    fn bind_resource(
        &self,
        data: ResourceData<'_>,
        options: &BindOptions,
        depth: usize,
    ) -> Result<S::Object, BindError> {
        if depth > self.max_depth {
            return Err(BindError::TooDeep {
                limit: self.max_depth,
            });
        }
        let span = debug_span!("bind", resource_type = data.resource_type, depth);
        let _enter = span.enter();

        let mut object = self.resolve(data.resource_type, data.id, options.scope.as_ref())?;
        let mut schema = SchemaSlot::new(self.registry, options.schema.as_deref());

        self.assign_attributes(&mut object, &data, &mut schema, options)?;
        self.assign_relationships(&mut object, &data, &mut schema, depth)?;
        Ok(object)
    }

    fn resolve(
        &self,
        resource_type: &str,
        id: Option<&str>,
        scope: Option<&Scope>,
    ) -> Result<S::Object, BindError> {
        ObjectResolver::new(self.store, self.registry)
            .resolve(resource_type, id, scope)?
            .ok_or_else(|| BindError::NotFound {
                resource_type: scope
                    .map_or(resource_type, |s| s.resource_type.as_str())
                    .to_string(),
                id: id.unwrap_or_default().to_string(),
            })
    }

    fn assign_attributes(
        &self,
        object: &mut S::Object,
        data: &ResourceData<'_>,
        schema: &mut SchemaSlot<'_, '_>,
        options: &BindOptions,
    ) -> Result<(), BindError> {
        for (name, value) in data.attributes() {
            let permitted = schema.get(&*object)?.permits(name) || options.is_permitted(name);
            if !permitted || !object.has_attribute(name) {
                warn!(resource_type = object.resource_type(), attribute = %name, permitted, "unknown attribute");
                return Err(BindError::UnknownAttribute {
                    resource_type: object.resource_type().to_string(),
                    attribute: name.clone(),
                });
            }
            object
                .set_attribute(name, value.clone())
                .map_err(|source| BindError::Assign {
                    resource_type: object.resource_type().to_string(),
                    name: name.clone(),
                    source,
                })?;
            debug!(attribute = %name, "assigned attribute");
        }
        Ok(())
    }

    fn assign_relationships(
        &self,
        object: &mut S::Object,
        data: &ResourceData<'_>,
        schema: &mut SchemaSlot<'_, '_>,
        depth: usize,
    ) -> Result<(), BindError> {
        for (name, rel) in data.relationships() {
            if let RelationshipData::Absent = rel {
                trace!(relationship = %name, "no data, skipping");
                continue;
            }

            let cardinality = schema
                .get(&*object)?
                .relationship_named(name)
                .map(|declared| declared.cardinality)
                .ok_or_else(|| unknown_relationship(&*object, name))?;

            let related = match rel {
                RelationshipData::Absent => continue,
                RelationshipData::Null => match cardinality {
                    Cardinality::One => Related::One(None),
                    Cardinality::Many => Related::Many(Vec::new()),
                },
                RelationshipData::Many(items) => Related::Many(
                    items
                        .iter()
                        .filter(|item| !is_blank(item))
                        .map(|item| self.resolve_related(item, depth))
                        .collect::<Result<_, _>>()?,
                ),
                RelationshipData::One(item) => Related::One(Some(self.resolve_related(item, depth)?)),
            };

            if !object.has_relationship(name) {
                warn!(resource_type = object.resource_type(), relationship = %name, "relationship not settable");
                return Err(unknown_relationship(&*object, name));
            }
            object
                .set_relationship(name, related)
                .map_err(|source| BindError::Assign {
                    resource_type: object.resource_type().to_string(),
                    name: name.clone(),
                    source,
                })?;
            debug!(relationship = %name, "assigned relationship");
        }
        Ok(())
    }

    /// Look up an identifier, or bind a full nested resource one level deeper.
    fn resolve_related(&self, item: &Value, depth: usize) -> Result<S::Object, BindError> {
        if ResourceData::is_full_resource(item) {
            validate_nested(item)?;
            let data = ResourceData::from_value(item).ok_or_else(|| ValidationError::new(["data"]))?;
            return self.bind_resource(data, &NESTED, depth + 1);
        }

        validate_identifier(item)?;
        let identifier = ResourceData::from_value(item).ok_or_else(|| ValidationError::new(["type"]))?;
        self.resolve(identifier.resource_type, identifier.id, None)
    }
}

fn unknown_relationship<M: Model>(object: &M, name: &str) -> BindError {
    BindError::UnknownRelationship {
        resource_type: object.resource_type().to_string(),
        relationship: name.to_string(),
    }
}
