//! Core types shared by the binder and its collaborators.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Media type registered for JSON:API payloads.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Default limit on nested resource documents within one bind.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// True for values a client sends to mean "nothing here".
///
/// `null`, `false`, whitespace-only strings, and empty arrays or objects are blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// At most one related object or null.
    One,
    /// A sequence of related objects.
    Many,
}

/// How a resource `id` is matched against stored objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Ids containing a hyphen are external keys, all others primary keys.
    #[default]
    Auto,
    /// Every id is a primary key.
    Primary,
    /// Every id is an external key.
    External,
}

/// Which key a given id should be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Primary,
    External,
}

impl KeyStrategy {
    /// Classify an id under this strategy.
    pub fn classify(&self, id: &str) -> KeyKind {
        match self {
            KeyStrategy::Primary => KeyKind::Primary,
            KeyStrategy::External => KeyKind::External,
            KeyStrategy::Auto if id.contains('-') => KeyKind::External,
            KeyStrategy::Auto => KeyKind::Primary,
        }
    }
}

/// A resolved relationship value handed to a domain object's setter.
#[derive(Debug, Clone, PartialEq)]
pub enum Related<T> {
    One(Option<T>),
    Many(Vec<T>),
}

impl<T> Related<T> {
    /// The cardinality this value was built for.
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Related::One(_) => Cardinality::One,
            Related::Many(_) => Cardinality::Many,
        }
    }

    /// Iterate over the related objects, whatever the cardinality.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (one, many) = match self {
            Related::One(obj) => (obj.as_ref(), &[][..]),
            Related::Many(objs) => (None, objs.as_slice()),
        };
        one.into_iter().chain(many.iter())
    }
}

/// An owning association a scope is restricted to, e.g. the `articles` of person `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Association {
    pub owner_type: String,
    pub owner_id: String,
    pub relationship: String,
}

/// Collection that lookups and constructions are namespaced to.
///
/// A scope names the element type of the collection and, optionally, the
/// association it belongs to. Objects found or built through a scope are
/// reachable through that association.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub resource_type: String,
    pub association: Option<Association>,
}

impl Scope {
    /// The default collection for a type.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            association: None,
        }
    }

    /// Restrict the scope to the members of an owner's relationship.
    pub fn within(
        mut self,
        owner_type: impl Into<String>,
        owner_id: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        self.association = Some(Association {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
            relationship: relationship.into(),
        });
        self
    }
}

/// Options for a single bind call.
#[derive(Debug, Clone, Default)]
pub struct BindOptions {
    /// Collection the root object is found in or built from.
    pub scope: Option<Scope>,
    /// Name of a registered schema to use instead of the root type's own.
    pub schema: Option<String>,
    /// Transient attribute names allowed in addition to the schema's.
    pub permitted: Vec<String>,
}

impl BindOptions {
    /// Options with no scope, no override and no transient attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope the root object.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Use a named schema for the root object.
    pub fn schema(mut self, name: impl Into<String>) -> Self {
        self.schema = Some(name.into());
        self
    }

    /// Allow extra attribute names, such as one-time secrets.
    pub fn permit<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.permitted.extend(names.into_iter().map(Into::into));
        self
    }

    /// True if `name` is in the transient allow-list.
    pub fn is_permitted(&self, name: &str) -> bool {
        self.permitted.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_values() {
        assert!(is_blank(&json!(null)));
        assert!(is_blank(&json!(false)));
        assert!(is_blank(&json!("  ")));
        assert!(is_blank(&json!([])));
        assert!(is_blank(&json!({})));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!({ "id": "1" })));
    }

    #[test]
    fn auto_strategy_uses_hyphen() {
        let auto = KeyStrategy::Auto;
        assert_eq!(auto.classify("4f1c-9a"), KeyKind::External);
        assert_eq!(auto.classify("42"), KeyKind::Primary);
    }

    #[test]
    fn explicit_strategies_ignore_shape() {
        assert_eq!(KeyStrategy::Primary.classify("a-b"), KeyKind::Primary);
        assert_eq!(KeyStrategy::External.classify("42"), KeyKind::External);
    }

    #[test]
    fn related_iter_covers_both_cardinalities() {
        assert_eq!(Related::One(Some(1)).iter().count(), 1);
        assert_eq!(Related::<u8>::One(None).iter().count(), 0);
        assert_eq!(Related::Many(vec![1, 2, 2]).iter().copied().collect::<Vec<_>>(), vec![1, 2, 2]);
    }

    #[test]
    fn bind_options_builder() {
        let opts = BindOptions::new()
            .scope(Scope::new("articles").within("people", "1", "articles"))
            .schema("alternate_people")
            .permit(["password"]);
        assert_eq!(opts.schema.as_deref(), Some("alternate_people"));
        assert!(opts.is_permitted("password"));
        assert!(!opts.is_permitted("name"));
        let scope = opts.scope.unwrap();
        assert_eq!(scope.association.unwrap().relationship, "articles");
    }
}
