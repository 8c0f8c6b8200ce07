//! JSON:API resource binding
//!
//! Resolves an incoming JSON:API resource document onto domain objects.
//!
//! A bind finds or builds the root object from `data.type` and `data.id`,
//! assigns the document's attributes and relationships through the object's
//! declared capabilities, and returns the object unsaved. What a bind may
//! touch is governed by a [`Schema`] looked up by name in a [`SchemaRegistry`].
//!
//! # Example
//!
//! ```
//! use jsonapi_bind::{
//!     bind, BindOptions, MemoryStore, ModelDefinition, Schema, SchemaRegistry,
//! };
//! use serde_json::json;
//!
//! let store = MemoryStore::new()
//!     .with_model("people", ModelDefinition::new().attribute("name"));
//! let registry = SchemaRegistry::new().with("people", Schema::new().attribute("name"));
//!
//! let document = json!({
//!     "data": { "type": "people", "attributes": { "name": "Ben" } }
//! });
//! let person = bind(&store, &registry, &document, &BindOptions::new()).unwrap();
//!
//! assert_eq!(person.attribute("name"), Some(&json!("Ben")));
//! ```
//!
//! # Identifying objects
//!
//! | `id` | Lookup | On miss |
//! |------|--------|---------|
//! | absent or blank | none | new object |
//! | contains `-` | external key | new object carrying the key |
//! | anything else | primary key | `BindError::NotFound` |
//!
//! A schema may pin the lookup with `"key": "primary"` or `"key": "external"`.
//!
//! # Include paths
//!
//! ```
//! use jsonapi_bind::compile_includes;
//!
//! let includes = compile_includes("author, comments, comments.author");
//! let rendered = serde_json::to_value(&includes).unwrap();
//! assert_eq!(rendered, serde_json::json!(["author", { "comments": "author" }]));
//! ```

mod binder;
mod document;
mod error;
mod includes;
mod loader;
mod memory;
mod model;
mod resolver;
mod schema;
mod types;
mod validator;

pub use binder::{bind, Binder};
pub use document::{RelationshipData, ResourceData};
pub use error::{
    AssignError, BindError, DiscoveryError, LoadError, StoreError, ValidationError,
};
pub use includes::{compile_includes, IncludePath};
pub use loader::{
    is_url, load_document, load_document_str, load_json, load_json_auto, load_registry,
    load_store, save_store,
};
pub use memory::{MemoryStore, ModelDefinition, Record};
pub use model::{Model, Store};
pub use resolver::ObjectResolver;
pub use schema::{RelationshipSchema, Schema, SchemaRegistry};
pub use types::{
    is_blank, Association, BindOptions, Cardinality, KeyKind, KeyStrategy,
    Related, Scope, DEFAULT_MAX_DEPTH, MEDIA_TYPE,
};
pub use validator::{validate_document, validate_identifier, validate_nested};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
