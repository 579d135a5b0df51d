//! Nested form objects for Arbor
//!
//! One form stands for a root record together with its associated records.
//! This crate provides:
//! - Declarative form schemas mirroring a graph of model associations
//! - Lazy materialization of nested nodes: stored records are reused, missing
//!   ones are built
//! - Reconciliation of nested submissions, including rows added and removed
//!   on the client
//! - Validation aggregated across the tree under association-qualified keys
//! - Saving the whole tree inside one transaction
//!
//! Forms never define models or talk to storage directly. The persistence
//! layer plugs in through [`Model`] and [`Backend`].
//!
//! # Examples
//!
//! ```
//! use arbor_forms::{AssociationOptions, FormSchema, RootForm};
//! use arbor_test::MemoryStore;
//! use serde_json::json;
//!
//! let store = MemoryStore::reference();
//! let schema = FormSchema::new()
//!     .for_model("Project")
//!     .required_attributes(["name"])
//!     .association_with(
//!         "tasks",
//!         AssociationOptions::new().records(3),
//!         FormSchema::new().required_attributes(["name"]).attribute("description"),
//!     );
//!
//! let mut form = RootForm::new(store.new_record("Project"), schema, store.backend()).unwrap();
//! form.submit(&json!({
//!     "name": "Launch",
//!     "tasks_attributes": {
//!         "0": { "name": "Plan" },
//!         "1": { "name": "Build" },
//!         "2": { "name": "Ship" }
//!     }
//! }))
//! .unwrap();
//!
//! assert!(form.save().unwrap());
//! assert_eq!(store.count("Project"), 1);
//! assert_eq!(store.count("Task"), 3);
//! ```

pub mod attribute;
pub mod backend;
mod branch;
pub mod collection;
pub mod context;
pub mod definition;
pub mod error;
pub mod errors;
pub mod model;
pub mod node;
pub mod params;
pub mod reflection;
pub mod root;
pub mod schema;
pub mod settings;
pub mod validators;

#[cfg(test)]
mod testing;

pub use attribute::{AttributeDef, AttributeDelegate, AttributeWhitelist, Getter, Setter};
pub use backend::{AssociationAccess, Backend, Persistence, PersistenceError, Transaction};
pub use collection::FormNodeCollection;
pub use context::FormContext;
pub use definition::FormNodeDefinition;
pub use error::{ConfigurationError, FormError, FormResult};
pub use errors::{BASE_KEY, Errors};
pub use model::{Model, ModelError, RecordId};
pub use node::{FormChild, FormNode};
pub use params::Params;
pub use reflection::{AssociationCatalog, AssociationKind, Cardinality, Reflection};
pub use root::RootForm;
pub use schema::{AssociationOptions, FormSchema, RejectIf};
pub use settings::{FormSettings, RejectScope, SettingsError, UnpermittedPolicy};
pub use validators::Rule;
