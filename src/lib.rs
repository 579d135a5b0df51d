//! # Arbor
//!
//! Nested form objects for Rust web applications.
//!
//! One form stands for a root record together with its associated records:
//! one-to-one and one-to-many associations, nested to any depth. The form
//! accepts a nested submission, reconciles it with the stored rows (rows
//! added and removed on the client included), validates every branch with
//! association-qualified error keys and saves the whole tree inside one
//! transaction.
//!
//! ## Feature Flags
//!
//! - `test` - Testing utilities: an in-memory persistence layer, fixtures
//!   and mocks (re-exported as [`test`](crate::test))
//!
//! ## Quick Example
//!
//! ```
//! use arbor::prelude::*;
//! use arbor_test::MemoryStore;
//! use serde_json::json;
//!
//! let store = MemoryStore::reference();
//! let schema = FormSchema::new()
//!     .for_model("User")
//!     .required_attributes(["name"])
//!     .association("email", FormSchema::new().required_attributes(["address"]));
//!
//! let mut form = RootForm::new(store.new_record("User"), schema, store.backend()).unwrap();
//! form.submit(&json!({ "name": "Petros", "email_attributes": { "address": "" } }))
//!     .unwrap();
//!
//! assert!(!form.save().unwrap());
//! assert!(form.errors().includes("email.address", "can't be blank"));
//! ```

pub use arbor_forms::*;

#[cfg(feature = "test")]
pub mod test;

/// Prelude module for convenient imports
pub mod prelude {
	pub use crate::{
		AssociationOptions, Errors, FormError, FormNode, FormNodeCollection, FormResult,
		FormSchema, FormSettings, Model, RejectScope, RootForm, Rule, UnpermittedPolicy,
	};
}
