//! # Arbor Test
//!
//! Testing utilities for Arbor forms.
//!
//! ## Overview
//!
//! - **[`MemoryStore`]**: in-memory persistence implementing every
//!   collaborator contract a form tree needs, with fault injection
//! - **[`SchemaRegistry`]**: model declarations served by a store, including
//!   the reference domains used across the test suites
//! - **[`fixtures`]**: rstest fixtures and form schemas for those domains
//! - **[`mock`]**: `mockall` mocks of the model and catalog contracts
//! - **[`logging`]**: one-time `tracing` initialization for tests
//!
//! ## Quick Start
//!
//! ```
//! use arbor_forms::RootForm;
//! use arbor_test::MemoryStore;
//! use arbor_test::fixtures::survey_form;
//! use serde_json::json;
//!
//! let store = MemoryStore::reference();
//! let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();
//!
//! form.submit(&json!({ "name": "Lunch" })).unwrap();
//! assert!(!form.is_valid());
//! assert!(form.errors().includes("questions.content", "can't be blank"));
//! ```

pub mod fixtures;
pub mod logging;
pub mod mock;
pub mod record;
pub mod schema;
pub mod store;

pub use record::{MemoryRecord, Row};
pub use schema::{AssociationSchema, ModelSchema, ModelValidation, SchemaRegistry};
pub use store::{MemoryStore, MemoryTransaction, Seeded};
