//! Persistence collaborator contracts
//!
//! A form tree needs three things from the persistence layer: association
//! metadata ([`AssociationCatalog`]), association accessors
//! ([`AssociationAccess`]) and an all-or-nothing write scope
//! ([`Persistence`]). [`Backend`] bundles them.

use crate::model::{Model, RecordId};
use crate::reflection::AssociationCatalog;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
	#[error("transaction error: {0}")]
	Transaction(String),
	#[error("write failed for {model}: {reason}")]
	Write { model: String, reason: String },
	#[error("query failed: {0}")]
	Query(String),
}

/// Reads and builds associated records.
pub trait AssociationAccess {
	/// The record currently associated through a to-one association.
	fn load_one(
		&self,
		parent: &dyn Model,
		association: &str,
	) -> Result<Option<Box<dyn Model>>, PersistenceError>;

	/// Records currently associated through a to-many association, in
	/// persisted order.
	fn load_many(
		&self,
		parent: &dyn Model,
		association: &str,
	) -> Result<Vec<Box<dyn Model>>, PersistenceError>;

	/// A new, unsaved target record attached to `parent` through
	/// `association`.
	fn build(
		&self,
		parent: &dyn Model,
		association: &str,
	) -> Result<Box<dyn Model>, PersistenceError>;
}

/// One open write scope. Dropping a transaction without committing must
/// leave storage unchanged.
pub trait Transaction {
	/// Store a new record and return its assigned identifier. The model
	/// itself is not updated; the form marks it persisted after commit.
	fn insert(&mut self, model: &dyn Model) -> Result<RecordId, PersistenceError>;

	fn update(&mut self, model: &dyn Model) -> Result<(), PersistenceError>;

	/// Remove a stored record, including whatever the persistence layer
	/// cascades from it.
	fn destroy(&mut self, model: &dyn Model) -> Result<(), PersistenceError>;

	fn commit(self: Box<Self>) -> Result<(), PersistenceError>;

	fn rollback(self: Box<Self>) -> Result<(), PersistenceError>;
}

/// Opens transactions.
pub trait Persistence {
	fn begin(&self) -> Result<Box<dyn Transaction + '_>, PersistenceError>;
}

/// Everything a form tree needs from the persistence layer.
pub trait Backend: AssociationCatalog + AssociationAccess + Persistence {}

impl<T> Backend for T where T: AssociationCatalog + AssociationAccess + Persistence {}
