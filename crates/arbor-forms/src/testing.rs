//! Mocks shared by the unit tests of this crate.

use crate::backend::{AssociationAccess, Persistence, PersistenceError, Transaction};
use crate::context::FormContext;
use crate::errors::Errors;
use crate::model::{Model, ModelError, RecordId};
use crate::reflection::{AssociationCatalog, AssociationKind, Reflection};
use mockall::mock;
use serde_json::Value;
use std::rc::Rc;

mock! {
	pub Record {}

	impl Model for Record {
		fn model_name(&self) -> &'static str;
		fn id(&self) -> Option<RecordId>;
		fn mark_persisted(&mut self, id: RecordId);
		fn has_attribute(&self, name: &str) -> bool;
		fn attribute(&self, name: &str) -> Option<Value>;
		fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), ModelError>;
		fn validate(&self) -> Errors;
		fn mark_for_destruction(&mut self);
		fn is_marked_for_destruction(&self) -> bool;
	}
}

mock! {
	pub Catalog {}

	impl AssociationCatalog for Catalog {
		fn reflect(&self, model_name: &str, association: &str) -> Option<Reflection>;
	}
}

/// Unsaved mock record of `model_name` accepting every attribute.
pub(crate) fn blank_record(model_name: &'static str) -> MockRecord {
	let mut record = MockRecord::new();
	record.expect_model_name().return_const(model_name);
	record.expect_id().return_const(None);
	record.expect_has_attribute().return_const(true);
	record.expect_attribute().returning(|_| Some(Value::Null));
	record.expect_set_attribute().returning(|_, _| Ok(()));
	record.expect_validate().returning(Errors::new);
	record.expect_mark_for_destruction().return_const(());
	record.expect_is_marked_for_destruction().return_const(false);
	record
}

/// Backend knowing a fixed set of associations. Nothing is stored: loads
/// come back empty and transactions cannot be opened.
pub(crate) struct StubBackend {
	associations: Vec<(&'static str, &'static str, Reflection)>,
}

impl StubBackend {
	pub(crate) fn new() -> Self {
		Self {
			associations: Vec::new(),
		}
	}

	pub(crate) fn with(
		mut self,
		owner: &'static str,
		name: &str,
		kind: AssociationKind,
		target: &'static str,
	) -> Self {
		let foreign_key = format!("{}_id", owner.to_lowercase());
		self.associations
			.push((owner, target, Reflection::new(name, kind, target, foreign_key)));
		self
	}

	pub(crate) fn into_context(self) -> FormContext {
		FormContext::with_backend(Rc::new(self))
	}

	fn find(&self, model_name: &str, association: &str) -> Option<&(&'static str, &'static str, Reflection)> {
		self.associations
			.iter()
			.find(|(owner, _, reflection)| *owner == model_name && reflection.name == association)
	}
}

impl AssociationCatalog for StubBackend {
	fn reflect(&self, model_name: &str, association: &str) -> Option<Reflection> {
		self.find(model_name, association)
			.map(|(_, _, reflection)| reflection.clone())
	}
}

impl AssociationAccess for StubBackend {
	fn load_one(
		&self,
		_parent: &dyn Model,
		_association: &str,
	) -> Result<Option<Box<dyn Model>>, PersistenceError> {
		Ok(None)
	}

	fn load_many(
		&self,
		_parent: &dyn Model,
		_association: &str,
	) -> Result<Vec<Box<dyn Model>>, PersistenceError> {
		Ok(Vec::new())
	}

	fn build(
		&self,
		parent: &dyn Model,
		association: &str,
	) -> Result<Box<dyn Model>, PersistenceError> {
		let (_, target, _) = self
			.find(parent.model_name(), association)
			.ok_or_else(|| PersistenceError::Query(format!("unknown association `{}`", association)))?;
		Ok(Box::new(blank_record(*target)))
	}
}

impl Persistence for StubBackend {
	fn begin(&self) -> Result<Box<dyn Transaction + '_>, PersistenceError> {
		Err(PersistenceError::Transaction("stub backend stores nothing".to_string()))
	}
}
