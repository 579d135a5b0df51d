//! Records served by the in-memory store

use crate::schema::{ModelSchema, ModelValidation};
use crate::store::StoreInner;
use arbor_forms::params::is_blank;
use arbor_forms::{Errors, Model, ModelError, RecordId};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::rc::{Rc, Weak};

/// Column values of one stored row.
pub type Row = IndexMap<String, Value>;

/// A record of a [`MemoryStore`](crate::MemoryStore) model.
///
/// Records are detached copies: changes reach the store only through a
/// form save (or [`MemoryStore::seed`](crate::MemoryStore::seed)).
#[derive(Clone)]
pub struct MemoryRecord {
	schema: Rc<ModelSchema>,
	id: Option<RecordId>,
	values: Row,
	marked_for_destruction: bool,
	store: Weak<StoreInner>,
}

impl MemoryRecord {
	pub(crate) fn new(schema: Rc<ModelSchema>, store: Weak<StoreInner>) -> Self {
		let values = schema
			.column_names()
			.iter()
			.map(|column| (column.to_string(), Value::Null))
			.collect();
		Self {
			schema,
			id: None,
			values,
			marked_for_destruction: false,
			store,
		}
	}

	pub(crate) fn stored(
		schema: Rc<ModelSchema>,
		id: RecordId,
		row: &Row,
		store: Weak<StoreInner>,
	) -> Self {
		let mut record = Self::new(schema, store);
		record.id = Some(id);
		for (column, value) in row {
			record.values.insert(column.clone(), value.clone());
		}
		record
	}

	pub fn schema(&self) -> &ModelSchema {
		&self.schema
	}

	/// Stored column value; `None` for unknown columns.
	pub fn get(&self, column: &str) -> Option<&Value> {
		self.values.get(column)
	}

	pub fn values(&self) -> &Row {
		&self.values
	}

	fn unique_violation(&self, column: &str, value: &Value) -> bool {
		let Some(store) = self.store.upgrade() else {
			return false;
		};
		store.any_row(self.schema.name(), |id, row| {
			Some(id) != self.id && row.get(column) == Some(value)
		})
	}
}

impl Model for MemoryRecord {
	fn model_name(&self) -> &'static str {
		self.schema.name()
	}

	fn id(&self) -> Option<RecordId> {
		self.id
	}

	fn mark_persisted(&mut self, id: RecordId) {
		self.id = Some(id);
	}

	fn has_attribute(&self, name: &str) -> bool {
		name == "id" || self.schema.has_column(name)
	}

	fn attribute(&self, name: &str) -> Option<Value> {
		if name == "id" {
			return Some(self.id.map_or(Value::Null, Value::from));
		}
		self.values.get(name).cloned()
	}

	fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), ModelError> {
		if name == "id" {
			return Err(ModelError::InvalidValue {
				model: self.schema.name().to_string(),
				attribute: name.to_string(),
				reason: "identifiers are assigned by the store".to_string(),
			});
		}
		match self.values.get_mut(name) {
			Some(slot) => {
				*slot = value;
				Ok(())
			}
			None => Err(ModelError::UnknownAttribute {
				model: self.schema.name().to_string(),
				attribute: name.to_string(),
			}),
		}
	}

	fn validate(&self) -> Errors {
		let mut errors = Errors::new();
		for validation in self.schema.validations() {
			match *validation {
				ModelValidation::Presence(column) => {
					if self.values.get(column).is_none_or(is_blank) {
						errors.add(column, "can't be blank");
					}
				}
				ModelValidation::Uniqueness(column) => {
					if let Some(value) = self.values.get(column)
						&& !is_blank(value)
						&& self.unique_violation(column, value)
					{
						errors.add(column, "has already been taken");
					}
				}
			}
		}
		errors
	}

	fn mark_for_destruction(&mut self) {
		self.marked_for_destruction = true;
	}

	fn is_marked_for_destruction(&self) -> bool {
		self.marked_for_destruction
	}
}

impl fmt::Debug for MemoryRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryRecord")
			.field("model", &self.schema.name())
			.field("id", &self.id)
			.field("values", &self.values)
			.field("marked_for_destruction", &self.marked_for_destruction)
			.finish()
	}
}
