//! In-memory persistence for form tests
//!
//! [`MemoryStore`] implements every collaborator contract a form tree needs.
//! Tables live in memory; a transaction snapshots them on begin and restores
//! the snapshot on rollback, on a failed commit, or when it is dropped
//! without being committed.

use crate::record::{MemoryRecord, Row};
use crate::schema::{ModelSchema, SchemaRegistry};
use arbor_forms::{
	AssociationAccess, AssociationCatalog, AssociationKind, Backend, Model, Persistence,
	PersistenceError, RecordId, Reflection, Transaction,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Table = IndexMap<RecordId, Row>;
type Tables = IndexMap<&'static str, Table>;

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
	fail_after_writes: Option<usize>,
	fail_on_commit: bool,
}

pub(crate) struct StoreInner {
	registry: SchemaRegistry,
	tables: RefCell<Tables>,
	next_id: Cell<RecordId>,
	faults: Cell<Faults>,
	/// Refuse to destroy rows an owner still points at
	enforce_foreign_keys: Cell<bool>,
	transactions: Cell<usize>,
	me: Weak<StoreInner>,
}

impl StoreInner {
	pub(crate) fn any_row(&self, model: &str, predicate: impl Fn(RecordId, &Row) -> bool) -> bool {
		self.tables
			.borrow()
			.get(model)
			.is_some_and(|table| table.iter().any(|(id, row)| predicate(*id, row)))
	}

	fn schema(&self, model: &str) -> Result<&Rc<ModelSchema>, PersistenceError> {
		self.registry
			.get(model)
			.ok_or_else(|| PersistenceError::Query(format!("unknown model `{}`", model)))
	}

	fn reflection(&self, model: &str, association: &str) -> Result<Reflection, PersistenceError> {
		self.schema(model)?
			.association(association)
			.map(|a| a.reflection.clone())
			.ok_or_else(|| {
				PersistenceError::Query(format!(
					"unknown association `{}` on `{}`",
					association, model
				))
			})
	}

	fn record(&self, model: &str, id: RecordId) -> Option<MemoryRecord> {
		let schema = self.registry.get(model)?.clone();
		let tables = self.tables.borrow();
		let row = tables.get(model)?.get(&id)?;
		Some(MemoryRecord::stored(schema, id, row, self.me.clone()))
	}

	/// Records of `model` whose `column` refers to `id`, in id order.
	fn referencing(&self, model: &str, column: &str, id: RecordId) -> Vec<MemoryRecord> {
		let Some(schema) = self.registry.get(model) else {
			return Vec::new();
		};
		let tables = self.tables.borrow();
		let Some(table) = tables.get(model) else {
			return Vec::new();
		};
		let mut records: Vec<MemoryRecord> = table
			.iter()
			.filter(|(_, row)| row.get(column).and_then(value_as_id) == Some(id))
			.map(|(row_id, row)| MemoryRecord::stored(schema.clone(), *row_id, row, self.me.clone()))
			.collect();
		records.sort_by_key(|record| record.id());
		records
	}

	/// First `(model, id)` whose owner-held foreign key points at `id` of
	/// `target`.
	fn owner_referencing(&self, target: &str, id: RecordId) -> Option<(&'static str, RecordId)> {
		let tables = self.tables.borrow();
		self.registry.models().find_map(|schema| {
			let table = tables.get(schema.name())?;
			schema
				.associations()
				.iter()
				.filter(|a| a.reflection.kind.owner_holds_key() && a.reflection.target == target)
				.find_map(|a| {
					table
						.iter()
						.find(|(_, row)| row.get(a.foreign_key).and_then(value_as_id) == Some(id))
						.map(|(owner_id, _)| (schema.name(), *owner_id))
				})
		})
	}

	fn row_of(&self, model: &dyn Model) -> Result<Row, PersistenceError> {
		let schema = self.schema(model.model_name())?;
		Ok(schema
			.column_names()
			.iter()
			.map(|column| {
				let value = model.attribute(column).unwrap_or(Value::Null);
				(column.to_string(), value)
			})
			.collect())
	}

	fn destroy_cascading(&self, model: &str, id: RecordId) -> Result<(), PersistenceError> {
		let schema = self.schema(model)?.clone();
		let removed = self
			.tables
			.borrow_mut()
			.get_mut(schema.name())
			.and_then(|table| table.shift_remove(&id));
		if removed.is_none() {
			return Err(PersistenceError::Write {
				model: model.to_string(),
				reason: format!("no stored record with id={}", id),
			});
		}
		for association in schema.associations().iter().filter(|a| a.dependent) {
			let reflection = &association.reflection;
			if reflection.kind == AssociationKind::BelongsTo {
				continue;
			}
			for dependent in self.referencing(&reflection.target, &reflection.foreign_key, id) {
				if let Some(dependent_id) = dependent.id() {
					self.destroy_cascading(dependent.model_name(), dependent_id)?;
				}
			}
		}
		Ok(())
	}
}

/// Shared handle to an in-memory store.
///
/// Cloning the handle shares the tables.
///
/// # Examples
///
/// ```
/// use arbor_test::MemoryStore;
/// use serde_json::json;
///
/// let store = MemoryStore::reference();
/// let survey = store.seed("Survey", json!({ "name": "Favorite foods" }));
/// store.seed("Question", json!({ "content": "Which?", "survey_id": survey.id }));
///
/// assert_eq!(store.count("Survey"), 1);
/// assert_eq!(store.count("Question"), 1);
/// ```
#[derive(Clone)]
pub struct MemoryStore {
	inner: Rc<StoreInner>,
}

/// A seeded record: its id and model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seeded {
	pub model: &'static str,
	pub id: RecordId,
}

impl MemoryStore {
	pub fn new(registry: SchemaRegistry) -> Self {
		let tables = registry
			.models()
			.map(|schema| (schema.name(), Table::new()))
			.collect();
		let inner = Rc::new_cyclic(|me| StoreInner {
			registry,
			tables: RefCell::new(tables),
			next_id: Cell::new(1),
			faults: Cell::new(Faults::default()),
			enforce_foreign_keys: Cell::new(false),
			transactions: Cell::new(0),
			me: me.clone(),
		});
		Self { inner }
	}

	/// Store serving the reference domains of [`SchemaRegistry::reference`].
	pub fn reference() -> Self {
		Self::new(SchemaRegistry::reference())
	}

	/// This store as the backend of a form tree.
	pub fn backend(&self) -> Rc<dyn Backend> {
		Rc::new(self.clone())
	}

	pub fn registry(&self) -> &SchemaRegistry {
		&self.inner.registry
	}

	/// A new, unsaved record of `model`.
	///
	/// # Panics
	///
	/// Panics if `model` is not registered.
	pub fn new_record(&self, model: &str) -> MemoryRecord {
		let schema = self
			.inner
			.registry
			.get(model)
			.unwrap_or_else(|| panic!("model `{}` is not registered", model))
			.clone();
		MemoryRecord::new(schema, Rc::downgrade(&self.inner))
	}

	/// Store a row directly, outside any form.
	///
	/// # Panics
	///
	/// Panics if `model` is not registered, `values` is not an object or
	/// names an unknown column.
	pub fn seed(&self, model: &str, values: Value) -> Seeded {
		let mut record = self.new_record(model);
		let Value::Object(values) = values else {
			panic!("seed values for `{}` must be an object", model);
		};
		for (column, value) in values {
			if let Err(error) = record.set_attribute(&column, value) {
				panic!("cannot seed `{}`: {}", model, error);
			}
		}
		let id = self.next_id();
		self.inner
			.tables
			.borrow_mut()
			.entry(record.schema().name())
			.or_default()
			.insert(id, record.values().clone());
		Seeded {
			model: record.schema().name(),
			id,
		}
	}

	/// Stored record of `model` with `id`.
	pub fn find(&self, model: &str, id: RecordId) -> Option<MemoryRecord> {
		self.inner.record(model, id)
	}

	/// Every stored record of `model`, in id order.
	pub fn all(&self, model: &str) -> Vec<MemoryRecord> {
		let Some(schema) = self.inner.registry.get(model) else {
			return Vec::new();
		};
		let tables = self.inner.tables.borrow();
		let mut records: Vec<MemoryRecord> = tables
			.get(model)
			.map(|table| {
				table
					.iter()
					.map(|(id, row)| {
						MemoryRecord::stored(schema.clone(), *id, row, Rc::downgrade(&self.inner))
					})
					.collect()
			})
			.unwrap_or_default();
		records.sort_by_key(|record| record.id());
		records
	}

	pub fn count(&self, model: &str) -> usize {
		self.inner
			.tables
			.borrow()
			.get(model)
			.map_or(0, Table::len)
	}

	/// Total number of stored rows across every model.
	pub fn total_count(&self) -> usize {
		self.inner.tables.borrow().values().map(Table::len).sum()
	}

	/// Number of transactions begun so far.
	pub fn transactions_begun(&self) -> usize {
		self.inner.transactions.get()
	}

	/// Let the next transactions perform `writes` writes, then fail.
	pub fn fail_after_writes(&self, writes: usize) {
		let mut faults = self.inner.faults.get();
		faults.fail_after_writes = Some(writes);
		self.inner.faults.set(faults);
	}

	/// Make every commit fail.
	pub fn fail_on_commit(&self) {
		let mut faults = self.inner.faults.get();
		faults.fail_on_commit = true;
		self.inner.faults.set(faults);
	}

	/// Make destroys fail while a `belongs_to` foreign key still refers to
	/// the destroyed row, as a database with foreign key constraints would.
	pub fn enforce_foreign_keys(&self) {
		self.inner.enforce_foreign_keys.set(true);
	}

	pub fn clear_faults(&self) {
		self.inner.faults.set(Faults::default());
	}

	fn next_id(&self) -> RecordId {
		let id = self.inner.next_id.get();
		self.inner.next_id.set(id + 1);
		id
	}
}

impl AssociationCatalog for MemoryStore {
	fn reflect(&self, model_name: &str, association: &str) -> Option<Reflection> {
		self.inner.reflection(model_name, association).ok()
	}
}

impl AssociationAccess for MemoryStore {
	fn load_one(
		&self,
		parent: &dyn Model,
		association: &str,
	) -> Result<Option<Box<dyn Model>>, PersistenceError> {
		let reflection = self.inner.reflection(parent.model_name(), association)?;
		let record = match reflection.kind {
			AssociationKind::HasOne => parent.id().and_then(|id| {
				self.inner
					.referencing(&reflection.target, &reflection.foreign_key, id)
					.into_iter()
					.next()
			}),
			AssociationKind::BelongsTo => parent
				.attribute(&reflection.foreign_key)
				.as_ref()
				.and_then(value_as_id)
				.and_then(|id| self.inner.record(&reflection.target, id)),
			AssociationKind::HasMany => {
				return Err(PersistenceError::Query(format!(
					"`{}` is a to-many association",
					association
				)));
			}
		};
		Ok(record.map(|record| Box::new(record) as Box<dyn Model>))
	}

	fn load_many(
		&self,
		parent: &dyn Model,
		association: &str,
	) -> Result<Vec<Box<dyn Model>>, PersistenceError> {
		let reflection = self.inner.reflection(parent.model_name(), association)?;
		if reflection.kind != AssociationKind::HasMany {
			return Err(PersistenceError::Query(format!(
				"`{}` is a to-one association",
				association
			)));
		}
		let Some(id) = parent.id() else {
			return Ok(Vec::new());
		};
		Ok(self
			.inner
			.referencing(&reflection.target, &reflection.foreign_key, id)
			.into_iter()
			.map(|record| Box::new(record) as Box<dyn Model>)
			.collect())
	}

	fn build(
		&self,
		parent: &dyn Model,
		association: &str,
	) -> Result<Box<dyn Model>, PersistenceError> {
		let reflection = self.inner.reflection(parent.model_name(), association)?;
		let mut record = self.new_record_checked(&reflection.target)?;
		if !reflection.kind.owner_holds_key()
			&& let Some(id) = parent.id()
		{
			record
				.set_attribute(&reflection.foreign_key, Value::from(id))
				.map_err(|e| PersistenceError::Query(e.to_string()))?;
		}
		Ok(Box::new(record))
	}
}

impl MemoryStore {
	fn new_record_checked(&self, model: &str) -> Result<MemoryRecord, PersistenceError> {
		let schema = self.inner.schema(model)?.clone();
		Ok(MemoryRecord::new(schema, Rc::downgrade(&self.inner)))
	}
}

impl Persistence for MemoryStore {
	fn begin(&self) -> Result<Box<dyn Transaction + '_>, PersistenceError> {
		self.inner.transactions.set(self.inner.transactions.get() + 1);
		Ok(Box::new(MemoryTransaction {
			store: self,
			snapshot: Some((self.inner.tables.borrow().clone(), self.inner.next_id.get())),
			writes: 0,
		}))
	}
}

/// Open write scope of a [`MemoryStore`].
pub struct MemoryTransaction<'a> {
	store: &'a MemoryStore,
	/// Tables and id sequence as of `begin`; `None` once finished
	snapshot: Option<(Tables, RecordId)>,
	writes: usize,
}

impl MemoryTransaction<'_> {
	fn record_write(&mut self, model: &str) -> Result<(), PersistenceError> {
		if let Some(limit) = self.store.inner.faults.get().fail_after_writes
			&& self.writes >= limit
		{
			return Err(PersistenceError::Write {
				model: model.to_string(),
				reason: format!("injected failure after {} writes", limit),
			});
		}
		self.writes += 1;
		Ok(())
	}

	fn restore(&mut self) {
		if let Some((tables, next_id)) = self.snapshot.take() {
			*self.store.inner.tables.borrow_mut() = tables;
			self.store.inner.next_id.set(next_id);
		}
	}
}

impl Transaction for MemoryTransaction<'_> {
	fn insert(&mut self, model: &dyn Model) -> Result<RecordId, PersistenceError> {
		self.record_write(model.model_name())?;
		let row = self.store.inner.row_of(model)?;
		let id = self.store.next_id();
		self.store
			.inner
			.tables
			.borrow_mut()
			.entry(model.model_name())
			.or_default()
			.insert(id, row);
		tracing::trace!(model = model.model_name(), id, "inserted");
		Ok(id)
	}

	fn update(&mut self, model: &dyn Model) -> Result<(), PersistenceError> {
		self.record_write(model.model_name())?;
		let id = model.id().ok_or_else(|| PersistenceError::Write {
			model: model.model_name().to_string(),
			reason: "cannot update a record that was never stored".to_string(),
		})?;
		let row = self.store.inner.row_of(model)?;
		let mut tables = self.store.inner.tables.borrow_mut();
		let slot = tables
			.get_mut(model.model_name())
			.and_then(|table| table.get_mut(&id))
			.ok_or_else(|| PersistenceError::Write {
				model: model.model_name().to_string(),
				reason: format!("no stored record with id={}", id),
			})?;
		*slot = row;
		Ok(())
	}

	fn destroy(&mut self, model: &dyn Model) -> Result<(), PersistenceError> {
		self.record_write(model.model_name())?;
		let id = model.id().ok_or_else(|| PersistenceError::Write {
			model: model.model_name().to_string(),
			reason: "cannot destroy a record that was never stored".to_string(),
		})?;
		let inner = &self.store.inner;
		inner.destroy_cascading(model.model_name(), id)?;
		if inner.enforce_foreign_keys.get()
			&& let Some((owner, owner_id)) = inner.owner_referencing(model.model_name(), id)
		{
			return Err(PersistenceError::Write {
				model: model.model_name().to_string(),
				reason: format!("id={} is still referenced by {} id={}", id, owner, owner_id),
			});
		}
		Ok(())
	}

	fn commit(mut self: Box<Self>) -> Result<(), PersistenceError> {
		if self.store.inner.faults.get().fail_on_commit {
			self.restore();
			return Err(PersistenceError::Transaction(
				"injected commit failure".to_string(),
			));
		}
		self.snapshot = None;
		Ok(())
	}

	fn rollback(mut self: Box<Self>) -> Result<(), PersistenceError> {
		self.restore();
		Ok(())
	}
}

impl Drop for MemoryTransaction<'_> {
	fn drop(&mut self) {
		self.restore();
	}
}

/// Read a foreign key value, stored either as a number or as a string.
fn value_as_id(value: &Value) -> Option<RecordId> {
	match value {
		Value::Number(n) => n.as_i64(),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_dropped_transaction_leaves_tables_unchanged() {
		let store = MemoryStore::reference();
		let record = store.new_record("Survey");
		{
			let mut tx = store.begin().unwrap();
			tx.insert(&record).unwrap();
		}
		assert_eq!(store.count("Survey"), 0);
	}

	#[rstest]
	fn test_committed_insert_is_visible() {
		let store = MemoryStore::reference();
		let mut record = store.new_record("Survey");
		record.set_attribute("name", json!("Lunch")).unwrap();

		let mut tx = store.begin().unwrap();
		let id = tx.insert(&record).unwrap();
		tx.commit().unwrap();

		let stored = store.find("Survey", id).unwrap();
		assert_eq!(stored.get("name"), Some(&json!("Lunch")));
	}

	#[rstest]
	fn test_injected_write_failure() {
		let store = MemoryStore::reference();
		store.fail_after_writes(1);
		let record = store.new_record("Survey");

		let mut tx = store.begin().unwrap();
		tx.insert(&record).unwrap();
		let result = tx.insert(&record);
		assert!(matches!(result, Err(PersistenceError::Write { .. })));
		tx.rollback().unwrap();

		assert_eq!(store.count("Survey"), 0);
	}

	#[rstest]
	fn test_injected_commit_failure_restores_snapshot() {
		let store = MemoryStore::reference();
		store.fail_on_commit();
		let record = store.new_record("Survey");

		let mut tx = store.begin().unwrap();
		tx.insert(&record).unwrap();
		assert!(tx.commit().is_err());

		assert_eq!(store.count("Survey"), 0);
	}

	#[rstest]
	fn test_destroy_cascades_to_dependents() {
		let store = MemoryStore::reference();
		let survey = store.seed("Survey", json!({ "name": "Colors" }));
		let question = store.seed("Question", json!({ "content": "Which?", "survey_id": survey.id }));
		store.seed("Answer", json!({ "content": "Blue", "question_id": question.id }));
		store.seed("Answer", json!({ "content": "Red", "question_id": question.id }));

		let record = store.find("Survey", survey.id).unwrap();
		let mut tx = store.begin().unwrap();
		tx.destroy(&record).unwrap();
		tx.commit().unwrap();

		assert_eq!(store.total_count(), 0);
	}

	#[rstest]
	#[case(false, true)]
	#[case(true, false)]
	fn test_destroying_referenced_owner_target(#[case] enforce: bool, #[case] allowed: bool) {
		// Arrange
		let store = MemoryStore::reference();
		if enforce {
			store.enforce_foreign_keys();
		}
		let person = store.seed("Person", json!({ "name": "Kate" }));
		store.seed("Project", json!({ "name": "Launch", "owner_id": person.id }));
		let record = store.find("Person", person.id).unwrap();

		// Act
		let mut tx = store.begin().unwrap();
		let result = tx.destroy(&record);

		// Assert
		assert_eq!(result.is_ok(), allowed);
		drop(tx);
		assert_eq!(store.count("Person"), 1);
	}

	#[rstest]
	fn test_load_many_in_id_order() {
		let store = MemoryStore::reference();
		let project = store.seed("Project", json!({ "name": "Launch" }));
		store.seed("Task", json!({ "name": "Plan", "project_id": project.id }));
		store.seed("Task", json!({ "name": "Build", "project_id": project.id.to_string() }));

		let parent = store.find("Project", project.id).unwrap();
		let tasks = store.load_many(&parent, "tasks").unwrap();
		let names: Vec<Value> = tasks
			.iter()
			.map(|task| task.attribute("name").unwrap())
			.collect();
		assert_eq!(names, vec![json!("Plan"), json!("Build")]);
	}

	#[rstest]
	fn test_build_sets_foreign_key_of_stored_parent() {
		let store = MemoryStore::reference();
		let user = store.seed("User", json!({ "name": "Peter" }));
		let parent = store.find("User", user.id).unwrap();

		let email = store.build(&parent, "email").unwrap();
		assert_eq!(email.attribute("user_id"), Some(json!(user.id)));
		assert!(!email.is_persisted());
	}

	#[rstest]
	fn test_uniqueness_validation() {
		let store = MemoryStore::reference();
		store.seed("Survey", json!({ "name": "Colors" }));

		let mut record = store.new_record("Survey");
		record.set_attribute("name", json!("Colors")).unwrap();
		assert!(record.validate().includes("name", "has already been taken"));

		record.set_attribute("name", json!("Shapes")).unwrap();
		assert!(record.validate().is_empty());
	}
}
