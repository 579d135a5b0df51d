//! Collections of nested form nodes
//!
//! A [`FormNodeCollection`] stands for a to-many association. Row identity
//! depends on the parent: rows of a stored parent are matched by the `id`
//! submitted with them, rows of a new parent by their position.

use crate::backend::Transaction;
use crate::context::FormContext;
use crate::definition::FormNodeDefinition;
use crate::error::{FormError, FormResult};
use crate::errors::Errors;
use crate::model::Model;
use crate::node::FormNode;
use crate::params::{self, Params};
use crate::reflection::Reflection;
use crate::settings::RejectScope;
use serde_json::Value;
use std::fmt;
use std::ops::{Index, IndexMut};

pub struct FormNodeCollection {
	definition: FormNodeDefinition,
	reflection: Reflection,
	records: Vec<FormNode>,
	/// Stored rows taken out of the form; destroyed on save
	removed: Vec<FormNode>,
	errors: Errors,
	ctx: FormContext,
}

impl FormNodeCollection {
	pub(crate) fn new(
		definition: FormNodeDefinition,
		reflection: Reflection,
		records: Vec<FormNode>,
		ctx: FormContext,
	) -> Self {
		Self {
			definition,
			reflection,
			records,
			removed: Vec::new(),
			errors: Errors::new(),
			ctx,
		}
	}

	pub fn association_name(&self) -> &str {
		self.definition.association_name()
	}

	pub fn represents(&self, association: &str) -> bool {
		self.association_name() == association
	}

	pub fn reflection(&self) -> &Reflection {
		&self.reflection
	}

	pub fn definition(&self) -> &FormNodeDefinition {
		&self.definition
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn get(&self, position: usize) -> Option<&FormNode> {
		self.records.get(position)
	}

	pub fn get_mut(&mut self, position: usize) -> Option<&mut FormNode> {
		self.records.get_mut(position)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, FormNode> {
		self.records.iter()
	}

	pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, FormNode> {
		self.records.iter_mut()
	}

	/// Rows in form order: stored rows first, then appended ones.
	pub fn records(&self) -> &[FormNode] {
		&self.records
	}

	/// Stored rows removed by the last submissions, pending destroy.
	pub fn removed(&self) -> &[FormNode] {
		&self.removed
	}

	pub fn errors(&self) -> &Errors {
		&self.errors
	}

	/// Scope in which the reject predicate applies to this collection.
	pub fn reject_scope(&self) -> RejectScope {
		self.definition
			.options()
			.reject_scope
			.unwrap_or(self.ctx.settings().reject_blank_rows)
	}

	/// Whether the reject predicate matches `row`.
	pub fn rejects(&self, row: &Params) -> bool {
		match self.definition.options().reject_predicate() {
			Some(predicate) => predicate(row),
			None => params::all_blank(row),
		}
	}

	/// Reconcile submitted rows with the collection.
	///
	/// `value` is an object keyed by position or identifier, or an array.
	/// Rows are applied in submission order.
	pub fn submit(&mut self, value: &Value, parent: &dyn Model) -> FormResult<()> {
		let rows = self.collect_rows(value)?;
		if let Some(limit) = self.definition.options().limit
			&& rows.len() > limit
		{
			return Err(FormError::TooManyRecords {
				association: self.association_name().to_string(),
				limit,
				given: rows.len(),
			});
		}

		if parent.is_persisted() {
			for (_, row) in rows {
				self.reconcile_stored_parent(row, parent)?;
			}
		} else {
			for (key, row) in rows {
				self.reconcile_new_parent(&key, row, parent)?;
			}
		}
		Ok(())
	}

	fn collect_rows<'v>(&self, value: &'v Value) -> FormResult<Vec<(String, &'v Params)>> {
		let row = |key: String, value: &'v Value| {
			value
				.as_object()
				.map(|fields| (key.clone(), fields))
				.ok_or_else(|| {
					FormError::InvalidParams(format!(
						"row `{}` of `{}_attributes` must be an object",
						key,
						self.association_name()
					))
				})
		};
		match value {
			Value::Object(map) => map
				.iter()
				.map(|(key, value)| row(key.clone(), value))
				.collect(),
			Value::Array(items) => items
				.iter()
				.enumerate()
				.map(|(position, value)| row(position.to_string(), value))
				.collect(),
			_ => Err(FormError::InvalidParams(format!(
				"`{}_attributes` must be an object or an array",
				self.association_name()
			))),
		}
	}

	/// Rows of a stored parent: `id` addresses an existing row, anything else
	/// is a new row.
	fn reconcile_stored_parent(&mut self, row: &Params, parent: &dyn Model) -> FormResult<()> {
		let rejected = self.reject_scope() == RejectScope::Always && self.rejects(row);
		let destroy = params::requests_destroy(row, &self.ctx.settings().destroy_markers);

		match params::row_id(row)? {
			Some(id) => {
				let position = self
					.records
					.iter()
					.position(|node| node.model().id() == Some(id))
					.ok_or_else(|| FormError::RecordNotFound {
						association: self.association_name().to_string(),
						id,
					})?;
				self.records[position].submit_fields(&params::assignable(row))?;
				if destroy || rejected {
					let mut node = self.records.remove(position);
					node.delete();
					tracing::debug!(
						association = self.association_name(),
						id,
						"row removed from collection"
					);
					self.removed.push(node);
				}
			}
			None if rejected => {
				tracing::debug!(
					association = self.association_name(),
					"skipping rejected row"
				);
			}
			None => {
				let mut node = self.build_node(parent)?;
				node.submit_fields(&params::assignable(row))?;
				if destroy {
					node.delete();
				}
				self.records.push(node);
			}
		}
		Ok(())
	}

	/// Rows of a new parent: a key naming an existing position addresses
	/// that row, any other key appends a row. Every submission of a row
	/// decides its rejection anew.
	fn reconcile_new_parent(
		&mut self,
		key: &str,
		row: &Params,
		parent: &dyn Model,
	) -> FormResult<()> {
		let existing = key
			.trim()
			.parse::<usize>()
			.ok()
			.filter(|position| *position < self.records.len());
		let position = match existing {
			Some(position) => position,
			None => {
				let node = self.build_node(parent)?;
				self.records.push(node);
				tracing::debug!(
					association = self.association_name(),
					key,
					rows = self.records.len(),
					"appended row"
				);
				self.records.len() - 1
			}
		};

		let rejected = self.reject_scope() != RejectScope::Never && self.rejects(row);
		let destroy = params::requests_destroy(row, &self.ctx.settings().destroy_markers);
		let node = &mut self.records[position];
		node.branch_mut().set_rejected(rejected);
		if destroy {
			node.delete();
		}
		node.submit_fields(&params::assignable(row))
	}

	fn build_node(&self, parent: &dyn Model) -> FormResult<FormNode> {
		let model = self
			.ctx
			.backend()
			.build(parent, self.association_name())?;
		FormNode::new(
			self.definition.clone(),
			self.reflection.clone(),
			model,
			self.ctx.clone(),
		)
	}

	/// Detached row, e.g. to render an empty row for client-side insertion.
	pub fn get_model(&self, parent: &dyn Model) -> FormResult<FormNode> {
		self.build_node(parent)
	}

	/// Validate every row. Row errors are merged without qualification; the
	/// enclosing node prefixes them with the association name.
	pub fn is_valid(&mut self) -> bool {
		self.errors.clear();
		for node in &mut self.records {
			node.is_valid();
			self.errors.merge(node.errors());
		}
		self.errors.is_empty()
	}

	pub(crate) fn records_mut(&mut self) -> &mut [FormNode] {
		&mut self.records
	}

	pub(crate) fn destroy_removed(&self, tx: &mut dyn Transaction) -> FormResult<()> {
		for node in self.removed.iter().filter(|n| n.model().is_persisted()) {
			tx.destroy(node.model())?;
		}
		Ok(())
	}

	pub(crate) fn finish_save(&mut self) {
		self.removed.clear();
		self.records
			.retain(|node| !node.is_marked_for_destruction());
		for node in &mut self.records {
			node.branch_mut().finish_save();
		}
	}
}

impl Index<usize> for FormNodeCollection {
	type Output = FormNode;

	fn index(&self, position: usize) -> &FormNode {
		&self.records[position]
	}
}

impl IndexMut<usize> for FormNodeCollection {
	fn index_mut(&mut self, position: usize) -> &mut FormNode {
		&mut self.records[position]
	}
}

impl<'a> IntoIterator for &'a FormNodeCollection {
	type Item = &'a FormNode;
	type IntoIter = std::slice::Iter<'a, FormNode>;

	fn into_iter(self) -> Self::IntoIter {
		self.records.iter()
	}
}

impl<'a> IntoIterator for &'a mut FormNodeCollection {
	type Item = &'a mut FormNode;
	type IntoIter = std::slice::IterMut<'a, FormNode>;

	fn into_iter(self) -> Self::IntoIter {
		self.records.iter_mut()
	}
}

impl fmt::Debug for FormNodeCollection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormNodeCollection")
			.field("association_name", &self.association_name())
			.field("records", &self.records)
			.field("removed", &self.removed.len())
			.finish()
	}
}
