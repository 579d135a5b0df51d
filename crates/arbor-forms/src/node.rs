//! Single nested form nodes

use crate::backend::Transaction;
use crate::branch::Branch;
use crate::collection::FormNodeCollection;
use crate::context::FormContext;
use crate::definition::FormNodeDefinition;
use crate::error::{FormError, FormResult};
use crate::errors::Errors;
use crate::model::Model;
use crate::params::{self, Params};
use crate::reflection::Reflection;
use serde_json::Value;
use std::fmt;

/// A form for one associated record.
///
/// The node owns its model; the parent model is borrowed from the enclosing
/// node whenever an operation needs it.
pub struct FormNode {
	definition: FormNodeDefinition,
	reflection: Reflection,
	branch: Branch,
	/// Stored record replaced by a fresh one; destroyed on save
	replaced: Option<Box<dyn Model>>,
}

impl FormNode {
	pub(crate) fn new(
		definition: FormNodeDefinition,
		reflection: Reflection,
		model: Box<dyn Model>,
		ctx: FormContext,
	) -> FormResult<Self> {
		let branch = Branch::new(
			definition.association_name(),
			model,
			definition.schema().clone(),
			ctx,
		)?;
		Ok(Self {
			definition,
			reflection,
			branch,
			replaced: None,
		})
	}

	pub fn association_name(&self) -> &str {
		self.definition.association_name()
	}

	/// Whether this node stands for `association`.
	pub fn represents(&self, association: &str) -> bool {
		self.association_name() == association
	}

	pub fn reflection(&self) -> &Reflection {
		&self.reflection
	}

	pub fn definition(&self) -> &FormNodeDefinition {
		&self.definition
	}

	pub fn model(&self) -> &dyn Model {
		self.branch.model()
	}

	pub fn model_mut(&mut self) -> &mut dyn Model {
		self.branch.model_mut()
	}

	/// Stored record waiting to be destroyed because this node's model was
	/// replaced.
	pub fn replaced_model(&self) -> Option<&dyn Model> {
		self.replaced.as_deref()
	}

	/// The node's model, replaced by a freshly built one when the current
	/// model is marked for destruction. Calling it again is a no-op.
	pub fn get_or_build_model(&mut self, parent: &dyn Model) -> FormResult<&mut dyn Model> {
		if self.branch.model().is_marked_for_destruction() {
			let fresh = self
				.branch
				.ctx()
				.backend()
				.build(parent, self.definition.association_name())?;
			let previous = self.branch.replace_model(fresh)?;
			tracing::debug!(
				association = self.definition.association_name(),
				replaced_id = ?previous.id(),
				"rebuilt model marked for destruction"
			);
			if previous.is_persisted() && self.replaced.is_none() {
				self.replaced = Some(previous);
			}
		}
		Ok(self.branch.model_mut())
	}

	/// Apply submitted attributes for this association.
	pub fn submit(&mut self, value: &Value, parent: &dyn Model) -> FormResult<()> {
		let row = value.as_object().ok_or_else(|| {
			FormError::InvalidParams(format!(
				"`{}_attributes` must be an object",
				self.association_name()
			))
		})?;
		let fills_record = !params::all_blank(row)
			&& !params::requests_destroy(row, &self.branch.ctx().settings().destroy_markers);
		if fills_record {
			self.get_or_build_model(parent)?;
		}
		self.branch.submit(row)
	}

	/// Apply a row whose `id` and `_destroy` keys were already handled.
	pub(crate) fn submit_fields(&mut self, row: &Params) -> FormResult<()> {
		self.branch.submit(row)
	}

	pub fn is_valid(&mut self) -> bool {
		self.branch.validate()
	}

	pub fn errors(&self) -> &Errors {
		self.branch.errors()
	}

	/// Mark the model for destruction on the next save.
	pub fn delete(&mut self) {
		self.branch.model_mut().mark_for_destruction();
	}

	/// Whether the next save leaves this node's record out: it is marked for
	/// destruction, or the row was rejected.
	pub fn is_marked_for_destruction(&self) -> bool {
		self.model().is_marked_for_destruction() || self.branch.is_rejected()
	}

	/// Whether the row matched its collection's reject predicate. Rejected
	/// rows are still validated but never written.
	pub fn is_rejected(&self) -> bool {
		self.branch.is_rejected()
	}

	pub fn attribute(&self, name: &str) -> Option<Value> {
		self.branch.attribute(name)
	}

	pub fn set_attribute(&mut self, name: &str, value: Value) -> FormResult<()> {
		self.branch.set_attribute(name, value)
	}

	pub fn children(&self) -> &[FormChild] {
		self.branch.children()
	}

	pub fn child(&self, association: &str) -> Option<&FormChild> {
		self.branch.child(association)
	}

	pub fn child_mut(&mut self, association: &str) -> Option<&mut FormChild> {
		self.branch.child_mut(association)
	}

	pub fn node(&self, association: &str) -> Option<&FormNode> {
		self.child(association).and_then(FormChild::as_node)
	}

	pub fn collection(&self, association: &str) -> Option<&FormNodeCollection> {
		self.child(association).and_then(FormChild::as_collection)
	}

	/// Detached node for a nested association, e.g. to render an empty row.
	pub fn get_model(&self, association: &str) -> FormResult<FormNode> {
		self.branch.template(association)
	}

	pub fn permits(&self, key: &str) -> bool {
		self.branch.schema().permits(key)
	}

	pub(crate) fn branch(&self) -> &Branch {
		&self.branch
	}

	pub(crate) fn branch_mut(&mut self) -> &mut Branch {
		&mut self.branch
	}

	pub(crate) fn destroy_replaced(&self, tx: &mut dyn Transaction) -> FormResult<()> {
		if let Some(previous) = &self.replaced {
			tracing::debug!(
				association = self.association_name(),
				id = ?previous.id(),
				"destroying replaced record"
			);
			tx.destroy(previous.as_ref())?;
		}
		Ok(())
	}

	/// Apply a committed save. A destroyed model is replaced with a fresh one
	/// so the node can keep serving the form.
	pub(crate) fn finish_save(&mut self, parent: &dyn Model) {
		self.replaced = None;
		if !self.model().is_marked_for_destruction() {
			self.branch.finish_save();
			return;
		}
		let rebuilt = self
			.branch
			.ctx()
			.backend()
			.build(parent, self.definition.association_name())
			.map_err(FormError::from)
			.and_then(|model| self.branch.replace_model(model));
		if let Err(error) = rebuilt {
			tracing::warn!(
				association = self.definition.association_name(),
				error = %error,
				"could not rebuild destroyed record"
			);
		}
	}
}

impl fmt::Debug for FormNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormNode")
			.field("association_name", &self.association_name())
			.field("model", &self.model())
			.field("children", &self.children())
			.finish()
	}
}

/// A resolved association: one node, or a collection of nodes.
#[derive(Debug)]
pub enum FormChild {
	Single(FormNode),
	Collection(FormNodeCollection),
}

impl FormChild {
	pub fn association_name(&self) -> &str {
		match self {
			FormChild::Single(node) => node.association_name(),
			FormChild::Collection(collection) => collection.association_name(),
		}
	}

	pub fn represents(&self, association: &str) -> bool {
		self.association_name() == association
	}

	pub fn reflection(&self) -> &Reflection {
		match self {
			FormChild::Single(node) => node.reflection(),
			FormChild::Collection(collection) => collection.reflection(),
		}
	}

	pub fn as_node(&self) -> Option<&FormNode> {
		match self {
			FormChild::Single(node) => Some(node),
			FormChild::Collection(_) => None,
		}
	}

	pub fn as_node_mut(&mut self) -> Option<&mut FormNode> {
		match self {
			FormChild::Single(node) => Some(node),
			FormChild::Collection(_) => None,
		}
	}

	pub fn as_collection(&self) -> Option<&FormNodeCollection> {
		match self {
			FormChild::Collection(collection) => Some(collection),
			FormChild::Single(_) => None,
		}
	}

	pub fn as_collection_mut(&mut self) -> Option<&mut FormNodeCollection> {
		match self {
			FormChild::Collection(collection) => Some(collection),
			FormChild::Single(_) => None,
		}
	}

	pub fn submit(&mut self, value: &Value, parent: &dyn Model) -> FormResult<()> {
		match self {
			FormChild::Single(node) => node.submit(value, parent),
			FormChild::Collection(collection) => collection.submit(value, parent),
		}
	}

	pub fn is_valid(&mut self) -> bool {
		match self {
			FormChild::Single(node) => node.is_valid(),
			FormChild::Collection(collection) => collection.is_valid(),
		}
	}

	pub fn errors(&self) -> &Errors {
		match self {
			FormChild::Single(node) => node.errors(),
			FormChild::Collection(collection) => collection.errors(),
		}
	}

	pub(crate) fn owner_holds_key(&self) -> bool {
		self.reflection().kind.owner_holds_key()
	}

	pub(crate) fn nodes_mut(&mut self) -> std::slice::IterMut<'_, FormNode> {
		match self {
			FormChild::Single(node) => std::slice::from_mut(node).iter_mut(),
			FormChild::Collection(collection) => collection.records_mut().iter_mut(),
		}
	}

	pub(crate) fn destroy_pending(&self, tx: &mut dyn Transaction) -> FormResult<()> {
		match self {
			FormChild::Single(node) => node.destroy_replaced(tx),
			FormChild::Collection(collection) => collection.destroy_removed(tx),
		}
	}

	pub(crate) fn finish_save(&mut self, parent: &dyn Model) {
		match self {
			FormChild::Single(node) => node.finish_save(parent),
			FormChild::Collection(collection) => collection.finish_save(),
		}
	}
}
