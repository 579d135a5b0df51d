//! State and behaviour shared by every level of a form tree
//!
//! A [`Branch`] owns one model, the schema describing it and the child nodes
//! resolved from the schema's associations. Both the root form and every
//! nested node are a branch plus a little identity.

use crate::backend::Transaction;
use crate::context::FormContext;
use crate::error::{ConfigurationError, FormError, FormResult};
use crate::errors::Errors;
use crate::model::{Model, RecordId};
use crate::node::{FormChild, FormNode};
use crate::params::{self, DESTROY_KEY, ID_KEY, Params};
use crate::schema::FormSchema;
use crate::settings::UnpermittedPolicy;
use serde_json::Value;
use std::sync::Arc;

pub(crate) struct Branch {
	/// Name used in errors raised for this level: the association name, or
	/// the model name at the root
	label: String,
	model: Box<dyn Model>,
	schema: Arc<FormSchema>,
	children: Vec<FormChild>,
	errors: Errors,
	/// Identifier handed out by an insert of the save in progress
	pending_id: Option<RecordId>,
	/// Matched the collection's reject predicate: still validated, never
	/// written
	rejected: bool,
	ctx: FormContext,
}

impl Branch {
	pub(crate) fn new(
		label: impl Into<String>,
		model: Box<dyn Model>,
		schema: Arc<FormSchema>,
		ctx: FormContext,
	) -> FormResult<Self> {
		check_declarations(&schema, model.as_ref())?;
		let children = resolve_children(&schema, model.as_ref(), &ctx)?;
		Ok(Self {
			label: label.into(),
			model,
			schema,
			children,
			errors: Errors::new(),
			pending_id: None,
			rejected: false,
			ctx,
		})
	}

	pub(crate) fn model(&self) -> &dyn Model {
		self.model.as_ref()
	}

	pub(crate) fn model_mut(&mut self) -> &mut dyn Model {
		self.model.as_mut()
	}

	pub(crate) fn into_model(self) -> Box<dyn Model> {
		self.model
	}

	pub(crate) fn schema(&self) -> &Arc<FormSchema> {
		&self.schema
	}

	pub(crate) fn ctx(&self) -> &FormContext {
		&self.ctx
	}

	pub(crate) fn errors(&self) -> &Errors {
		&self.errors
	}

	pub(crate) fn children(&self) -> &[FormChild] {
		&self.children
	}

	pub(crate) fn child(&self, association: &str) -> Option<&FormChild> {
		self.children.iter().find(|c| c.represents(association))
	}

	pub(crate) fn child_mut(&mut self, association: &str) -> Option<&mut FormChild> {
		self.children.iter_mut().find(|c| c.represents(association))
	}

	/// Swap in a new model and re-resolve the children against it. Returns
	/// the previous model.
	pub(crate) fn replace_model(&mut self, model: Box<dyn Model>) -> FormResult<Box<dyn Model>> {
		check_declarations(&self.schema, model.as_ref())?;
		let children = resolve_children(&self.schema, model.as_ref(), &self.ctx)?;
		let previous = std::mem::replace(&mut self.model, model);
		self.children = children;
		self.errors.clear();
		self.pending_id = None;
		self.rejected = false;
		Ok(previous)
	}

	pub(crate) fn is_rejected(&self) -> bool {
		self.rejected
	}

	pub(crate) fn set_rejected(&mut self, rejected: bool) {
		self.rejected = rejected;
	}

	/// Read a declared attribute.
	pub(crate) fn attribute(&self, name: &str) -> Option<Value> {
		self.schema
			.attribute_delegate()
			.read(self.model.as_ref(), name)
	}

	/// Write a declared attribute.
	pub(crate) fn set_attribute(&mut self, name: &str, value: Value) -> FormResult<()> {
		let written = self
			.schema
			.attribute_delegate()
			.write(self.model.as_mut(), name, value)?;
		if written {
			Ok(())
		} else {
			Err(FormError::UnpermittedAttribute {
				key: name.to_string(),
			})
		}
	}

	/// Apply one level of submitted parameters.
	pub(crate) fn submit(&mut self, params: &Params) -> FormResult<()> {
		for (key, value) in params {
			if let Some(association) = params::association_key(key)
				&& let Some(child) = self.children.iter_mut().find(|c| c.represents(association))
			{
				child.submit(value, self.model.as_ref())?;
				continue;
			}

			match key.as_str() {
				ID_KEY => self.check_id(value)?,
				DESTROY_KEY => {
					if params::is_destroy_marker(value, &self.ctx.settings().destroy_markers) {
						self.model.mark_for_destruction();
					}
				}
				_ => {
					let written = self.schema.attribute_delegate().write(
						self.model.as_mut(),
						key,
						value.clone(),
					)?;
					if !written {
						self.unpermitted(key)?;
					}
				}
			}
		}
		Ok(())
	}

	/// A submitted `id` addresses a record; it is never written. When both
	/// the submitted and the current id exist they have to agree.
	fn check_id(&self, value: &Value) -> FormResult<()> {
		match (params::parse_id(value)?, self.model.id()) {
			(Some(given), Some(current)) if given != current => Err(FormError::RecordNotFound {
				association: self.label.clone(),
				id: given,
			}),
			_ => Ok(()),
		}
	}

	fn unpermitted(&self, key: &str) -> FormResult<()> {
		match self.ctx.settings().unpermitted_attributes {
			UnpermittedPolicy::Ignore => {
				tracing::warn!(
					model = self.model.model_name(),
					key,
					"ignoring unpermitted attribute"
				);
				Ok(())
			}
			UnpermittedPolicy::Raise => Err(FormError::UnpermittedAttribute {
				key: key.to_string(),
			}),
		}
	}

	/// Rebuild the error set for this level and everything below it.
	///
	/// Models marked for destruction are skipped. Rejected rows are not.
	pub(crate) fn validate(&mut self) -> bool {
		self.errors.clear();
		if self.model.is_marked_for_destruction() {
			return true;
		}

		let model = self.model.as_ref();
		let blank_message = &self.ctx.settings().blank_message;
		for def in self.schema.attribute_delegate().required() {
			if def.read(model).is_none_or(|value| params::is_blank(&value)) {
				self.errors.add(def.name.as_str(), blank_message.as_str());
			}
		}
		for rule in self.schema.rules() {
			rule.check(model, &mut self.errors);
		}
		self.errors.merge(&model.validate());

		for child in &mut self.children {
			child.is_valid();
			self.errors
				.merge_prefixed(child.association_name(), child.errors());
		}

		self.errors.is_empty()
	}

	/// Write this level and everything below it inside `tx`.
	///
	/// Order: pending destroys of target-keyed children, owner-keyed targets
	/// (their id is copied into this model's foreign key), this model, then
	/// owner-keyed targets released by this model, then target-keyed
	/// children (this model's id is copied into theirs). A released target
	/// is destroyed only once nothing refers to it.
	pub(crate) fn persist(&mut self, tx: &mut dyn Transaction) -> FormResult<()> {
		if self.rejected {
			tracing::debug!(model = self.model.model_name(), "skipping rejected row");
			return Ok(());
		}

		for child in self.children.iter().filter(|c| !c.owner_holds_key()) {
			child.destroy_pending(tx)?;
		}

		if self.model.is_marked_for_destruction() {
			if self.model.is_persisted() {
				tracing::debug!(
					model = self.model.model_name(),
					id = ?self.model.id(),
					"destroying record"
				);
				tx.destroy(self.model.as_ref())?;
			}
			return self.release_owner_keyed(tx);
		}

		for child in self.children.iter_mut().filter(|c| c.owner_holds_key()) {
			let foreign_key = child.reflection().foreign_key.clone();
			for node in child.nodes_mut() {
				let target_id = if node.is_marked_for_destruction() {
					None
				} else {
					node.branch_mut().persist(tx)?;
					node.branch().saved_id()
				};
				self.model
					.set_attribute(&foreign_key, target_id.map_or(Value::Null, Value::from))?;
			}
		}

		let id = match self.model.id() {
			Some(id) => {
				tx.update(self.model.as_ref())?;
				id
			}
			None => {
				let id = tx.insert(self.model.as_ref())?;
				self.pending_id = Some(id);
				id
			}
		};

		self.release_owner_keyed(tx)?;

		for child in self.children.iter_mut().filter(|c| !c.owner_holds_key()) {
			let foreign_key = child.reflection().foreign_key.clone();
			for node in child.nodes_mut() {
				if !node.is_marked_for_destruction() {
					node.model_mut()
						.set_attribute(&foreign_key, Value::from(id))?;
				}
				node.branch_mut().persist(tx)?;
			}
		}

		Ok(())
	}

	/// Destroy owner-keyed targets this model no longer refers to: replaced
	/// records and targets marked for destruction.
	fn release_owner_keyed(&mut self, tx: &mut dyn Transaction) -> FormResult<()> {
		for child in self.children.iter_mut().filter(|c| c.owner_holds_key()) {
			child.destroy_pending(tx)?;
			for node in child
				.nodes_mut()
				.filter(|node| node.model().is_marked_for_destruction())
			{
				node.branch_mut().persist(tx)?;
			}
		}
		Ok(())
	}

	/// Stored id, or the id handed out by the save in progress.
	pub(crate) fn saved_id(&self) -> Option<RecordId> {
		self.model.id().or(self.pending_id)
	}

	/// Apply the outcome of a committed save.
	pub(crate) fn finish_save(&mut self) {
		if let Some(id) = self.pending_id.take() {
			self.model.mark_persisted(id);
		}
		let parent = self.model.as_ref();
		for child in &mut self.children {
			child.finish_save(parent);
		}
	}

	/// Forget ids handed out by a save that did not commit.
	pub(crate) fn clear_pending(&mut self) {
		self.pending_id = None;
		for child in &mut self.children {
			for node in child.nodes_mut() {
				node.branch_mut().clear_pending();
			}
		}
	}

	/// Detached node for `association`, built under this level's model.
	pub(crate) fn template(&self, association: &str) -> FormResult<FormNode> {
		let definition = self.schema.definition(association).ok_or_else(|| {
			ConfigurationError::UnknownAssociation {
				model: self.model.model_name().to_string(),
				association: association.to_string(),
			}
		})?;
		let reflection = self
			.ctx
			.backend()
			.reflect(self.model.model_name(), association)
			.ok_or_else(|| ConfigurationError::UnknownAssociation {
				model: self.model.model_name().to_string(),
				association: association.to_string(),
			})?;
		let model = self.ctx.backend().build(self.model.as_ref(), association)?;
		FormNode::new(definition.clone(), reflection, model, self.ctx.clone())
	}
}

fn check_declarations(schema: &FormSchema, model: &dyn Model) -> FormResult<()> {
	if let Some(expected) = schema.main_model()
		&& expected != model.model_name()
	{
		return Err(ConfigurationError::ModelMismatch {
			expected: expected.to_string(),
			actual: model.model_name().to_string(),
		}
		.into());
	}
	if let Some(def) = schema
		.attribute_delegate()
		.iter()
		.find(|def| !def.is_virtual() && !model.has_attribute(&def.name))
	{
		return Err(ConfigurationError::UnknownAttribute {
			model: model.model_name().to_string(),
			attribute: def.name.clone(),
		}
		.into());
	}
	Ok(())
}

fn resolve_children(
	schema: &FormSchema,
	model: &dyn Model,
	ctx: &FormContext,
) -> FormResult<Vec<FormChild>> {
	schema
		.definitions()
		.iter()
		.map(|definition| definition.resolve(model, ctx))
		.collect()
}
