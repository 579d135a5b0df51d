//! The root of a form tree

use crate::backend::Backend;
use crate::branch::Branch;
use crate::collection::FormNodeCollection;
use crate::context::FormContext;
use crate::error::{FormError, FormResult};
use crate::errors::Errors;
use crate::model::{Model, RecordId};
use crate::node::{FormChild, FormNode};
use crate::schema::FormSchema;
use crate::settings::FormSettings;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// A form bound to an externally supplied root model.
///
/// The root form resolves the nested associations declared by its schema,
/// accepts submissions for the whole tree, validates it and saves it inside
/// one transaction.
pub struct RootForm {
	branch: Branch,
}

impl RootForm {
	/// Bind `schema` to `model` with default settings.
	pub fn new<M>(
		model: M,
		schema: impl Into<Arc<FormSchema>>,
		backend: Rc<dyn Backend>,
	) -> FormResult<Self>
	where
		M: Model + 'static,
	{
		Self::with_context(Box::new(model), schema, FormContext::with_backend(backend))
	}

	/// Bind `schema` to `model` with explicit settings.
	pub fn with_settings<M>(
		model: M,
		schema: impl Into<Arc<FormSchema>>,
		backend: Rc<dyn Backend>,
		settings: impl Into<Arc<FormSettings>>,
	) -> FormResult<Self>
	where
		M: Model + 'static,
	{
		Self::with_context(Box::new(model), schema, FormContext::new(backend, settings))
	}

	pub fn with_context(
		model: Box<dyn Model>,
		schema: impl Into<Arc<FormSchema>>,
		ctx: FormContext,
	) -> FormResult<Self> {
		let schema = schema.into();
		let label = model.model_name();
		let branch = Branch::new(label, model, schema, ctx)?;
		tracing::debug!(
			model = branch.model().model_name(),
			persisted = branch.model().is_persisted(),
			associations = branch.children().len(),
			"form tree resolved"
		);
		Ok(Self { branch })
	}

	pub fn model(&self) -> &dyn Model {
		self.branch.model()
	}

	pub fn model_mut(&mut self) -> &mut dyn Model {
		self.branch.model_mut()
	}

	pub fn into_model(self) -> Box<dyn Model> {
		self.branch.into_model()
	}

	pub fn schema(&self) -> &FormSchema {
		self.branch.schema()
	}

	pub fn settings(&self) -> &FormSettings {
		self.branch.ctx().settings()
	}

	/// Apply a submission to the whole tree.
	///
	/// `params` must be an object of attribute keys and
	/// `<association>_attributes` keys.
	pub fn submit(&mut self, params: &Value) -> FormResult<()> {
		let params = params.as_object().ok_or_else(|| {
			FormError::InvalidParams("submitted parameters must be an object".to_string())
		})?;
		self.branch.submit(params)
	}

	/// Validate the whole tree. Nested failures are reported under
	/// association-qualified keys such as `questions.answers.content`.
	pub fn is_valid(&mut self) -> bool {
		self.branch.validate()
	}

	pub fn errors(&self) -> &Errors {
		self.branch.errors()
	}

	/// Validate, then write the whole tree inside one transaction.
	///
	/// Returns `Ok(false)` without touching storage when the tree is invalid.
	/// On a persistence failure the transaction is rolled back, no ids are
	/// assigned and the error is returned.
	pub fn save(&mut self) -> FormResult<bool> {
		if !self.is_valid() {
			tracing::debug!(
				model = self.model().model_name(),
				errors = self.errors().len(),
				"form is invalid, nothing saved"
			);
			return Ok(false);
		}

		let ctx = self.branch.ctx().clone();
		let mut tx = ctx.backend().begin()?;
		if let Err(error) = self.branch.persist(tx.as_mut()) {
			if let Err(rollback_error) = tx.rollback() {
				tracing::warn!(
					error = %rollback_error,
					"rollback failed after save error"
				);
			}
			self.branch.clear_pending();
			return Err(error);
		}
		if let Err(error) = tx.commit() {
			self.branch.clear_pending();
			return Err(error.into());
		}

		self.branch.finish_save();
		tracing::info!(
			model = self.model().model_name(),
			id = ?self.model().id(),
			"form saved"
		);
		Ok(true)
	}

	/// Mark the root model for destruction on the next save.
	pub fn delete(&mut self) {
		self.branch.model_mut().mark_for_destruction();
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

	/// The single node standing for `association`, if it is a to-one one.
	pub fn node(&self, association: &str) -> Option<&FormNode> {
		self.child(association).and_then(FormChild::as_node)
	}

	/// The collection standing for `association`, if it is a to-many one.
	pub fn collection(&self, association: &str) -> Option<&FormNodeCollection> {
		self.child(association).and_then(FormChild::as_collection)
	}

	/// Detached node for a nested association, built under the root model.
	pub fn get_model(&self, association: &str) -> FormResult<FormNode> {
		self.branch.template(association)
	}

	/// Whether a top-level submission key is accepted.
	pub fn permits(&self, key: &str) -> bool {
		self.branch.schema().permits(key)
	}

	pub fn permitted_keys(&self) -> Vec<String> {
		self.branch.schema().permitted_keys()
	}

	pub fn is_persisted(&self) -> bool {
		self.model().is_persisted()
	}

	pub fn to_key(&self) -> Option<Vec<RecordId>> {
		self.model().to_key()
	}

	pub fn to_param(&self) -> Option<String> {
		self.model().to_param()
	}

	pub fn to_partial_path(&self) -> String {
		self.model().partial_path()
	}
}

impl fmt::Debug for RootForm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RootForm")
			.field("model", &self.model())
			.field("children", &self.children())
			.field("errors", self.errors())
			.finish()
	}
}
