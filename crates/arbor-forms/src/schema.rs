//! Form declarations
//!
//! A [`FormSchema`] declares what one level of a form tree accepts: the
//! attributes forwarded to the level's model, the nested associations, and
//! the node-local validation rules. Schemas are immutable once built and are
//! shared between every node instantiated from them.

use crate::attribute::{AttributeDef, AttributeDelegate, AttributeWhitelist};
use crate::definition::FormNodeDefinition;
use crate::params::{Params, association_key};
use crate::settings::RejectScope;
use crate::validators::Rule;
use std::fmt;
use std::sync::Arc;

/// Reject predicate for collection rows. Receives the submitted row,
/// `id` and `_destroy` included.
pub type RejectIf = Arc<dyn Fn(&Params) -> bool + Send + Sync>;

/// Per-association options.
#[derive(Clone, Default)]
pub struct AssociationOptions {
	/// Rows built for a collection whose parent is not stored yet
	pub records: Option<usize>,
	/// Maximum number of rows one submission may carry
	pub limit: Option<usize>,
	reject_if: Option<RejectIf>,
	/// Overrides the settings-wide reject scope
	pub reject_scope: Option<RejectScope>,
}

impl AssociationOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn records(mut self, records: usize) -> Self {
		self.records = Some(records);
		self
	}

	pub fn limit(mut self, limit: usize) -> Self {
		self.limit = Some(limit);
		self
	}

	/// Replace the default all-blank reject predicate.
	pub fn reject_if<F>(mut self, predicate: F) -> Self
	where
		F: Fn(&Params) -> bool + Send + Sync + 'static,
	{
		self.reject_if = Some(Arc::new(predicate));
		self
	}

	pub fn reject_scope(mut self, scope: RejectScope) -> Self {
		self.reject_scope = Some(scope);
		self
	}

	pub fn reject_predicate(&self) -> Option<&RejectIf> {
		self.reject_if.as_ref()
	}
}

impl fmt::Debug for AssociationOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AssociationOptions")
			.field("records", &self.records)
			.field("limit", &self.limit)
			.field("reject_if", &self.reject_if.is_some())
			.field("reject_scope", &self.reject_scope)
			.finish()
	}
}

/// Declaration of one level of a form tree.
///
/// # Examples
///
/// ```
/// use arbor_forms::{AssociationOptions, FormSchema};
///
/// let schema = FormSchema::new()
///     .for_model("Survey")
///     .required_attributes(["name"])
///     .association_with(
///         "questions",
///         AssociationOptions::new().records(1),
///         FormSchema::new()
///             .required_attributes(["content"])
///             .association_with(
///                 "answers",
///                 AssociationOptions::new().records(2),
///                 FormSchema::new().required_attributes(["content"]),
///             ),
///     );
///
/// assert!(schema.permits("name"));
/// assert!(schema.permits("questions_attributes"));
/// assert!(!schema.permits("answers_attributes"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormSchema {
	main_model: Option<String>,
	attributes: AttributeDelegate,
	definitions: Vec<FormNodeDefinition>,
	rules: Vec<Rule>,
}

impl FormSchema {
	pub fn new() -> Self {
		Self::default()
	}

	/// Bind the schema to a model type. Instantiating it over a model of
	/// another type fails with a configuration error.
	pub fn for_model(mut self, model_name: impl Into<String>) -> Self {
		self.main_model = Some(model_name.into());
		self
	}

	pub fn attribute(mut self, name: impl Into<String>) -> Self {
		self.attributes.declare(AttributeDef::new(name));
		self
	}

	pub fn attributes<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		for name in names {
			self.attributes.declare(AttributeDef::new(name));
		}
		self
	}

	/// Declare attributes whose presence is validated.
	pub fn required_attributes<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		for name in names {
			self.attributes.declare(AttributeDef::new(name).required());
		}
		self
	}

	/// Declare an attribute with a full definition, e.g. a virtual one.
	pub fn attribute_def(mut self, def: AttributeDef) -> Self {
		self.attributes.declare(def);
		self
	}

	/// Nest a form for `association` with default options.
	pub fn association(self, association: impl Into<String>, schema: FormSchema) -> Self {
		self.association_with(association, AssociationOptions::default(), schema)
	}

	pub fn association_with(
		mut self,
		association: impl Into<String>,
		options: AssociationOptions,
		schema: FormSchema,
	) -> Self {
		let definition = FormNodeDefinition::new(association, options, schema);
		match self
			.definitions
			.iter_mut()
			.find(|d| d.association_name() == definition.association_name())
		{
			Some(existing) => *existing = definition,
			None => self.definitions.push(definition),
		}
		self
	}

	/// Attach a node-local validation rule.
	pub fn validate(mut self, rule: Rule) -> Self {
		self.rules.push(rule);
		self
	}

	pub fn main_model(&self) -> Option<&str> {
		self.main_model.as_deref()
	}

	pub fn attribute_delegate(&self) -> &AttributeDelegate {
		&self.attributes
	}

	pub fn definitions(&self) -> &[FormNodeDefinition] {
		&self.definitions
	}

	pub fn definition(&self, association: &str) -> Option<&FormNodeDefinition> {
		self.definitions
			.iter()
			.find(|d| d.association_name() == association)
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	pub fn whitelist(&self) -> AttributeWhitelist {
		AttributeWhitelist::from_delegate(&self.attributes)
	}

	/// Keys this level accepts: declared attributes, `id`, `_destroy` and one
	/// `<association>_attributes` key per nested association.
	pub fn permitted_keys(&self) -> Vec<String> {
		self.whitelist()
			.iter()
			.map(str::to_string)
			.chain(
				self.definitions
					.iter()
					.map(|d| format!("{}_attributes", d.association_name())),
			)
			.collect()
	}

	pub fn permits(&self, key: &str) -> bool {
		match association_key(key) {
			Some(association) if self.definition(association).is_some() => true,
			_ => self.whitelist().allows(key),
		}
	}
}
