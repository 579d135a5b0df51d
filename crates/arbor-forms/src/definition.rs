//! Association declarations and their resolution against a parent model

use crate::collection::FormNodeCollection;
use crate::context::FormContext;
use crate::error::{ConfigurationError, FormResult};
use crate::model::Model;
use crate::node::{FormChild, FormNode};
use crate::reflection::Cardinality;
use crate::schema::{AssociationOptions, FormSchema};
use std::sync::Arc;

/// One nested association declared on a form schema.
///
/// A definition is immutable. Resolving it against a parent model produces
/// either a single [`FormNode`] or a [`FormNodeCollection`], depending on
/// the association's cardinality as reported by the persistence layer.
#[derive(Debug, Clone)]
pub struct FormNodeDefinition {
	association_name: String,
	options: AssociationOptions,
	schema: Arc<FormSchema>,
}

impl FormNodeDefinition {
	pub fn new(
		association_name: impl Into<String>,
		options: AssociationOptions,
		schema: impl Into<Arc<FormSchema>>,
	) -> Self {
		Self {
			association_name: association_name.into(),
			options,
			schema: schema.into(),
		}
	}

	pub fn association_name(&self) -> &str {
		&self.association_name
	}

	pub fn options(&self) -> &AssociationOptions {
		&self.options
	}

	pub fn schema(&self) -> &Arc<FormSchema> {
		&self.schema
	}

	/// Materialize the nodes for this association under `parent`.
	///
	/// Single associations reuse the stored target of a stored parent and
	/// build a fresh one otherwise. Collections mirror the stored rows of a
	/// stored parent, or start with `records` fresh rows under a new parent.
	pub fn resolve(&self, parent: &dyn Model, ctx: &FormContext) -> FormResult<FormChild> {
		let backend = ctx.backend();
		let reflection = backend
			.reflect(parent.model_name(), &self.association_name)
			.ok_or_else(|| ConfigurationError::UnknownAssociation {
				model: parent.model_name().to_string(),
				association: self.association_name.clone(),
			})?;

		match reflection.cardinality() {
			Cardinality::Single => {
				let existing = if parent.is_persisted() {
					backend.load_one(parent, &self.association_name)?
				} else {
					None
				};
				let model = match existing {
					Some(model) => model,
					None => backend.build(parent, &self.association_name)?,
				};
				tracing::debug!(
					parent = parent.model_name(),
					association = %self.association_name,
					persisted = model.is_persisted(),
					"resolved single association"
				);
				let node = FormNode::new(self.clone(), reflection, model, ctx.clone())?;
				Ok(FormChild::Single(node))
			}
			Cardinality::Collection => {
				let models = if parent.is_persisted() {
					backend.load_many(parent, &self.association_name)?
				} else {
					let records = self
						.options
						.records
						.unwrap_or(ctx.settings().default_records);
					(0..records)
						.map(|_| backend.build(parent, &self.association_name))
						.collect::<Result<Vec<_>, _>>()?
				};
				tracing::debug!(
					parent = parent.model_name(),
					association = %self.association_name,
					rows = models.len(),
					"resolved collection association"
				);
				let nodes = models
					.into_iter()
					.map(|model| FormNode::new(self.clone(), reflection.clone(), model, ctx.clone()))
					.collect::<FormResult<Vec<_>>>()?;
				Ok(FormChild::Collection(FormNodeCollection::new(
					self.clone(),
					reflection,
					nodes,
					ctx.clone(),
				)))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::FormError;
	use crate::reflection::AssociationKind;
	use crate::testing::{StubBackend, blank_record};
	use rstest::rstest;

	fn survey_context() -> FormContext {
		StubBackend::new()
			.with("Survey", "questions", AssociationKind::HasMany, "Question")
			.with("Survey", "owner", AssociationKind::BelongsTo, "Person")
			.into_context()
	}

	#[rstest]
	#[case(Some(3), 3)]
	#[case(None, 1)]
	fn test_collection_for_new_parent_builds_rows(
		#[case] records: Option<usize>,
		#[case] expected: usize,
	) {
		// Arrange
		let mut options = AssociationOptions::new();
		if let Some(records) = records {
			options = options.records(records);
		}
		let definition =
			FormNodeDefinition::new("questions", options, FormSchema::new().attribute("content"));
		let parent = blank_record("Survey");

		// Act
		let child = definition.resolve(&parent, &survey_context()).unwrap();

		// Assert
		let collection = child.as_collection().unwrap();
		assert_eq!(collection.len(), expected);
		assert!(collection.iter().all(|node| node.model().model_name() == "Question"));
	}

	#[rstest]
	fn test_cardinality_comes_from_the_reflection() {
		let definition = FormNodeDefinition::new(
			"owner",
			AssociationOptions::new().records(4),
			FormSchema::new().attribute("name"),
		);
		let parent = blank_record("Survey");

		let child = definition.resolve(&parent, &survey_context()).unwrap();

		let node = child.as_node().unwrap();
		assert_eq!(node.model().model_name(), "Person");
		assert!(child.owner_holds_key());
	}

	#[rstest]
	fn test_unknown_association_is_a_configuration_error() {
		let definition =
			FormNodeDefinition::new("tags", AssociationOptions::new(), FormSchema::new());
		let parent = blank_record("Survey");

		let error = definition.resolve(&parent, &survey_context()).unwrap_err();

		assert!(error.is_configuration());
		assert!(matches!(
			error,
			FormError::Configuration(ConfigurationError::UnknownAssociation { ref model, ref association })
				if model == "Survey" && association == "tags"
		));
	}
}
