//! Mock collaborators built with `mockall`
//!
//! Use these when a test needs to observe how a form talks to its model or
//! to the association catalog; use [`MemoryStore`](crate::MemoryStore) when
//! it needs working persistence.

use arbor_forms::{AssociationCatalog, Errors, Model, ModelError, RecordId, Reflection};
use mockall::mock;
use rstest::fixture;
use serde_json::Value;

mock! {
	/// Mock implementation of [`Model`].
	///
	/// # Direct Usage Example
	///
	/// ```rust
	/// use arbor_forms::Model;
	/// use arbor_test::mock::MockRecord;
	///
	/// let mut model = MockRecord::new();
	/// model.expect_model_name().return_const("Survey");
	/// model.expect_id().return_const(None);
	///
	/// assert_eq!(model.model_name(), "Survey");
	/// assert!(!model.is_persisted());
	/// ```
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
	/// Mock implementation of [`AssociationCatalog`].
	pub Catalog {}

	impl AssociationCatalog for Catalog {
		fn reflect(&self, model_name: &str, association: &str) -> Option<Reflection>;
	}
}

/// Fixture providing an unsaved model with no attributes.
///
/// Every attribute lookup misses, validation passes and writes are
/// rejected as unknown. Add expectations for anything else.
#[fixture]
pub fn blank_record() -> MockRecord {
	let mut model = MockRecord::new();

	model.expect_model_name().return_const("Blank");
	model.expect_id().return_const(None);
	model.expect_has_attribute().return_const(false);
	model.expect_attribute().returning(|_| None);
	model.expect_validate().returning(Errors::new);
	model.expect_is_marked_for_destruction().return_const(false);
	model.expect_set_attribute().returning(|name, _| {
		Err(ModelError::UnknownAttribute {
			model: "Blank".to_string(),
			attribute: name.to_string(),
		})
	});

	model
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_blank_record_defaults(blank_record: MockRecord) {
		let mut model = blank_record;

		assert_eq!(model.model_name(), "Blank");
		assert!(!model.is_persisted());
		assert!(model.validate().is_empty());
		assert!(matches!(
			model.set_attribute("name", json!("x")),
			Err(ModelError::UnknownAttribute { .. })
		));
	}

	#[rstest]
	fn test_catalog_expectation() {
		let mut catalog = MockCatalog::new();
		catalog
			.expect_reflect()
			.withf(|model, association| model == "Survey" && association == "questions")
			.returning(|_, _| {
				Some(Reflection::new(
					"questions",
					arbor_forms::AssociationKind::HasMany,
					"Question",
					"survey_id",
				))
			});

		let reflection = catalog.reflect("Survey", "questions").unwrap();
		assert!(reflection.is_collection());
	}
}
