//! The model contract consumed by form nodes
//!
//! Forms never define models. Whatever the persistence layer hands out must
//! implement [`Model`]: attribute access by name, identity, persistence
//! state, model-level validation and the soft destroy flag.

use crate::errors::Errors;
use convert_case::{Case, Casing};
use serde_json::Value;

/// Primary key type used for every record reachable from a form.
pub type RecordId = i64;

/// Errors raised by a model when an attribute write is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
	#[error("unknown attribute `{attribute}` for {model}")]
	UnknownAttribute { model: String, attribute: String },
	#[error("invalid value for {model}.{attribute}: {reason}")]
	InvalidValue {
		model: String,
		attribute: String,
		reason: String,
	},
}

/// A persistable record as seen by a form node.
///
/// Implementations are usually thin adapters over the application's ORM
/// types. Attribute values travel as [`serde_json::Value`] so that submitted
/// parameters can be written without per-type glue.
pub trait Model {
	/// Name of the model type, used for association reflection (e.g. `"Survey"`).
	fn model_name(&self) -> &'static str;

	/// Primary key, if the record has been stored.
	fn id(&self) -> Option<RecordId>;

	/// Whether the record is durably stored.
	fn is_persisted(&self) -> bool {
		self.id().is_some()
	}

	/// Record the identifier assigned by the persistence layer after a
	/// committed insert.
	fn mark_persisted(&mut self, id: RecordId);

	/// Whether `name` is a readable/writable attribute of this model.
	fn has_attribute(&self, name: &str) -> bool;

	/// Current value of an attribute, `None` when the attribute is unknown.
	fn attribute(&self, name: &str) -> Option<Value>;

	/// Write an attribute value.
	fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), ModelError>;

	/// Run model-level validations (uniqueness, format, ...).
	fn validate(&self) -> Errors;

	/// Flag the record for removal on the next save.
	fn mark_for_destruction(&mut self);

	fn is_marked_for_destruction(&self) -> bool;

	/// Identity key for rendering helpers.
	fn to_key(&self) -> Option<Vec<RecordId>> {
		self.id().map(|id| vec![id])
	}

	/// URL parameter for rendering helpers.
	fn to_param(&self) -> Option<String> {
		self.id().map(|id| id.to_string())
	}

	/// Partial template path, e.g. `"surveys/survey"` for `Survey`.
	fn partial_path(&self) -> String {
		let singular = self.model_name().to_case(Case::Snake);
		format!("{}s/{}", singular, singular)
	}
}

impl std::fmt::Debug for dyn Model + '_ {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Model")
			.field("model_name", &self.model_name())
			.field("id", &self.id())
			.field("marked_for_destruction", &self.is_marked_for_destruction())
			.finish()
	}
}
