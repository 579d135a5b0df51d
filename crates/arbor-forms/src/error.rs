use crate::backend::PersistenceError;
use crate::model::{ModelError, RecordId};

/// Declaration problems detected while a form tree is being built.
///
/// These are programming errors: the form schema names something the model
/// layer does not know about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
	#[error("association `{association}` is not defined on model `{model}`")]
	UnknownAssociation { model: String, association: String },
	#[error("attribute `{attribute}` is not defined on model `{model}`")]
	UnknownAttribute { model: String, attribute: String },
	#[error("form is declared for model `{expected}` but was given `{actual}`")]
	ModelMismatch { expected: String, actual: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
	#[error(transparent)]
	Configuration(#[from] ConfigurationError),
	#[error("couldn't find `{association}` record with id={id}")]
	RecordNotFound { association: String, id: RecordId },
	#[error(
		"maximum {limit} records are allowed for `{association}`, got {given} records instead"
	)]
	TooManyRecords {
		association: String,
		limit: usize,
		given: usize,
	},
	#[error("unpermitted attribute `{key}`")]
	UnpermittedAttribute { key: String },
	#[error("invalid parameters: {0}")]
	InvalidParams(String),
	#[error(transparent)]
	Model(#[from] ModelError),
	#[error(transparent)]
	Persistence(#[from] PersistenceError),
}

pub type FormResult<T> = Result<T, FormError>;

impl FormError {
	/// Whether this error comes from a bad declaration rather than bad data.
	pub fn is_configuration(&self) -> bool {
		matches!(self, FormError::Configuration(_))
	}
}
