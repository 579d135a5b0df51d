//! Form engine settings
//!
//! Behaviour that applications commonly tune lives in [`FormSettings`]. The
//! struct deserializes from TOML with every field optional, so a project file
//! only names what it changes:
//!
//! ```toml
//! default_records = 2
//! unpermitted_attributes = "raise"
//! ```

use serde::{Deserialize, Serialize};

/// What to do with a submitted key that is neither a declared attribute nor
/// a declared `<association>_attributes` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpermittedPolicy {
	/// Drop the key and log it at `warn` level
	#[default]
	Ignore,
	/// Fail the submission with `FormError::UnpermittedAttribute`
	Raise,
}

/// When collection rows matching the reject predicate are left out of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectScope {
	/// Rows are never rejected
	Never,
	/// Only rows of collections whose parent is not stored yet
	#[default]
	NewParent,
	/// Rows of any collection; rejected stored rows are destroyed on save
	Always,
}

/// Settings error
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Validation error: {0}")]
	Validation(String),
}

/// Engine-wide settings shared by every node of a form tree.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
	/// Number of rows built for a collection whose parent is not stored yet,
	/// unless the association declares its own count
	pub default_records: usize,

	pub unpermitted_attributes: UnpermittedPolicy,

	/// Default reject scope; associations may override it
	pub reject_blank_rows: RejectScope,

	/// `_destroy` values that request removal. JSON `true` always does.
	pub destroy_markers: Vec<String>,

	/// Message recorded for a missing required attribute
	pub blank_message: String,
}

impl Default for FormSettings {
	fn default() -> Self {
		Self {
			default_records: 1,
			unpermitted_attributes: UnpermittedPolicy::Ignore,
			reject_blank_rows: RejectScope::NewParent,
			destroy_markers: vec!["1".to_string()],
			blank_message: "can't be blank".to_string(),
		}
	}
}

impl FormSettings {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse settings from a TOML document. Missing keys keep their defaults.
	///
	/// # Examples
	///
	/// ```
	/// use arbor_forms::{FormSettings, UnpermittedPolicy};
	///
	/// let settings = FormSettings::from_toml_str("unpermitted_attributes = \"raise\"").unwrap();
	/// assert_eq!(settings.unpermitted_attributes, UnpermittedPolicy::Raise);
	/// assert_eq!(settings.default_records, 1);
	/// ```
	pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
		let settings: FormSettings = toml::from_str(contents)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Reject settings that can never describe a usable form.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.destroy_markers.iter().any(|marker| marker.is_empty()) {
			return Err(SettingsError::Validation(
				"destroy_markers must not contain an empty marker".to_string(),
			));
		}
		if self.blank_message.trim().is_empty() {
			return Err(SettingsError::Validation(
				"blank_message must not be empty".to_string(),
			));
		}
		Ok(())
	}

	pub fn with_default_records(mut self, records: usize) -> Self {
		self.default_records = records;
		self
	}

	pub fn with_unpermitted_attributes(mut self, policy: UnpermittedPolicy) -> Self {
		self.unpermitted_attributes = policy;
		self
	}

	pub fn with_reject_blank_rows(mut self, scope: RejectScope) -> Self {
		self.reject_blank_rows = scope;
		self
	}

	pub fn with_destroy_markers<I, S>(mut self, markers: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.destroy_markers = markers.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_blank_message(mut self, message: impl Into<String>) -> Self {
		self.blank_message = message.into();
		self
	}
}
