//! Declared attributes of a form node
//!
//! A node forwards reads and writes of its declared attributes to its model.
//! The table of declarations is an [`AttributeDelegate`]; it is built once per
//! schema and shared by every node instantiated from that schema.

use crate::model::{Model, ModelError};
use crate::params::UNASSIGNABLE_KEYS;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Custom read accessor for a virtual attribute.
pub type Getter = Arc<dyn Fn(&dyn Model) -> Option<Value> + Send + Sync>;

/// Custom write accessor for a virtual attribute.
pub type Setter = Arc<dyn Fn(&mut dyn Model, Value) -> Result<(), ModelError> + Send + Sync>;

/// One declared attribute.
#[derive(Clone)]
pub struct AttributeDef {
	pub name: String,
	/// Whether presence is validated
	pub required: bool,
	getter: Option<Getter>,
	setter: Option<Setter>,
}

impl AttributeDef {
	/// # Examples
	///
	/// ```
	/// use arbor_forms::AttributeDef;
	///
	/// let def = AttributeDef::new("name").required();
	/// assert_eq!(def.name, "name");
	/// assert!(def.required);
	/// assert!(!def.is_virtual());
	/// ```
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			required: false,
			getter: None,
			setter: None,
		}
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	pub fn with_getter<F>(mut self, getter: F) -> Self
	where
		F: Fn(&dyn Model) -> Option<Value> + Send + Sync + 'static,
	{
		self.getter = Some(Arc::new(getter));
		self
	}

	pub fn with_setter<F>(mut self, setter: F) -> Self
	where
		F: Fn(&mut dyn Model, Value) -> Result<(), ModelError> + Send + Sync + 'static,
	{
		self.setter = Some(Arc::new(setter));
		self
	}

	/// Whether the attribute is served by custom accessors instead of a
	/// model column.
	pub fn is_virtual(&self) -> bool {
		self.getter.is_some() || self.setter.is_some()
	}

	pub fn read(&self, model: &dyn Model) -> Option<Value> {
		match &self.getter {
			Some(getter) => getter(model),
			None => model.attribute(&self.name),
		}
	}

	pub fn write(&self, model: &mut dyn Model, value: Value) -> Result<(), ModelError> {
		match &self.setter {
			Some(setter) => setter(model, value),
			None => model.set_attribute(&self.name, value),
		}
	}
}

impl fmt::Debug for AttributeDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AttributeDef")
			.field("name", &self.name)
			.field("required", &self.required)
			.field("getter", &self.getter.is_some())
			.field("setter", &self.setter.is_some())
			.finish()
	}
}

/// Ordered table of declared attributes.
#[derive(Debug, Clone, Default)]
pub struct AttributeDelegate {
	attributes: Vec<AttributeDef>,
}

impl AttributeDelegate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declare an attribute. Declaring a name twice replaces the earlier
	/// definition in place.
	///
	/// # Examples
	///
	/// ```
	/// use arbor_forms::{AttributeDef, AttributeDelegate};
	///
	/// let mut delegate = AttributeDelegate::new();
	/// delegate.declare(AttributeDef::new("name"));
	/// delegate.declare(AttributeDef::new("city"));
	/// delegate.declare(AttributeDef::new("name").required());
	///
	/// assert_eq!(delegate.names().collect::<Vec<_>>(), vec!["name", "city"]);
	/// assert!(delegate.get("name").unwrap().required);
	/// ```
	pub fn declare(&mut self, def: AttributeDef) {
		match self.attributes.iter_mut().find(|a| a.name == def.name) {
			Some(existing) => *existing = def,
			None => self.attributes.push(def),
		}
	}

	pub fn get(&self, name: &str) -> Option<&AttributeDef> {
		self.attributes.iter().find(|a| a.name == name)
	}

	pub fn is_declared(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.attributes.iter().map(|a| a.name.as_str())
	}

	/// Attributes whose presence is validated, in declaration order.
	pub fn required(&self) -> impl Iterator<Item = &AttributeDef> {
		self.attributes.iter().filter(|a| a.required)
	}

	pub fn iter(&self) -> impl Iterator<Item = &AttributeDef> {
		self.attributes.iter()
	}

	pub fn len(&self) -> usize {
		self.attributes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}

	/// Read a declared attribute; `None` for undeclared names.
	pub fn read(&self, model: &dyn Model, name: &str) -> Option<Value> {
		self.get(name).and_then(|def| def.read(model))
	}

	/// Write a declared attribute. Returns `Ok(false)` without touching the
	/// model when `name` is not declared.
	pub fn write(
		&self,
		model: &mut dyn Model,
		name: &str,
		value: Value,
	) -> Result<bool, ModelError> {
		match self.get(name) {
			Some(def) => {
				def.write(model, value)?;
				Ok(true)
			}
			None => Ok(false),
		}
	}
}

/// Keys a node accepts for itself: its declared attributes plus `id` and
/// `_destroy`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeWhitelist {
	keys: Vec<String>,
}

impl AttributeWhitelist {
	/// # Examples
	///
	/// ```
	/// use arbor_forms::{AttributeDef, AttributeDelegate, AttributeWhitelist};
	///
	/// let mut delegate = AttributeDelegate::new();
	/// delegate.declare(AttributeDef::new("content"));
	///
	/// let whitelist = AttributeWhitelist::from_delegate(&delegate);
	/// assert!(whitelist.allows("content"));
	/// assert!(whitelist.allows("id"));
	/// assert!(whitelist.allows("_destroy"));
	/// assert!(!whitelist.allows("survey_id"));
	/// ```
	pub fn from_delegate(delegate: &AttributeDelegate) -> Self {
		let mut keys: Vec<String> = delegate.names().map(str::to_string).collect();
		for key in UNASSIGNABLE_KEYS {
			if !keys.iter().any(|k| k == key) {
				keys.push(key.to_string());
			}
		}
		Self { keys }
	}

	pub fn allows(&self, key: &str) -> bool {
		self.keys.iter().any(|k| k == key)
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.keys.iter().map(String::as_str)
	}
}
