//! Node-local validation rules
//!
//! Rules run against a node's model after the presence checks derived from
//! required attributes, and before the model's own validations. Each rule
//! records its failures directly into the node's [`Errors`].

use crate::errors::Errors;
use crate::model::Model;
use crate::params::is_blank;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

type RuleFn = Arc<dyn Fn(&dyn Model, &mut Errors) + Send + Sync>;

/// A validation rule attached to a form schema.
///
/// # Examples
///
/// ```
/// use arbor_forms::{Errors, Rule};
///
/// let rule = Rule::custom(|model, errors| {
///     if model.attribute("closed").and_then(|v| v.as_bool()) == Some(true) {
///         errors.add("base", "survey is closed");
///     }
/// });
/// assert_eq!(format!("{:?}", rule), "Rule(custom)");
/// ```
#[derive(Clone)]
pub struct Rule {
	kind: &'static str,
	check: RuleFn,
}

impl Rule {
	/// Arbitrary check over the whole model.
	pub fn custom<F>(check: F) -> Self
	where
		F: Fn(&dyn Model, &mut Errors) + Send + Sync + 'static,
	{
		Self {
			kind: "custom",
			check: Arc::new(check),
		}
	}

	/// `attribute` must not be blank.
	pub fn presence(attribute: impl Into<String>, message: impl Into<String>) -> Self {
		let attribute = attribute.into();
		let message = message.into();
		Self {
			kind: "presence",
			check: Arc::new(move |model, errors| {
				if model.attribute(&attribute).is_none_or(|value| is_blank(&value)) {
					errors.add(attribute.as_str(), message.as_str());
				}
			}),
		}
	}

	/// Character length of a string attribute (or element count of an array)
	/// must fall within `range`. Blank values are left to presence checks.
	///
	/// # Examples
	///
	/// ```
	/// use arbor_forms::Rule;
	///
	/// let rule = Rule::length("name", 2..=20);
	/// # let _ = rule;
	/// ```
	pub fn length(attribute: impl Into<String>, range: impl RangeBounds<usize>) -> Self {
		let attribute = attribute.into();
		let min = match range.start_bound() {
			Bound::Included(n) => Some(*n),
			Bound::Excluded(n) => Some(n + 1),
			Bound::Unbounded => None,
		};
		let max = match range.end_bound() {
			Bound::Included(n) => Some(*n),
			Bound::Excluded(n) => Some(n.saturating_sub(1)),
			Bound::Unbounded => None,
		};
		Self {
			kind: "length",
			check: Arc::new(move |model, errors| {
				let len = match model.attribute(&attribute) {
					Some(Value::String(s)) if !s.is_empty() => s.chars().count(),
					Some(Value::Array(items)) if !items.is_empty() => items.len(),
					_ => return,
				};
				if let Some(min) = min
					&& len < min
				{
					errors.add(
						attribute.as_str(),
						format!("is too short (minimum is {} characters)", min),
					);
				}
				if let Some(max) = max
					&& len > max
				{
					errors.add(
						attribute.as_str(),
						format!("is too long (maximum is {} characters)", max),
					);
				}
			}),
		}
	}

	/// `attribute` must be numeric, either a JSON number or a numeric string.
	/// Blank values are left to presence checks.
	pub fn numericality(attribute: impl Into<String>, only_integer: bool) -> Self {
		let attribute = attribute.into();
		Self {
			kind: "numericality",
			check: Arc::new(move |model, errors| {
				let value = match model.attribute(&attribute) {
					Some(value) if !is_blank(&value) => value,
					_ => return,
				};
				let (numeric, integer) = match &value {
					Value::Number(n) => (true, n.is_i64() || n.is_u64()),
					Value::String(s) => {
						let s = s.trim();
						(s.parse::<f64>().is_ok(), s.parse::<i64>().is_ok())
					}
					_ => (false, false),
				};
				if !numeric {
					errors.add(attribute.as_str(), "is not a number");
				} else if only_integer && !integer {
					errors.add(attribute.as_str(), "must be an integer");
				}
			}),
		}
	}

	/// String attribute must match `pattern`. Blank values are left to
	/// presence checks.
	pub fn format(attribute: impl Into<String>, pattern: Regex) -> Self {
		let attribute = attribute.into();
		Self {
			kind: "format",
			check: Arc::new(move |model, errors| {
				if let Some(Value::String(s)) = model.attribute(&attribute)
					&& !s.trim().is_empty()
					&& !pattern.is_match(&s)
				{
					errors.add(attribute.as_str(), "is invalid");
				}
			}),
		}
	}

	pub fn check(&self, model: &dyn Model, errors: &mut Errors) {
		(self.check)(model, errors)
	}
}

impl fmt::Debug for Rule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Rule({})", self.kind)
	}
}
