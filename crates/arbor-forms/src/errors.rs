//! Aggregated validation errors
//!
//! An [`Errors`] set maps a field path to its messages. Paths are plain
//! attribute names at the level that produced them; every enclosing form
//! prefixes the association name it reached them through, so a blank answer
//! two levels down surfaces at the root as `questions.answers.content`.

use indexmap::IndexMap;
use serde::Serialize;

/// Key used for errors that don't belong to a single attribute.
pub const BASE_KEY: &str = "base";

/// Ordered mapping from field path to messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Errors {
	messages: IndexMap<String, Vec<String>>,
}

impl Errors {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a message under `key`. A message already present under the same
	/// key is not repeated.
	///
	/// # Examples
	///
	/// ```
	/// use arbor_forms::Errors;
	///
	/// let mut errors = Errors::new();
	/// errors.add("name", "can't be blank");
	/// errors.add("name", "can't be blank");
	/// errors.add("name", "is too short");
	///
	/// assert_eq!(errors.get("name"), ["can't be blank", "is too short"]);
	/// ```
	pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
		let message = message.into();
		let entry = self.messages.entry(key.into()).or_default();
		if !entry.contains(&message) {
			entry.push(message);
		}
	}

	/// Messages recorded under `key`; empty when there are none.
	pub fn get(&self, key: &str) -> &[String] {
		self.messages.get(key).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.messages.contains_key(key)
	}

	/// Whether `message` was recorded under `key`.
	pub fn includes(&self, key: &str, message: &str) -> bool {
		self.get(key).iter().any(|m| m == message)
	}

	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}

	/// Number of distinct keys with at least one message.
	pub fn len(&self) -> usize {
		self.messages.len()
	}

	pub fn clear(&mut self) {
		self.messages.clear();
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.messages.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.messages
			.iter()
			.map(|(key, messages)| (key.as_str(), messages.as_slice()))
	}

	/// Copy every message of `other` under the same keys.
	pub fn merge(&mut self, other: &Errors) {
		for (key, messages) in other.iter() {
			for message in messages {
				self.add(key, message.as_str());
			}
		}
	}

	/// Copy every message of `other`, qualifying each key as `prefix.key`.
	///
	/// # Examples
	///
	/// ```
	/// use arbor_forms::Errors;
	///
	/// let mut answer = Errors::new();
	/// answer.add("content", "can't be blank");
	///
	/// let mut question = Errors::new();
	/// question.merge_prefixed("answers", &answer);
	///
	/// let mut survey = Errors::new();
	/// survey.merge_prefixed("questions", &question);
	///
	/// assert!(survey.includes("questions.answers.content", "can't be blank"));
	/// ```
	pub fn merge_prefixed(&mut self, prefix: &str, other: &Errors) {
		for (key, messages) in other.iter() {
			let qualified = format!("{}.{}", prefix, key);
			for message in messages {
				self.add(qualified.as_str(), message.as_str());
			}
		}
	}

	/// Human-readable messages, `"questions.content can't be blank"` style.
	/// Messages under [`BASE_KEY`] are reported without a prefix.
	pub fn full_messages(&self) -> Vec<String> {
		self.iter()
			.flat_map(|(key, messages)| {
				messages.iter().map(move |message| {
					if key == BASE_KEY {
						message.clone()
					} else {
						format!("{} {}", key, message)
					}
				})
			})
			.collect()
	}
}

impl<'a> IntoIterator for &'a Errors {
	type Item = (&'a String, &'a Vec<String>);
	type IntoIter = indexmap::map::Iter<'a, String, Vec<String>>;

	fn into_iter(self) -> Self::IntoIter {
		self.messages.iter()
	}
}
