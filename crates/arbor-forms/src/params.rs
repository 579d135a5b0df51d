//! Submitted parameter helpers
//!
//! A submission is a JSON object whose keys are plain attribute names or
//! `<association>_attributes`. To-one associations take a flat object,
//! to-many associations take an object keyed by row index or identifier (an
//! array is accepted as well). Each row may carry `id` and `_destroy`.

use crate::error::{FormError, FormResult};
use crate::model::RecordId;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// One level of submitted parameters.
pub type Params = Map<String, Value>;

/// Row key carrying the identifier of a stored record.
pub const ID_KEY: &str = "id";

/// Row key carrying the destroy marker.
pub const DESTROY_KEY: &str = "_destroy";

/// Keys that address a row rather than describe it. They are never written
/// to a model.
pub const UNASSIGNABLE_KEYS: [&str; 2] = [ID_KEY, DESTROY_KEY];

static ASSOCIATION_KEY_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(.+)_attributes$").expect("Invalid association key regex"));

static FIELD_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^([^\[\]]+)((?:\[[^\[\]]*\])*)$").expect("Invalid field name regex")
});

static FIELD_SEGMENT_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("Invalid field segment regex"));

/// Association name addressed by a submitted key, if the key has the
/// `<association>_attributes` shape.
///
/// # Examples
///
/// ```
/// use arbor_forms::params::association_key;
///
/// assert_eq!(association_key("questions_attributes"), Some("questions"));
/// assert_eq!(association_key("email_attributes"), Some("email"));
/// assert_eq!(association_key("title"), None);
/// assert_eq!(association_key("_attributes"), None);
/// ```
pub fn association_key(key: &str) -> Option<&str> {
	ASSOCIATION_KEY_REGEX
		.captures(key)
		.and_then(|captures| captures.get(1))
		.map(|name| name.as_str())
}

/// Whether a submitted value carries no information.
///
/// `null`, empty or whitespace-only strings, `false`, and empty arrays and
/// objects count as blank. A non-empty object or array is never blank, even
/// when everything inside it is.
///
/// # Examples
///
/// ```
/// use arbor_forms::params::is_blank;
/// use serde_json::json;
///
/// assert!(is_blank(&json!(null)));
/// assert!(is_blank(&json!("   ")));
/// assert!(is_blank(&json!({})));
/// assert!(!is_blank(&json!({ "0": { "content": "" } })));
/// assert!(!is_blank(&json!(0)));
/// assert!(!is_blank(&json!("Yes")));
/// ```
pub fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(flag) => !flag,
		Value::Number(_) => false,
		Value::String(s) => s.trim().is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
	}
}

/// Default reject predicate: every field except `id` and `_destroy` is
/// blank. A non-empty nested `<association>_attributes` map fills the row.
pub fn all_blank(row: &Params) -> bool {
	row.iter()
		.filter(|(key, _)| !UNASSIGNABLE_KEYS.contains(&key.as_str()))
		.all(|(_, value)| is_blank(value))
}

/// Whether `value` requests removal of its row.
///
/// JSON `true` always does; strings and numbers do when their text is one of
/// `markers`.
///
/// # Examples
///
/// ```
/// use arbor_forms::params::is_destroy_marker;
/// use serde_json::json;
///
/// let markers = vec!["1".to_string()];
/// assert!(is_destroy_marker(&json!("1"), &markers));
/// assert!(is_destroy_marker(&json!(1), &markers));
/// assert!(is_destroy_marker(&json!(true), &markers));
/// assert!(!is_destroy_marker(&json!("0"), &markers));
/// assert!(!is_destroy_marker(&json!(false), &markers));
/// ```
pub fn is_destroy_marker(value: &Value, markers: &[String]) -> bool {
	match value {
		Value::Bool(flag) => *flag,
		Value::String(s) => markers.iter().any(|marker| marker == s),
		Value::Number(n) => {
			let text = n.to_string();
			markers.iter().any(|marker| *marker == text)
		}
		_ => false,
	}
}

/// Whether `row` carries a destroy marker.
pub fn requests_destroy(row: &Params, markers: &[String]) -> bool {
	row.get(DESTROY_KEY)
		.is_some_and(|value| is_destroy_marker(value, markers))
}

/// Record identifier carried by a submitted value.
///
/// Integers and integer strings are accepted; blank values mean "no id".
/// Anything else is rejected.
pub fn parse_id(value: &Value) -> FormResult<Option<RecordId>> {
	match value {
		Value::Null => Ok(None),
		Value::Number(n) => n
			.as_i64()
			.map(Some)
			.ok_or_else(|| FormError::InvalidParams(format!("`{}` is not a record id", n))),
		Value::String(s) if s.trim().is_empty() => Ok(None),
		Value::String(s) => s
			.trim()
			.parse::<RecordId>()
			.map(Some)
			.map_err(|_| FormError::InvalidParams(format!("`{}` is not a record id", s))),
		other => Err(FormError::InvalidParams(format!(
			"`{}` is not a record id",
			other
		))),
	}
}

/// The row's own identifier, if any.
pub fn row_id(row: &Params) -> FormResult<Option<RecordId>> {
	match row.get(ID_KEY) {
		Some(value) => parse_id(value),
		None => Ok(None),
	}
}

/// Copy of `row` without `id` and `_destroy`.
pub fn assignable(row: &Params) -> Params {
	row.iter()
		.filter(|(key, _)| !UNASSIGNABLE_KEYS.contains(&key.as_str()))
		.map(|(key, value)| (key.clone(), value.clone()))
		.collect()
}

/// Decode an `application/x-www-form-urlencoded` body with bracketed keys
/// into the nested submission shape.
///
/// Every value decodes to a string, the same way browsers submit them.
///
/// # Examples
///
/// ```
/// use arbor_forms::params::from_urlencoded;
/// use serde_json::json;
///
/// let params = from_urlencoded(
///     "survey[name]=Favorites&survey[questions_attributes][0][content]=Color%3F",
/// )
/// .unwrap();
///
/// assert_eq!(
///     params,
///     json!({
///         "survey": {
///             "name": "Favorites",
///             "questions_attributes": { "0": { "content": "Color?" } }
///         }
///     })
/// );
/// ```
pub fn from_urlencoded(body: &str) -> FormResult<Value> {
	let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
		.map_err(|e| FormError::InvalidParams(format!("malformed form body: {}", e)))?;

	let mut root = Params::new();
	for (name, value) in pairs {
		let path = split_field_name(&name)?;
		insert_path(&mut root, &name, &path, Value::String(value))?;
	}
	Ok(Value::Object(root))
}

fn split_field_name(name: &str) -> FormResult<Vec<String>> {
	let captures = FIELD_NAME_REGEX
		.captures(name)
		.ok_or_else(|| FormError::InvalidParams(format!("malformed field name `{}`", name)))?;

	let mut path = vec![captures[1].to_string()];
	for segment in FIELD_SEGMENT_REGEX.captures_iter(&captures[2]) {
		let segment = &segment[1];
		if segment.is_empty() {
			return Err(FormError::InvalidParams(format!(
				"array segments are not supported in `{}`",
				name
			)));
		}
		path.push(segment.to_string());
	}
	Ok(path)
}

fn insert_path(map: &mut Params, name: &str, path: &[String], value: Value) -> FormResult<()> {
	let conflict = || FormError::InvalidParams(format!("conflicting values for `{}`", name));

	match path {
		[] => Err(conflict()),
		[last] => {
			if map.contains_key(last) {
				return Err(conflict());
			}
			map.insert(last.clone(), value);
			Ok(())
		}
		[head, rest @ ..] => {
			let child = map
				.entry(head.clone())
				.or_insert_with(|| Value::Object(Params::new()));
			match child {
				Value::Object(nested) => insert_path(nested, name, rest, value),
				_ => Err(conflict()),
			}
		}
	}
}
