//! Submission tests
//!
//! Input shape handling: permitted keys, the unpermitted-attribute policy,
//! URL-encoded bodies and settings loaded from TOML.

use arbor_forms::params::from_urlencoded;
use arbor_forms::{
	FormError, FormSchema, FormSettings, Model, RootForm, SettingsError, UnpermittedPolicy,
};
use arbor_test::MemoryStore;
use arbor_test::fixtures::survey_form;
use rstest::rstest;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// A tracing layer that captures events as `[LEVEL] message`
struct LogCapture {
	logs: Arc<Mutex<Vec<String>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
	fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
		struct MessageVisitor {
			message: String,
		}

		impl tracing::field::Visit for MessageVisitor {
			fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
				if field.name() == "message" {
					self.message = format!("{:?}", value);
				}
			}
		}

		let mut visitor = MessageVisitor {
			message: String::new(),
		};
		event.record(&mut visitor);

		let mut logs = self.logs.lock().unwrap();
		logs.push(format!("[{}] {}", event.metadata().level(), visitor.message));
	}
}

#[rstest]
fn test_unpermitted_keys_are_ignored_and_logged() {
	// Arrange
	let logs = Arc::new(Mutex::new(Vec::new()));
	let capture = LogCapture { logs: logs.clone() };
	let _guard = tracing_subscriber::registry().with(capture).set_default();
	let store = MemoryStore::reference();
	let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	// Act
	form.submit(&json!({
		"name": "Favorite food",
		"colour": "red",
		"questions_attributes": { "0": { "content": "Which?", "survey_id": 42 } }
	}))
	.unwrap();

	// Assert
	assert_eq!(form.model().attribute("name"), Some(json!("Favorite food")));
	let question = &form.collection("questions").unwrap()[0];
	assert_eq!(question.model().attribute("survey_id"), Some(json!(null)));
	let captured = logs.lock().unwrap();
	let warnings = captured
		.iter()
		.filter(|log| log.contains("WARN") && log.contains("ignoring unpermitted attribute"))
		.count();
	assert_eq!(warnings, 2, "captured: {:?}", *captured);
}

#[rstest]
#[case::root(json!({ "name": "Favorite food", "colour": "red" }), "colour")]
#[case::nested(
	json!({ "questions_attributes": { "0": { "content": "Which?", "survey_id": 42 } } }),
	"survey_id"
)]
#[case::undeclared_association(json!({ "owners_attributes": { "name": "Ada" } }), "owners_attributes")]
fn test_unpermitted_keys_raise(#[case] params: serde_json::Value, #[case] expected: &str) {
	let store = MemoryStore::reference();
	let settings = FormSettings::new().with_unpermitted_attributes(UnpermittedPolicy::Raise);
	let mut form = RootForm::with_settings(
		store.new_record("Survey"),
		survey_form(),
		store.backend(),
		settings,
	)
	.unwrap();

	let result = form.submit(&params);

	let Err(FormError::UnpermittedAttribute { key }) = result else {
		panic!("expected UnpermittedAttribute");
	};
	assert_eq!(key, expected);
}

#[rstest]
fn test_permitted_keys_describe_input_shape() {
	let store = MemoryStore::reference();
	let form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	assert_eq!(
		form.permitted_keys(),
		vec!["name", "id", "_destroy", "questions_attributes"]
	);
	assert!(form.permits("questions_attributes"));
	assert!(!form.permits("answers_attributes"));

	let question = &form.collection("questions").unwrap()[0];
	assert!(question.permits("answers_attributes"));
	assert!(question.permits("content"));
	assert!(!question.permits("survey_id"));
}

#[rstest]
fn test_setting_undeclared_attribute_directly() {
	let store = MemoryStore::reference();
	let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	let result = form.set_attribute("colour", json!("red"));

	assert!(matches!(result, Err(FormError::UnpermittedAttribute { .. })));
}

#[rstest]
fn test_urlencoded_body_saves_tree() {
	// Arrange
	let store = MemoryStore::reference();
	let body = "survey%5Bname%5D=Favorite+food\
		&survey%5Bquestions_attributes%5D%5B0%5D%5Bcontent%5D=Which%3F\
		&survey%5Bquestions_attributes%5D%5B0%5D%5Banswers_attributes%5D%5B0%5D%5Bcontent%5D=Pizza\
		&survey%5Bquestions_attributes%5D%5B0%5D%5Banswers_attributes%5D%5B1%5D%5Bcontent%5D=Gyros";
	let params = from_urlencoded(body).unwrap();
	let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	// Act
	form.submit(&params["survey"]).unwrap();

	// Assert
	assert!(form.save().unwrap(), "errors: {:?}", form.errors());
	assert_eq!(store.count("Question"), 1);
	assert_eq!(store.count("Answer"), 2);
	let question = store.all("Question").pop().unwrap();
	assert_eq!(question.get("content"), Some(&json!("Which?")));
}

#[rstest]
#[case("a[b]=1&a[b][c]=2")]
#[case("a[b][c]=1&a[b]=2")]
#[case("a[]=1")]
#[case("[b]=1")]
fn test_malformed_urlencoded_bodies(#[case] body: &str) {
	assert!(matches!(
		from_urlencoded(body),
		Err(FormError::InvalidParams(_))
	));
}

#[rstest]
fn test_settings_from_toml_drive_the_tree() {
	// Arrange
	let settings = FormSettings::from_toml_str(
		r#"
		default_records = 2
		destroy_markers = ["1", "true"]
		blank_message = "is required"
		"#,
	)
	.unwrap();
	let store = MemoryStore::reference();
	let schema = FormSchema::new()
		.for_model("Project")
		.required_attributes(["name"])
		.association("tasks", FormSchema::new().required_attributes(["name"]));

	// Act
	let mut form =
		RootForm::with_settings(store.new_record("Project"), schema, store.backend(), settings)
			.unwrap();
	form.submit(&json!({
		"tasks_attributes": {
			"0": { "name": "Plan" },
			"1": { "name": "Build", "_destroy": "true" }
		}
	}))
	.unwrap();

	// Assert
	assert_eq!(form.settings().default_records, 2);
	let tasks = form.collection("tasks").unwrap();
	assert_eq!(tasks.len(), 2);
	assert!(tasks[1].is_marked_for_destruction());
	assert!(!form.is_valid());
	assert_eq!(form.errors().get("name"), ["is required"]);
}

#[rstest]
#[case("default_records = \"two\"")]
#[case("reject_blank_rows = \"sometimes\"")]
fn test_malformed_settings(#[case] contents: &str) {
	assert!(matches!(
		FormSettings::from_toml_str(contents),
		Err(SettingsError::Toml(_))
	));
}

#[rstest]
fn test_settings_validation() {
	let result = FormSettings::from_toml_str("destroy_markers = [\"\"]");

	assert!(matches!(result, Err(SettingsError::Validation(_))));
}
