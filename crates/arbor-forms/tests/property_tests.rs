//! Property tests
//!
//! Tree-wide properties checked over generated submissions.

use arbor_forms::{
	AssociationOptions, FormSchema, FormSettings, Model, RejectScope, RootForm,
};
use arbor_test::MemoryStore;
use arbor_test::fixtures::survey_form;
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn text() -> impl Strategy<Value = String> {
	"[A-Za-z][A-Za-z ]{0,15}"
}

proptest! {
	// Keys naming an existing position address it, any larger key appends.
	#[test]
	fn prop_new_collection_indexing(rows in 1usize..6, extra in 0usize..1_000_000) {
		let store = MemoryStore::reference();
		let schema = FormSchema::new().association_with(
			"tasks",
			AssociationOptions::new().records(rows),
			FormSchema::new().required_attributes(["name"]),
		);
		let mut form = RootForm::new(store.new_record("Project"), schema, store.backend()).unwrap();

		let mut submitted = Map::new();
		for position in 0..rows {
			submitted.insert(position.to_string(), json!({ "name": format!("task {}", position) }));
		}
		submitted.insert((rows + extra).to_string(), json!({ "name": "appended" }));
		form.submit(&json!({ "tasks_attributes": submitted })).unwrap();

		let tasks = form.collection("tasks").unwrap();
		prop_assert_eq!(tasks.len(), rows + 1);
		prop_assert_eq!(tasks[rows].attribute("name"), Some(json!("appended")));
	}

	// Every leaf written through the form reads back the same after save.
	#[test]
	fn prop_survey_round_trip(
		name in text(),
		content in text(),
		answers in prop::collection::vec(text(), 2),
	) {
		let store = MemoryStore::reference();
		let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();
		form.submit(&json!({
			"name": name,
			"questions_attributes": {
				"0": {
					"content": content,
					"answers_attributes": {
						"0": { "content": answers[0] },
						"1": { "content": answers[1] }
					}
				}
			}
		}))
		.unwrap();
		prop_assert!(form.save().unwrap());

		let survey_id = form.model().id().unwrap();
		let reopened = RootForm::new(
			store.find("Survey", survey_id).unwrap(),
			survey_form(),
			store.backend(),
		)
		.unwrap();
		prop_assert_eq!(reopened.attribute("name"), Some(json!(name)));
		let question = &reopened.collection("questions").unwrap()[0];
		prop_assert_eq!(question.attribute("content"), Some(json!(content)));
		let stored: Vec<Value> = question
			.collection("answers")
			.unwrap()
			.iter()
			.map(|answer| answer.attribute("content").unwrap())
			.collect();
		prop_assert_eq!(stored, vec![json!(answers[0]), json!(answers[1])]);
	}

	// The root is valid exactly when no node fails, and each failure is
	// reported under its association path.
	#[test]
	fn prop_errors_aggregate_by_path(blanks in prop::collection::vec(any::<bool>(), 4)) {
		let store = MemoryStore::reference();
		let settings = FormSettings::new().with_reject_blank_rows(RejectScope::Never);
		let mut form = RootForm::with_settings(
			store.new_record("Survey"),
			survey_form(),
			store.backend(),
			settings,
		)
		.unwrap();
		let leaf = |blank: bool, value: &str| if blank { json!("") } else { json!(value) };
		form.submit(&json!({
			"name": leaf(blanks[0], "Survey"),
			"questions_attributes": {
				"0": {
					"content": leaf(blanks[1], "Question"),
					"answers_attributes": {
						"0": { "content": leaf(blanks[2], "First") },
						"1": { "content": leaf(blanks[3], "Second") }
					}
				}
			}
		}))
		.unwrap();

		let valid = form.is_valid();
		let errors = form.errors();
		prop_assert_eq!(valid, !blanks.iter().any(|blank| *blank));
		prop_assert_eq!(errors.contains_key("name"), blanks[0]);
		prop_assert_eq!(errors.contains_key("questions.content"), blanks[1]);
		prop_assert_eq!(
			errors.contains_key("questions.answers.content"),
			blanks[2] || blanks[3]
		);
	}
}
