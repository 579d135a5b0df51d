//! Survey scenario
//!
//! A survey holds questions, each question holds answers: two collection
//! levels. New surveys start with one question of two answers.

use arbor_forms::{FormChild, FormSettings, Model, RejectScope, RootForm};
use arbor_test::MemoryStore;
use arbor_test::fixtures::{store, survey_form};
use rstest::rstest;
use serde_json::{Value, json};

fn filled_survey() -> Value {
	json!({
		"name": "Favorite food",
		"questions_attributes": {
			"0": {
				"content": "Which is your favorite food?",
				"answers_attributes": {
					"0": { "content": "Pizza" },
					"1": { "content": "Souvlaki" }
				}
			}
		}
	})
}

#[rstest]
fn test_new_survey_shape(store: MemoryStore) {
	let form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	let questions = form.collection("questions").unwrap();
	assert_eq!(questions.len(), 1);
	assert_eq!(questions[0].collection("answers").unwrap().len(), 2);
	assert!(form.permitted_keys().contains(&"questions_attributes".to_string()));
}

#[rstest]
fn test_survey_round_trip(store: MemoryStore) {
	// Arrange
	let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	// Act
	form.submit(&filled_survey()).unwrap();
	let saved = form.save().unwrap();

	// Assert
	assert!(saved, "errors: {:?}", form.errors());
	assert_eq!(store.count("Survey"), 1);
	assert_eq!(store.count("Question"), 1);
	assert_eq!(store.count("Answer"), 2);

	let question = &form.collection("questions").unwrap()[0];
	let question_id = question.model().id().unwrap();
	for answer in store.all("Answer") {
		assert_eq!(answer.get("question_id"), Some(&json!(question_id)));
	}

	let survey_id = form.model().id().unwrap();
	let reopened =
		RootForm::new(store.find("Survey", survey_id).unwrap(), survey_form(), store.backend())
			.unwrap();
	let question = &reopened.collection("questions").unwrap()[0];
	assert_eq!(
		question.attribute("content"),
		Some(json!("Which is your favorite food?"))
	);
	let answers: Vec<_> = question
		.collection("answers")
		.unwrap()
		.iter()
		.map(|answer| answer.attribute("content").unwrap())
		.collect();
	assert_eq!(answers, vec![json!("Pizza"), json!("Souvlaki")]);
}

#[rstest]
fn test_blank_survey_reports_every_level(store: MemoryStore) {
	let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	form.submit(&json!({ "name": "Favorite food" })).unwrap();

	assert!(!form.save().unwrap());
	let errors = form.errors();
	assert_eq!(errors.get("questions.content"), ["can't be blank"]);
	assert_eq!(errors.get("questions.answers.content"), ["can't be blank"]);
	assert!(!errors.contains_key("name"));
	assert_eq!(store.total_count(), 0);
}

#[rstest]
fn test_submitted_null_contents_are_reported(store: MemoryStore) {
	// Arrange
	let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	// Act
	form.submit(&json!({
		"name": "Favorite food",
		"questions_attributes": {
			"0": {
				"content": null,
				"answers_attributes": { "0": { "content": null }, "1": { "content": null } }
			}
		}
	}))
	.unwrap();

	// Assert
	assert!(!form.save().unwrap());
	let errors = form.errors();
	assert_eq!(errors.get("questions.content"), ["can't be blank"]);
	assert_eq!(errors.get("questions.answers.content"), ["can't be blank"]);
	assert_eq!(store.transactions_begun(), 0);
	assert_eq!(store.total_count(), 0);
}

#[rstest]
fn test_one_blank_answer_blocks_the_save(store: MemoryStore) {
	let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();

	form.submit(&json!({
		"name": "Favorite food",
		"questions_attributes": {
			"0": {
				"content": "Which?",
				"answers_attributes": { "0": { "content": "Pizza" }, "1": { "content": null } }
			}
		}
	}))
	.unwrap();

	assert!(!form.save().unwrap());
	assert_eq!(form.errors().get("questions.answers.content"), ["can't be blank"]);
	let answers = form.collection("questions").unwrap()[0].collection("answers").unwrap();
	assert!(answers[1].is_rejected());
	assert!(answers[1].errors().includes("content", "can't be blank"));
	assert_eq!(store.count("Answer"), 0);
}

#[rstest]
fn test_submitted_blanks_without_rejection(store: MemoryStore) {
	let settings = FormSettings::new().with_reject_blank_rows(RejectScope::Never);
	let mut form = RootForm::with_settings(
		store.new_record("Survey"),
		survey_form(),
		store.backend(),
		settings,
	)
	.unwrap();

	form.submit(&json!({
		"name": "Favorite food",
		"questions_attributes": {
			"0": {
				"content": "",
				"answers_attributes": { "0": { "content": "" }, "1": { "content": "Pizza" } }
			}
		}
	}))
	.unwrap();

	assert!(!form.is_valid());
	assert!(form.errors().includes("questions.content", "can't be blank"));
	assert!(form.errors().includes("questions.answers.content", "can't be blank"));
	let question = form.collection("questions").unwrap().get(0).unwrap();
	assert!(question.errors().includes("answers.content", "can't be blank"));
}

#[rstest]
fn test_stored_survey_adds_and_removes_answers(store: MemoryStore) {
	// Arrange
	let survey = store.seed("Survey", json!({ "name": "Favorite food" }));
	let question = store.seed("Question", json!({ "content": "Which?", "survey_id": survey.id }));
	let pizza = store.seed("Answer", json!({ "content": "Pizza", "question_id": question.id }));
	let sushi = store.seed("Answer", json!({ "content": "Sushi", "question_id": question.id }));
	let record = store.find("Survey", survey.id).unwrap();
	let mut form = RootForm::new(record, survey_form(), store.backend()).unwrap();

	// Act
	form.submit(&json!({
		"questions_attributes": {
			"0": {
				"id": question.id,
				"answers_attributes": {
					"0": { "id": pizza.id, "_destroy": "1" },
					"1": { "id": sushi.id, "content": "Sashimi" },
					"2": { "content": "Gyros" }
				}
			}
		}
	}))
	.unwrap();
	assert!(form.save().unwrap(), "errors: {:?}", form.errors());

	// Assert
	let contents: Vec<Value> = store
		.all("Answer")
		.iter()
		.map(|answer| answer.get("content").cloned().unwrap())
		.collect();
	assert_eq!(contents, vec![json!("Sashimi"), json!("Gyros")]);
	assert!(store.find("Answer", pizza.id).is_none());
}

#[rstest]
fn test_removing_question_cascades_to_answers(store: MemoryStore) {
	let survey = store.seed("Survey", json!({ "name": "Favorite food" }));
	let question = store.seed("Question", json!({ "content": "Which?", "survey_id": survey.id }));
	store.seed("Answer", json!({ "content": "Pizza", "question_id": question.id }));
	let record = store.find("Survey", survey.id).unwrap();
	let mut form = RootForm::new(record, survey_form(), store.backend()).unwrap();

	form.submit(&json!({
		"questions_attributes": { "0": { "id": question.id, "_destroy": "1" } }
	}))
	.unwrap();
	assert!(form.save().unwrap(), "errors: {:?}", form.errors());

	assert_eq!(store.count("Survey"), 1);
	assert_eq!(store.count("Question"), 0);
	assert_eq!(store.count("Answer"), 0);
}

#[rstest]
fn test_nested_rows_are_reachable_mutably(store: MemoryStore) {
	let mut form = RootForm::new(store.new_record("Survey"), survey_form(), store.backend()).unwrap();
	form.submit(&filled_survey()).unwrap();

	let answers = form
		.child_mut("questions")
		.and_then(FormChild::as_collection_mut)
		.and_then(|questions| questions.get_mut(0))
		.and_then(|question| question.child_mut("answers"))
		.and_then(FormChild::as_collection_mut)
		.unwrap();
	answers[1].delete();

	assert!(form.save().unwrap(), "errors: {:?}", form.errors());
	assert_eq!(store.count("Answer"), 1);
}
