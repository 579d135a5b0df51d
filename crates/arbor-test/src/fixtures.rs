//! rstest fixtures and form schemas for the reference domains
//!
//! Each `*_form` function returns the schema a form over the matching
//! reference model is usually declared with. The schemas pair with the
//! models of [`SchemaRegistry::reference`](crate::SchemaRegistry::reference).

use crate::logging::init_test_logging;
use crate::store::MemoryStore;
use arbor_forms::{AssociationOptions, FormSchema, Rule};
use rstest::fixture;

/// Fixture providing an empty store of the reference domains.
///
/// Test logging is initialized on first use.
#[fixture]
pub fn store() -> MemoryStore {
	init_test_logging();
	MemoryStore::reference()
}

/// `User` with a nested `email` and `profile`.
pub fn user_form() -> FormSchema {
	FormSchema::new()
		.for_model("User")
		.required_attributes(["name", "age", "gender"])
		.validate(Rule::length("name", 6..=20))
		.validate(Rule::numericality("age", true))
		.association("email", FormSchema::new().required_attributes(["address"]))
		.association(
			"profile",
			FormSchema::new().required_attributes(["twitter_name", "github_name"]),
		)
}

/// `Survey` with one question of two answers for new surveys.
pub fn survey_form() -> FormSchema {
	FormSchema::new()
		.for_model("Survey")
		.required_attributes(["name"])
		.association_with(
			"questions",
			AssociationOptions::new().records(1),
			FormSchema::new()
				.required_attributes(["content"])
				.association_with(
					"answers",
					AssociationOptions::new().records(2),
					FormSchema::new().required_attributes(["content"]),
				),
		)
}

/// `Conference` with a speaker holding two presentations for new conferences.
pub fn conference_form() -> FormSchema {
	FormSchema::new()
		.for_model("Conference")
		.required_attributes(["name", "city"])
		.association(
			"speaker",
			FormSchema::new()
				.required_attributes(["name", "occupation"])
				.association_with(
					"presentations",
					AssociationOptions::new().records(2),
					FormSchema::new().required_attributes(["topic", "duration"]),
				),
		)
}

/// `Song` with an artist who has a producer: two to-one levels.
pub fn song_form() -> FormSchema {
	FormSchema::new()
		.for_model("Song")
		.required_attributes(["title", "length"])
		.association(
			"artist",
			FormSchema::new()
				.required_attributes(["name"])
				.association(
					"producer",
					FormSchema::new().required_attributes(["name", "studio"]),
				),
		)
}

/// `Project` with three tasks for new projects and its owner.
pub fn project_form() -> FormSchema {
	FormSchema::new()
		.for_model("Project")
		.required_attributes(["name"])
		.attribute("description")
		.association_with(
			"tasks",
			AssociationOptions::new().records(3),
			FormSchema::new()
				.required_attributes(["name"])
				.attribute("description"),
		)
		.association(
			"owner",
			FormSchema::new().required_attributes(["name"]).attribute("role"),
		)
}
