//! Model declarations for the in-memory store
//!
//! A [`ModelSchema`] lists the stored columns of one model, its associations
//! and the model-level validations the store runs. A [`SchemaRegistry`]
//! collects the schemas a [`MemoryStore`](crate::MemoryStore) serves.

use arbor_forms::{AssociationKind, Reflection};
use indexmap::IndexMap;
use std::rc::Rc;

/// One association of a model, with its destroy behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSchema {
	pub reflection: Reflection,
	pub foreign_key: &'static str,
	/// Destroying the owner destroys the targets
	pub dependent: bool,
}

/// Validations run by [`MemoryRecord::validate`](crate::MemoryRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelValidation {
	Presence(&'static str),
	Uniqueness(&'static str),
}

/// Columns, associations and validations of one model.
///
/// # Examples
///
/// ```
/// use arbor_test::ModelSchema;
///
/// let survey = ModelSchema::new("Survey")
///     .columns(["name"])
///     .has_many("questions", "Question", "survey_id")
///     .dependent()
///     .validates_uniqueness_of("name");
///
/// assert!(survey.has_column("name"));
/// assert!(survey.association("questions").unwrap().dependent);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
	name: &'static str,
	columns: Vec<&'static str>,
	associations: Vec<AssociationSchema>,
	validations: Vec<ModelValidation>,
}

impl ModelSchema {
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			columns: Vec::new(),
			associations: Vec::new(),
			validations: Vec::new(),
		}
	}

	pub fn columns<I>(mut self, columns: I) -> Self
	where
		I: IntoIterator<Item = &'static str>,
	{
		self.columns.extend(columns);
		self
	}

	pub fn has_one(self, name: &str, target: &str, foreign_key: &'static str) -> Self {
		self.associate(name, AssociationKind::HasOne, target, foreign_key)
	}

	pub fn has_many(self, name: &str, target: &str, foreign_key: &'static str) -> Self {
		self.associate(name, AssociationKind::HasMany, target, foreign_key)
	}

	/// The foreign key column is added to this model.
	pub fn belongs_to(mut self, name: &str, target: &str, foreign_key: &'static str) -> Self {
		if !self.columns.contains(&foreign_key) {
			self.columns.push(foreign_key);
		}
		self.associate(name, AssociationKind::BelongsTo, target, foreign_key)
	}

	/// Mark the association declared last as destroyed with its owner.
	pub fn dependent(mut self) -> Self {
		if let Some(last) = self.associations.last_mut() {
			last.dependent = true;
		}
		self
	}

	pub fn validates_presence_of(mut self, column: &'static str) -> Self {
		self.validations.push(ModelValidation::Presence(column));
		self
	}

	pub fn validates_uniqueness_of(mut self, column: &'static str) -> Self {
		self.validations.push(ModelValidation::Uniqueness(column));
		self
	}

	fn associate(
		mut self,
		name: &str,
		kind: AssociationKind,
		target: &str,
		foreign_key: &'static str,
	) -> Self {
		self.associations.push(AssociationSchema {
			reflection: Reflection::new(name, kind, target, foreign_key),
			foreign_key,
			dependent: false,
		});
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn column_names(&self) -> &[&'static str] {
		&self.columns
	}

	pub fn has_column(&self, column: &str) -> bool {
		self.columns.iter().any(|c| *c == column)
	}

	pub fn association(&self, name: &str) -> Option<&AssociationSchema> {
		self.associations
			.iter()
			.find(|a| a.reflection.name == name)
	}

	pub fn associations(&self) -> &[AssociationSchema] {
		&self.associations
	}

	pub fn validations(&self) -> &[ModelValidation] {
		&self.validations
	}
}

/// Model schemas served by one store, keyed by model name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
	models: IndexMap<&'static str, Rc<ModelSchema>>,
}

impl SchemaRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a model. Foreign key columns of target-keyed associations
	/// are added to the target models registered so far and later on.
	pub fn register(mut self, schema: ModelSchema) -> Self {
		self.models.insert(schema.name(), Rc::new(schema));
		self.link_foreign_keys();
		self
	}

	pub fn get(&self, name: &str) -> Option<&Rc<ModelSchema>> {
		self.models.get(name)
	}

	pub fn models(&self) -> impl Iterator<Item = &Rc<ModelSchema>> {
		self.models.values()
	}

	fn link_foreign_keys(&mut self) {
		let links: Vec<(String, &'static str)> = self
			.models
			.values()
			.flat_map(|schema| {
				schema
					.associations()
					.iter()
					.filter(|a| !a.reflection.kind.owner_holds_key())
					.map(|a| (a.reflection.target.clone(), a.foreign_key))
			})
			.collect();
		for (target, foreign_key) in links {
			if let Some(schema) = self.models.get_mut(target.as_str())
				&& !schema.has_column(foreign_key)
			{
				Rc::make_mut(schema).columns.push(foreign_key);
			}
		}
	}

	/// Models of the reference domains used throughout the test suites:
	///
	/// - `User` has one `Email` and one `Profile`
	/// - `Survey` has many `Question`s, each has many `Answer`s
	/// - `Conference` has one `Speaker`, who has many `Presentation`s
	/// - `Song` has one `Artist`, who has one `Producer`
	/// - `Project` belongs to an owner `Person`, has many `Task`s and
	///   contributor `Person`s; each `Task` has one `Deliverable`
	/// - `Assignment` has many `Task`s
	pub fn reference() -> Self {
		Self::new()
			.register(
				ModelSchema::new("User")
					.columns(["name", "age", "gender"])
					.has_one("email", "Email", "user_id")
					.dependent()
					.has_one("profile", "Profile", "user_id")
					.dependent()
					.validates_uniqueness_of("name"),
			)
			.register(
				ModelSchema::new("Email")
					.columns(["address"])
					.belongs_to("user", "User", "user_id")
					.validates_uniqueness_of("address"),
			)
			.register(
				ModelSchema::new("Profile")
					.columns(["twitter_name", "github_name"])
					.belongs_to("user", "User", "user_id")
					.validates_uniqueness_of("twitter_name")
					.validates_uniqueness_of("github_name"),
			)
			.register(
				ModelSchema::new("Survey")
					.columns(["name"])
					.has_many("questions", "Question", "survey_id")
					.dependent()
					.validates_uniqueness_of("name"),
			)
			.register(
				ModelSchema::new("Question")
					.columns(["content"])
					.belongs_to("survey", "Survey", "survey_id")
					.has_many("answers", "Answer", "question_id")
					.dependent(),
			)
			.register(
				ModelSchema::new("Answer")
					.columns(["content"])
					.belongs_to("question", "Question", "question_id"),
			)
			.register(
				ModelSchema::new("Conference")
					.columns(["name", "city"])
					.has_one("speaker", "Speaker", "conference_id")
					.dependent()
					.validates_uniqueness_of("name"),
			)
			.register(
				ModelSchema::new("Speaker")
					.columns(["name", "occupation"])
					.belongs_to("conference", "Conference", "conference_id")
					.has_many("presentations", "Presentation", "speaker_id")
					.dependent()
					.validates_uniqueness_of("name"),
			)
			.register(
				ModelSchema::new("Presentation")
					.columns(["topic", "duration"])
					.belongs_to("speaker", "Speaker", "speaker_id"),
			)
			.register(
				ModelSchema::new("Song")
					.columns(["title", "length"])
					.has_one("artist", "Artist", "song_id")
					.dependent()
					.validates_uniqueness_of("title"),
			)
			.register(
				ModelSchema::new("Artist")
					.columns(["name"])
					.belongs_to("song", "Song", "song_id")
					.has_one("producer", "Producer", "artist_id")
					.dependent()
					.validates_uniqueness_of("name"),
			)
			.register(
				ModelSchema::new("Producer")
					.columns(["name", "studio"])
					.belongs_to("artist", "Artist", "artist_id")
					.validates_uniqueness_of("name")
					.validates_uniqueness_of("studio"),
			)
			.register(
				ModelSchema::new("Project")
					.columns(["name", "description"])
					.belongs_to("owner", "Person", "owner_id")
					.has_many("tasks", "Task", "project_id")
					.dependent()
					.has_many("contributors", "Person", "project_id"),
			)
			.register(ModelSchema::new("Person").columns(["name", "role"]))
			.register(
				ModelSchema::new("Task")
					.columns(["name", "description"])
					.belongs_to("project", "Project", "project_id")
					.belongs_to("assignment", "Assignment", "assignment_id")
					.has_one("deliverable", "Deliverable", "task_id")
					.dependent(),
			)
			.register(
				ModelSchema::new("Deliverable")
					.columns(["description"])
					.belongs_to("task", "Task", "task_id"),
			)
			.register(
				ModelSchema::new("Assignment")
					.columns(["name"])
					.has_many("tasks", "Task", "assignment_id")
					.validates_uniqueness_of("name"),
			)
	}
}
