//! Association metadata
//!
//! Whether a declared association becomes a single node or a collection is
//! decided by the model layer's own relationship metadata, looked up through
//! [`AssociationCatalog`]. The association's name is never inspected.

use serde::{Deserialize, Serialize};

/// Kind of relationship between an owning model and its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
	/// The target holds a foreign key to the owner; at most one target.
	HasOne,
	/// The owner holds a foreign key to the target.
	BelongsTo,
	/// The target holds a foreign key to the owner; any number of targets.
	HasMany,
}

/// How many target records an association holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
	Single,
	Collection,
}

impl AssociationKind {
	/// # Examples
	///
	/// ```
	/// use arbor_forms::{AssociationKind, Cardinality};
	///
	/// assert_eq!(AssociationKind::HasOne.cardinality(), Cardinality::Single);
	/// assert_eq!(AssociationKind::BelongsTo.cardinality(), Cardinality::Single);
	/// assert_eq!(AssociationKind::HasMany.cardinality(), Cardinality::Collection);
	/// ```
	pub fn cardinality(&self) -> Cardinality {
		match self {
			AssociationKind::HasOne | AssociationKind::BelongsTo => Cardinality::Single,
			AssociationKind::HasMany => Cardinality::Collection,
		}
	}

	/// Whether the foreign key lives on the owner, so the target has to be
	/// stored first.
	pub fn owner_holds_key(&self) -> bool {
		matches!(self, AssociationKind::BelongsTo)
	}
}

/// Relationship metadata for one association of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
	/// Association name on the owning model (e.g. `"questions"`)
	pub name: String,
	pub kind: AssociationKind,
	/// Target model name (e.g. `"Question"`)
	pub target: String,
	/// Foreign key column; on the target for `HasOne`/`HasMany`, on the
	/// owner for `BelongsTo`
	pub foreign_key: String,
}

impl Reflection {
	/// # Examples
	///
	/// ```
	/// use arbor_forms::{AssociationKind, Reflection};
	///
	/// let reflection = Reflection::new("questions", AssociationKind::HasMany, "Question", "survey_id");
	/// assert_eq!(reflection.name, "questions");
	/// assert!(reflection.is_collection());
	/// ```
	pub fn new(
		name: impl Into<String>,
		kind: AssociationKind,
		target: impl Into<String>,
		foreign_key: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			kind,
			target: target.into(),
			foreign_key: foreign_key.into(),
		}
	}

	pub fn cardinality(&self) -> Cardinality {
		self.kind.cardinality()
	}

	pub fn is_collection(&self) -> bool {
		self.cardinality() == Cardinality::Collection
	}
}

/// Source of truth for association metadata.
pub trait AssociationCatalog {
	/// Reflection for `association` on `model_name`, `None` when the model
	/// has no such association.
	fn reflect(&self, model_name: &str, association: &str) -> Option<Reflection>;
}
