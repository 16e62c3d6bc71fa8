//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note record and its JSON shape.
//! - Parse and validate raw user input (title/category/description).
//!
//! # Invariants
//! - `id` is assigned once at creation and never changes.
//! - `title` is non-empty after trimming.
//! - `updated_at` is never earlier than `created_at` for notes created here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stable identifier for a note.
///
/// Epoch-millisecond flavoured integer, compatible with seed files.
pub type NoteId = i64;

/// Fixed label partitioning notes for filtering and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Work,
    Personal,
    Ideas,
    Important,
}

impl Category {
    /// All categories in sidebar order.
    pub const ALL: [Category; 4] = [
        Category::Work,
        Category::Personal,
        Category::Ideas,
        Category::Important,
    ];

    /// Display/wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Ideas => "Ideas",
            Self::Important => "Important",
        }
    }

    /// Parses raw category input.
    ///
    /// # Errors
    /// - `MissingCategory` when input is blank.
    /// - `UnknownCategory` when input names no known category.
    pub fn parse(raw: &str) -> Result<Self, NoteValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NoteValidationError::MissingCategory);
        }
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == trimmed)
            .ok_or_else(|| NoteValidationError::UnknownCategory(trimmed.to_string()))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = NoteValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Category selection for filtered views: every note, or one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Label used by the `all` pseudo-category.
    pub const ALL_LABEL: &'static str = "all";

    /// Returns whether `category` passes this filter.
    pub fn matches(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == category,
        }
    }

    /// `all` followed by every concrete category.
    pub fn every() -> impl Iterator<Item = CategoryFilter> {
        std::iter::once(Self::All).chain(Category::ALL.into_iter().map(Self::Only))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => Self::ALL_LABEL,
            Self::Only(category) => category.as_str(),
        }
    }
}

impl Display for CategoryFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryFilter {
    type Err = NoteValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == Self::ALL_LABEL {
            return Ok(Self::All);
        }
        Category::parse(s).map(Self::Only)
    }
}

impl From<Category> for CategoryFilter {
    fn from(value: Category) -> Self {
        Self::Only(value)
    }
}

/// Field-level validation failure for note input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    MissingTitle,
    MissingCategory,
    UnknownCategory(String),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "title is required"),
            Self::MissingCategory => write!(f, "category is required"),
            Self::UnknownCategory(value) => write!(
                f,
                "unknown category `{value}`; expected Work|Personal|Ideas|Important"
            ),
        }
    }
}

impl Error for NoteValidationError {}

/// Validated user input for create/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteInput {
    pub title: String,
    pub category: Category,
    pub description: String,
}

impl NoteInput {
    /// Trims and validates raw form values.
    ///
    /// Title is checked before category, matching the order fields are shown.
    pub fn parse(
        title: &str,
        category: &str,
        description: &str,
    ) -> Result<Self, NoteValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(NoteValidationError::MissingTitle);
        }
        let category = Category::parse(category)?;
        Ok(Self {
            title: title.to_string(),
            category,
            description: description.trim().to_string(),
        })
    }
}

/// Canonical persisted note record.
///
/// Serialized with camelCase keys to stay compatible with seed files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Builds a freshly created note with both timestamps set to `now`.
    pub fn from_input(id: NoteId, input: NoteInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: input.title,
            description: input.description,
            category: input.category,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces editable fields and refreshes `updated_at`.
    pub fn apply(&mut self, input: NoteInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.category = input.category;
        self.description = input.description;
        self.updated_at = now;
    }

    /// Returns whether this note occupies the given `(title, category)` slot.
    ///
    /// Both titles are compared trimmed; seeded records may carry padding.
    pub fn has_key(&self, title: &str, category: Category) -> bool {
        self.category == category && self.title.trim() == title.trim()
    }
}
