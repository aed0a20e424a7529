use crate::validation::{is_blank, ValidationError, ValidationMode};
use crate::Fields;
use serde::Serialize;

/// Columns the backend owns. They are stripped from drafts before insert.
pub const SERVER_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// Describes an entity type's table for the generic sync layer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntitySchema {
    /// Remote table name.
    pub table: &'static str,
    pub kind: EntityKind,
    /// Columns that must be present and non-blank on create.
    pub required: &'static [&'static str],
    /// Ordering used for full reads.
    pub order_by: &'static [SortKey],
    /// Dense manual sort column (`display_order` / `order`), if the entity is orderable.
    pub position: Option<&'static str>,
    pub deletion: Deletion,
    /// Slug derivation, if the entity has a content-derived slug.
    pub slug: Option<SlugRule>,
    /// Columns matched by free-text search.
    pub search: &'static [SearchField],
}

impl EntitySchema {
    /// Whether the table holds at most one row.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.kind == EntityKind::Singleton
    }

    /// The soft-delete flag column, if deletes are soft.
    #[must_use]
    pub fn active_flag(&self) -> Option<&'static str> {
        match self.deletion {
            Deletion::Soft { flag } => Some(flag),
            Deletion::Hard => None,
        }
    }

    /// Checks required columns.
    ///
    /// On create every required column must be present and non-blank. On
    /// patch only the required columns that are present are checked, since a
    /// partial update never has to resend untouched fields.
    pub fn check_required(
        &self,
        fields: &Fields,
        mode: ValidationMode,
    ) -> Result<(), ValidationError> {
        for &field in self.required {
            match (fields.get(field), mode) {
                (None, ValidationMode::Create) => return Err(ValidationError::missing(field)),
                (None, ValidationMode::Patch) => {}
                (Some(value), _) if is_blank(value) => return Err(ValidationError::missing(field)),
                (Some(_), _) => {}
            }
        }
        Ok(())
    }

    /// Text columns matched by search.
    pub fn text_search_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.search
            .iter()
            .filter(|f| f.kind == FieldKind::Text)
            .map(|f| f.field)
    }

    /// Tag-array columns matched by search.
    pub fn tag_search_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.search
            .iter()
            .filter(|f| f.kind == FieldKind::Tags)
            .map(|f| f.field)
    }
}

/// Whether the table is a collection or a singleton ("settings row").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Collection,
    Singleton,
}

/// How `delete` is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Deletion {
    /// Flip a boolean column to false; rows with the flag false are hidden.
    Soft { flag: &'static str },
    /// Remove the row.
    Hard,
}

/// Derives `field` from `source` with [`crate::slugify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlugRule {
    pub source: &'static str,
    pub field: &'static str,
}

/// One ordering term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: &'static str,
    pub descending: bool,
}

impl SortKey {
    /// Ascending order on `field`.
    pub const fn asc(field: &'static str) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    /// Descending order on `field`.
    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// A column matched by free-text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchField {
    pub field: &'static str,
    pub kind: FieldKind,
}

impl SearchField {
    /// Shorthand for a text column (case-insensitive substring match).
    pub const fn text(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldKind::Text,
        }
    }

    /// Shorthand for a tag array column (matches any element).
    pub const fn tags(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldKind::Tags,
        }
    }
}

/// The shape of a searchable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Tags,
}
