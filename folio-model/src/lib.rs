//! Entity model for Folio.
//!
//! Defines what the generic sync layer needs to know about each content type:
//! - [`Entity`]: the trait every record type implements
//! - [`EntitySchema`]: table name, ordering, deletion mode, slug rule and search columns
//! - [`ValidationError`]: raised before any remote call when a draft or patch is malformed
//! - [`slugify`] / [`unique_slug`] / [`read_time`]: derived-field helpers
//!
//! The eight record types of the portfolio site live in [`entities`].

mod entity;
pub mod entities;
mod schema;
mod text;
mod validation;

pub use entities::{
    About, BlogPost, Category, CategoryColor, Certification, CertificationLevel, Contact, Hero,
    Project, Skill, Validity, CATEGORY_ICONS,
};
pub use entity::{from_fields, to_fields, Entity, Fields};
pub use schema::{
    Deletion, EntityKind, EntitySchema, FieldKind, SearchField, SlugRule, SortKey, SERVER_FIELDS,
};
pub use text::{read_time, slugify, unique_slug, word_count, FALLBACK_SLUG, WORDS_PER_MINUTE};
pub use validation::{ValidationError, ValidationMode};
