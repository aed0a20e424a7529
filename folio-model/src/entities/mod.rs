//! The portfolio's record types.
//!
//! Hero, About and Contact are singletons (zero or one row, hard delete).
//! The rest are ordered collections with a soft-delete flag.

mod about;
mod blog;
mod category;
mod certification;
mod contact;
mod hero;
mod project;
mod skill;

pub use about::About;
pub use blog::BlogPost;
pub use category::{Category, CategoryColor, CATEGORY_ICONS};
pub use certification::{Certification, CertificationLevel, Validity};
pub use contact::Contact;
pub use hero::Hero;
pub use project::Project;
pub use skill::Skill;

pub(crate) fn default_true() -> bool {
    true
}

/// Requires `field`, when present, to be an `http(s)` URL.
pub(crate) fn check_url(fields: &crate::Fields, field: &str) -> Result<(), crate::ValidationError> {
    match fields.get(field).and_then(|v| v.as_str()) {
        Some(url)
            if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) =>
        {
            Err(crate::ValidationError::invalid(field, "must be an http(s) URL"))
        }
        _ => Ok(()),
    }
}
