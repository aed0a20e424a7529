use crate::schema::{Deletion, EntityKind, EntitySchema, SearchField, SortKey};
use crate::{Entity, Fields, ValidationError};
use folio_types::Timestamp;
use serde::{Deserialize, Serialize};

static SCHEMA: EntitySchema = EntitySchema {
    table: "certifications",
    kind: EntityKind::Collection,
    required: &["title", "issuer", "description", "skills", "verification_url"],
    order_by: &[SortKey::asc("display_order"), SortKey::desc("created_at")],
    position: Some("display_order"),
    deletion: Deletion::Soft { flag: "is_active" },
    slug: None,
    search: &[
        SearchField::text("title"),
        SearchField::text("issuer"),
        SearchField::text("description"),
        SearchField::tags("skills"),
    ],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificationLevel {
    #[default]
    Associate,
    Professional,
    Expert,
}

/// Whether a certification is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Expired,
    /// No `valid_until`; the certification does not expire.
    Lifetime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certification {
    pub id: String,
    pub title: String,
    pub issuer: String,
    pub description: String,
    pub skills: Vec<String>,
    pub verification_url: String,
    pub level: CertificationLevel,
    pub credential_id: Option<String>,
    pub badge_url: Option<String>,
    /// Issue date as entered (`2023`, `2023-06` or `2023-06-15`).
    pub issued: Option<String>,
    /// Expiry as entered; only the year is significant.
    pub valid_until: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Default for Certification {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            issuer: String::new(),
            description: String::new(),
            skills: Vec::new(),
            verification_url: String::new(),
            level: CertificationLevel::default(),
            credential_id: None,
            badge_url: None,
            issued: None,
            valid_until: None,
            display_order: 0,
            is_active: super::default_true(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Certification {
    /// The year part of `valid_until`, if it parses.
    pub fn valid_until_year(&self) -> Option<i32> {
        self.valid_until.as_deref().and_then(parse_year)
    }

    /// Validity relative to `current_year`. A certification is valid through
    /// the whole of its `valid_until` year.
    pub fn validity(&self, current_year: i32) -> Validity {
        match self.valid_until_year() {
            None => Validity::Lifetime,
            Some(year) if year >= current_year => Validity::Valid,
            Some(_) => Validity::Expired,
        }
    }

    pub fn is_valid(&self, current_year: i32) -> bool {
        self.validity(current_year) != Validity::Expired
    }
}

fn parse_year(value: &str) -> Option<i32> {
    let digits = value.trim().get(..4)?;
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl Entity for Certification {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> i64 {
        self.display_order
    }

    fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    fn validate(fields: &Fields) -> Result<(), ValidationError> {
        super::check_url(fields, "verification_url")?;
        if let Some(level) = fields.get("level") {
            serde_json::from_value::<CertificationLevel>(level.clone()).map_err(|_| {
                ValidationError::invalid("level", "expected Associate, Professional or Expert")
            })?;
        }
        match fields.get("valid_until").and_then(|v| v.as_str()) {
            Some(value) if !value.is_empty() && parse_year(value).is_none() => {
                Err(ValidationError::invalid("valid_until", "must start with a four-digit year"))
            }
            _ => Ok(()),
        }
    }
}
