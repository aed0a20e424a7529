use crate::schema::{Deletion, EntityKind, EntitySchema, SortKey};
use crate::{Entity, Fields, ValidationError};
use folio_types::Timestamp;
use serde::{Deserialize, Serialize};

static SCHEMA: EntitySchema = EntitySchema {
    table: "contact",
    kind: EntityKind::Singleton,
    required: &["email"],
    order_by: &[SortKey::desc("updated_at")],
    position: None,
    deletion: Deletion::Hard,
    slug: None,
    search: &[],
};

/// Contact details shown in the footer and contact section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub id: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Contact {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }
}

impl Entity for Contact {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    fn validate(fields: &Fields) -> Result<(), ValidationError> {
        if let Some(email) = fields.get("email").and_then(|v| v.as_str()) {
            let valid = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
            if !valid {
                return Err(ValidationError::invalid("email", "not an email address"));
            }
        }
        super::check_url(fields, "linkedin_url")?;
        super::check_url(fields, "github_url")
    }
}
