use crate::schema::{Deletion, EntityKind, EntitySchema, SortKey};
use crate::{Entity, Fields, ValidationError};
use folio_types::Timestamp;
use serde::{Deserialize, Serialize};

static SCHEMA: EntitySchema = EntitySchema {
    table: "hero",
    kind: EntityKind::Singleton,
    required: &["name", "title"],
    order_by: &[SortKey::desc("updated_at")],
    position: None,
    deletion: Deletion::Hard,
    slug: None,
    search: &[],
};

/// The landing section: who the site belongs to and the main call to action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hero {
    pub id: String,
    pub name: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub cta_text: String,
    pub cta_link: String,
    pub image_url: Option<String>,
    pub resume_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Hero {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

impl Entity for Hero {
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
        super::check_url(fields, "cta_link")
    }
}
