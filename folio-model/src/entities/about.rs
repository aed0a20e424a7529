use crate::schema::{Deletion, EntityKind, EntitySchema, SortKey};
use crate::{Entity, Fields, ValidationError};
use folio_types::Timestamp;
use serde::{Deserialize, Serialize};

static SCHEMA: EntitySchema = EntitySchema {
    table: "about",
    kind: EntityKind::Singleton,
    required: &["title"],
    order_by: &[SortKey::desc("updated_at")],
    position: None,
    deletion: Deletion::Hard,
    slug: None,
    search: &[],
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct About {
    pub id: String,
    pub title: String,
    pub description: String,
    pub highlights: Vec<String>,
    pub image_url: Option<String>,
    pub years_experience: u32,
    pub projects_completed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl About {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }
}

impl Entity for About {
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
        ValidationError::check_range(fields, "years_experience", 0, 80)
    }
}
