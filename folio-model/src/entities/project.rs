use crate::schema::{Deletion, EntityKind, EntitySchema, SearchField, SortKey};
use crate::{Entity, Fields, ValidationError};
use folio_types::Timestamp;
use serde::{Deserialize, Serialize};

static SCHEMA: EntitySchema = EntitySchema {
    table: "projects",
    kind: EntityKind::Collection,
    required: &["title", "category"],
    order_by: &[SortKey::asc("display_order"), SortKey::desc("created_at")],
    position: Some("display_order"),
    deletion: Deletion::Soft { flag: "is_active" },
    slug: None,
    search: &[
        SearchField::text("title"),
        SearchField::text("description"),
        SearchField::tags("technologies"),
    ],
};

/// A portfolio project.
///
/// `category` holds a [`crate::Category`] *name*, not its id, so renaming a
/// category leaves existing projects pointing at the old name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,
    pub display_order: i64,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: String::new(),
            category: String::new(),
            technologies: Vec::new(),
            image_url: None,
            github_url: None,
            live_url: None,
            featured: false,
            display_order: 0,
            is_active: super::default_true(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Project {
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    /// Projects filed under the named category.
    pub fn in_category<'a>(
        projects: &'a [Project],
        category: &'a str,
    ) -> impl Iterator<Item = &'a Project> {
        projects.iter().filter(move |p| p.category == category)
    }
}

impl Entity for Project {
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
        super::check_url(fields, "github_url")?;
        super::check_url(fields, "live_url")
    }
}
