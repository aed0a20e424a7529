use crate::schema::{Deletion, EntityKind, EntitySchema, SearchField, SlugRule, SortKey};
use crate::{read_time, Entity, Fields, ValidationError};
use folio_types::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static SCHEMA: EntitySchema = EntitySchema {
    table: "blog_posts",
    kind: EntityKind::Collection,
    required: &["title", "content", "author", "category"],
    order_by: &[SortKey::asc("display_order"), SortKey::desc("created_at")],
    position: Some("display_order"),
    deletion: Deletion::Soft { flag: "is_active" },
    slug: Some(SlugRule {
        source: "title",
        field: "slug",
    }),
    search: &[
        SearchField::text("title"),
        SearchField::text("excerpt"),
        SearchField::tags("tags"),
    ],
};

/// A blog post.
///
/// `slug` is derived from the title and `read_time` from the content; both
/// are recomputed by the sync layer on every write that touches their source.
/// `featured` and `published` are independent flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    /// Minutes.
    pub read_time: u32,
    pub featured: bool,
    pub published: bool,
    pub display_order: i64,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Default for BlogPost {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            slug: String::new(),
            excerpt: String::new(),
            content: String::new(),
            author: String::new(),
            category: String::new(),
            tags: Vec::new(),
            image_url: None,
            read_time: 1,
            featured: false,
            published: false,
            display_order: 0,
            is_active: super::default_true(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl BlogPost {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            author: author.into(),
            category: category.into(),
            ..Default::default()
        }
    }
}

impl Entity for BlogPost {
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
        if let Some(tags) = fields.get("tags") {
            let ok = tags
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string));
            if !ok {
                return Err(ValidationError::invalid("tags", "expected a list of strings"));
            }
        }
        Ok(())
    }

    fn derive(fields: &mut Fields) {
        let minutes = fields
            .get("content")
            .and_then(Value::as_str)
            .map(read_time);
        if let Some(minutes) = minutes {
            fields.insert("read_time".into(), Value::from(minutes));
        }
    }
}
