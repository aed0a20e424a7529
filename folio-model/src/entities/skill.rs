use crate::schema::{Deletion, EntityKind, EntitySchema, SearchField, SortKey};
use crate::{Entity, Fields, ValidationError};
use folio_types::Timestamp;
use serde::{Deserialize, Serialize};

static SCHEMA: EntitySchema = EntitySchema {
    table: "skills",
    kind: EntityKind::Collection,
    required: &["name", "category", "level"],
    order_by: &[SortKey::asc("display_order"), SortKey::asc("name")],
    position: Some("display_order"),
    deletion: Deletion::Soft { flag: "is_active" },
    slug: None,
    search: &[SearchField::text("name"), SearchField::text("category")],
};

/// A skill with a proficiency level in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub category: String,
    pub level: u8,
    pub icon: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Default for Skill {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            category: String::new(),
            level: 0,
            icon: None,
            display_order: 0,
            is_active: super::default_true(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Skill {
    pub fn new(name: impl Into<String>, category: impl Into<String>, level: u8) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            level,
            ..Default::default()
        }
    }

    /// Groups skills by category for display.
    ///
    /// Categories appear in the order their first skill appears, and skills
    /// keep their relative order within a category.
    pub fn group_by_category(skills: &[Skill]) -> Vec<(String, Vec<Skill>)> {
        let mut groups: Vec<(String, Vec<Skill>)> = Vec::new();
        for skill in skills {
            match groups.iter_mut().find(|(name, _)| *name == skill.category) {
                Some((_, members)) => members.push(skill.clone()),
                None => groups.push((skill.category.clone(), vec![skill.clone()])),
            }
        }
        groups
    }
}

impl Entity for Skill {
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
        ValidationError::check_range(fields, "level", 0, 100)
    }
}
