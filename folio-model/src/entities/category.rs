use crate::schema::{Deletion, EntityKind, EntitySchema, SearchField, SortKey};
use crate::{Entity, Fields, ValidationError};
use folio_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static SCHEMA: EntitySchema = EntitySchema {
    table: "categories",
    kind: EntityKind::Collection,
    required: &["name"],
    order_by: &[SortKey::asc("order"), SortKey::asc("name")],
    position: Some("order"),
    deletion: Deletion::Soft { flag: "active" },
    slug: None,
    search: &[SearchField::text("name"), SearchField::text("description")],
};

/// Icons a category may use.
pub const CATEGORY_ICONS: &[&str] = &[
    "code", "globe", "smartphone", "server", "database", "cloud", "cpu", "layers", "palette",
    "terminal", "shield", "zap",
];

/// Fixed color palette for category tabs and badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryColor {
    #[default]
    Blue,
    Purple,
    Green,
    Orange,
    Red,
    Pink,
    Teal,
    Yellow,
}

impl CategoryColor {
    pub const ALL: [CategoryColor; 8] = [
        Self::Blue,
        Self::Purple,
        Self::Green,
        Self::Orange,
        Self::Red,
        Self::Pink,
        Self::Teal,
        Self::Yellow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Pink => "pink",
            Self::Teal => "teal",
            Self::Yellow => "yellow",
        }
    }

    /// Hex value used by the site theme.
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Blue => "#3b82f6",
            Self::Purple => "#8b5cf6",
            Self::Green => "#10b981",
            Self::Orange => "#f97316",
            Self::Red => "#ef4444",
            Self::Pink => "#ec4899",
            Self::Teal => "#14b8a6",
            Self::Yellow => "#eab308",
        }
    }
}

impl fmt::Display for CategoryColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryColor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid("color", format!("{s:?} is not in the palette"))
            })
    }
}

/// A project category. `order` drives the tab/sidebar sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: CategoryColor,
    pub icon: String,
    pub order: i64,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Default for Category {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            color: CategoryColor::default(),
            icon: CATEGORY_ICONS[0].to_string(),
            order: 0,
            active: super::default_true(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Category {
    pub fn new(name: impl Into<String>, color: CategoryColor) -> Self {
        Self {
            name: name.into(),
            color,
            ..Default::default()
        }
    }
}

impl Entity for Category {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> i64 {
        self.order
    }

    fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    fn validate(fields: &Fields) -> Result<(), ValidationError> {
        if let Some(color) = fields.get("color") {
            let color = color
                .as_str()
                .ok_or_else(|| ValidationError::invalid("color", "expected a string"))?;
            color.parse::<CategoryColor>()?;
        }
        if let Some(icon) = fields.get("icon") {
            let known = icon.as_str().is_some_and(|i| CATEGORY_ICONS.contains(&i));
            if !known {
                return Err(ValidationError::invalid("icon", "not in the icon set"));
            }
        }
        Ok(())
    }
}
