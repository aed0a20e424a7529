use folio_model::{
    About, BlogPost, Category, Certification, Contact, Deletion, Entity, EntityKind, FieldKind,
    Hero, Project, SearchField, Skill, SortKey, ValidationError, ValidationMode,
};
use serde_json::{json, Value};

fn fields(value: Value) -> folio_model::Fields {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

// ── Shorthands ───────────────────────────────────────────────────

#[test]
fn sort_key_shorthands() {
    assert_eq!(
        SortKey::asc("name"),
        SortKey {
            field: "name",
            descending: false
        }
    );
    assert!(SortKey::desc("created_at").descending);
}

#[test]
fn search_field_shorthands() {
    assert_eq!(SearchField::text("title").kind, FieldKind::Text);
    assert_eq!(SearchField::tags("tags").kind, FieldKind::Tags);
}

// ── Per-entity schemas ───────────────────────────────────────────

#[test]
fn singletons_use_hard_delete() {
    for schema in [Hero::schema(), About::schema(), Contact::schema()] {
        assert_eq!(schema.kind, EntityKind::Singleton);
        assert!(schema.is_singleton());
        assert_eq!(schema.deletion, Deletion::Hard);
        assert!(schema.position.is_none());
        assert!(schema.active_flag().is_none());
    }
}

#[test]
fn collections_use_soft_delete_and_positions() {
    let schemas = [
        Skill::schema(),
        Project::schema(),
        Category::schema(),
        Certification::schema(),
        BlogPost::schema(),
    ];
    for schema in schemas {
        assert_eq!(schema.kind, EntityKind::Collection);
        assert!(schema.active_flag().is_some());
        assert!(schema.position.is_some());
    }
}

#[test]
fn categories_use_order_and_active_columns() {
    let schema = Category::schema();
    assert_eq!(schema.position, Some("order"));
    assert_eq!(schema.active_flag(), Some("active"));
    assert_eq!(schema.order_by[0], SortKey::asc("order"));
}

#[test]
fn only_blog_has_a_slug_rule() {
    let rule = BlogPost::schema().slug.unwrap();
    assert_eq!(rule.source, "title");
    assert_eq!(rule.field, "slug");
    assert!(Project::schema().slug.is_none());
    assert!(Certification::schema().slug.is_none());
}

#[test]
fn search_fields_split_by_kind() {
    let schema = Project::schema();
    let text: Vec<_> = schema.text_search_fields().collect();
    let tags: Vec<_> = schema.tag_search_fields().collect();
    assert_eq!(text, vec!["title", "description"]);
    assert_eq!(tags, vec!["technologies"]);
}

#[test]
fn table_names() {
    assert_eq!(Hero::schema().table, "hero");
    assert_eq!(BlogPost::schema().table, "blog_posts");
    assert_eq!(Certification::schema().table, "certifications");
}

// ── Required fields ──────────────────────────────────────────────

#[test]
fn create_requires_every_field() {
    let schema = Project::schema();
    let err = schema
        .check_required(&fields(json!({"title": "Site"})), ValidationMode::Create)
        .unwrap_err();
    assert_eq!(err, ValidationError::missing("category"));
}

#[test]
fn create_rejects_blank_strings_and_empty_lists() {
    let schema = Certification::schema();
    let draft = fields(json!({
        "title": "CKA",
        "issuer": "CNCF",
        "description": "Kubernetes admin",
        "skills": [],
        "verification_url": "https://example.com/v"
    }));
    let err = schema.check_required(&draft, ValidationMode::Create).unwrap_err();
    assert_eq!(err, ValidationError::missing("skills"));

    let draft = fields(json!({"title": "   ", "category": "web"}));
    let err = Project::schema()
        .check_required(&draft, ValidationMode::Create)
        .unwrap_err();
    assert_eq!(err, ValidationError::missing("title"));
}

#[test]
fn patch_only_checks_present_fields() {
    let schema = BlogPost::schema();
    assert!(schema
        .check_required(&fields(json!({"featured": true})), ValidationMode::Patch)
        .is_ok());
    let err = schema
        .check_required(&fields(json!({"title": ""})), ValidationMode::Patch)
        .unwrap_err();
    assert_eq!(err.to_string(), "title is required");
}

#[test]
fn null_counts_as_missing() {
    let err = Contact::schema()
        .check_required(&fields(json!({"email": null})), ValidationMode::Patch)
        .unwrap_err();
    assert_eq!(err, ValidationError::missing("email"));
}
