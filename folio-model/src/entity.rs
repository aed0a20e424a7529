use crate::{EntitySchema, ValidationError};
use folio_types::Timestamp;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;

/// A row's fields as JSON, keyed by column name.
///
/// Drafts and partial updates travel through the sync layer in this form so
/// that generic code can validate, derive and strip fields without knowing
/// the concrete record type.
pub type Fields = Map<String, Value>;

/// A record type managed by the sync layer.
///
/// Implementors describe their table through [`Entity::schema`] and may add
/// entity-specific validation and derived fields. Everything else (caching,
/// ordering, slugs, soft deletes) is driven generically from the schema.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static
{
    /// Static description of the backing table.
    fn schema() -> &'static EntitySchema;

    /// The server-assigned id. Empty for drafts that were never persisted.
    fn id(&self) -> &str;

    /// Value of the manual sort column. Zero for unordered entities.
    fn position(&self) -> i64 {
        0
    }

    /// Server timestamp of the last write, if known.
    fn updated_at(&self) -> Option<Timestamp>;

    /// Entity-specific checks beyond required fields.
    ///
    /// Called for both drafts and partial updates; only fields present in
    /// `fields` should be checked.
    fn validate(fields: &Fields) -> Result<(), ValidationError> {
        let _ = fields;
        Ok(())
    }

    /// Computes derived columns from the fields being written.
    fn derive(fields: &mut Fields) {
        let _ = fields;
    }

    /// Returns a copy of this record with `patch` applied on top.
    fn patched(&self, patch: &Fields) -> serde_json::Result<Self> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        from_fields(fields)
    }
}

/// Serializes a draft or patch into a field map.
pub fn to_fields<S: Serialize + ?Sized>(value: &S) -> Result<Fields, ValidationError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::NotAnObject),
        Err(e) => Err(ValidationError::Malformed(e.to_string())),
    }
}

/// Deserializes a record from a row returned by the store.
pub fn from_fields<T: DeserializeOwned>(fields: Fields) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(fields))
}
