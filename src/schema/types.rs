//! Entity type descriptors and field value converters.
//!
//! An [`EntityType`] describes one entity type of the service: its declared
//! key fields, its structural fields with their [`FieldKind`] converters,
//! and its relations to other types. Descriptors are built once (typically
//! from service metadata, which is ingested outside this crate) and shared
//! immutably through a [`TypeRegistry`](crate::schema::TypeRegistry).

use std::collections::BTreeMap;

use chrono::DateTime;
use serde_json::Value;
use thiserror::Error;

use crate::resources::{EntityKey, KeyValue};

/// A field value that does not match its declared kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("value for field '{field}' is not a valid {kind}")]
pub struct ConversionError {
    /// The field whose value failed conversion.
    pub field: String,
    /// The declared kind name.
    pub kind: &'static str,
}

/// The primitive kind of a structural field.
///
/// Each kind carries its own scalar converter: [`convert`](Self::convert)
/// validates (and where needed normalizes) a raw JSON value. Nulls pass
/// through every kind unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `Edm.String`.
    String,
    /// `Edm.Int32` / `Edm.Int64`.
    Int,
    /// `Edm.Double` / `Edm.Single`.
    Double,
    /// `Edm.Decimal`; accepted as a JSON number or an IEEE754-compatible string.
    Decimal,
    /// `Edm.Boolean`.
    Boolean,
    /// `Edm.DateTimeOffset`; validated and normalized to RFC 3339.
    DateTimeOffset,
    /// `Edm.Guid`.
    Guid,
    /// A structured or otherwise unconverted value, passed through.
    Complex,
}

impl FieldKind {
    const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "integer",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::DateTimeOffset => "date-time offset",
            Self::Guid => "guid",
            Self::Complex => "complex value",
        }
    }

    /// Converts a raw JSON value into this kind's canonical representation.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] if the value cannot represent this kind.
    pub fn convert(self, field: &str, value: &Value) -> Result<Value, ConversionError> {
        let error = || ConversionError {
            field: field.to_string(),
            kind: self.name(),
        };

        if value.is_null() {
            return Ok(Value::Null);
        }

        match self {
            Self::Complex => Ok(value.clone()),
            Self::String => value.as_str().map(|_| value.clone()).ok_or_else(error),
            Self::Int => value.as_i64().map(Value::from).ok_or_else(error),
            Self::Double => value.as_f64().map(Value::from).ok_or_else(error),
            Self::Decimal => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) if s.parse::<f64>().is_ok() => Ok(value.clone()),
                _ => Err(error()),
            },
            Self::Boolean => value.as_bool().map(Value::from).ok_or_else(error),
            Self::DateTimeOffset => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| Value::from(dt.to_rfc3339()))
                .ok_or_else(error),
            Self::Guid => value
                .as_str()
                .filter(|s| is_guid(s))
                .map(|_| value.clone())
                .ok_or_else(error),
        }
    }
}

fn is_guid(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

/// A structural field of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field name as it appears in payloads.
    pub name: String,
    /// The field's primitive kind.
    pub kind: FieldKind,
}

/// A relation from one entity type to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// The relation name, traversable as a path segment.
    pub name: String,
    /// The target entity type name.
    pub target_type: String,
    /// `true` for collection-valued relations.
    pub collection: bool,
}

/// A descriptor of one entity type.
///
/// Exposes declared key fields, per-field converters, and relation lookup.
/// Build with [`EntityType::builder`].
///
/// # Example
///
/// ```rust
/// use odata_client::schema::{EntityType, FieldKind};
///
/// let person = EntityType::builder("Person")
///     .key("UserName")
///     .field("UserName", FieldKind::String)
///     .field("Age", FieldKind::Int)
///     .navigation("Friends", "Person", true)
///     .navigation("Manager", "Person", false)
///     .build();
///
/// assert_eq!(person.keys(), &["UserName".to_string()]);
/// assert!(person.navigation("Friends").unwrap().collection);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EntityType {
    name: String,
    keys: Vec<String>,
    fields: BTreeMap<String, Field>,
    navigations: BTreeMap<String, Navigation>,
}

impl EntityType {
    /// Creates a new builder for an entity type with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            keys: Vec::new(),
            fields: BTreeMap::new(),
            navigations: BTreeMap::new(),
        }
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared key field names, in declaration order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Looks up a structural field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Looks up a relation by name.
    #[must_use]
    pub fn navigation(&self, name: &str) -> Option<&Navigation> {
        self.navigations.get(name)
    }

    /// Resolves an entity key from a data record.
    ///
    /// Reads the declared key fields from `data`: a single key field yields
    /// a scalar key, several yield a composite key. If any declared key
    /// field is absent or empty, the key is considered absent.
    #[must_use]
    pub fn resolve_key(&self, data: &serde_json::Map<String, Value>) -> Option<EntityKey> {
        if self.keys.is_empty() {
            return None;
        }

        let mut parts: Vec<(String, KeyValue)> = Vec::with_capacity(self.keys.len());
        for key_field in &self.keys {
            let value = KeyValue::from_json(data.get(key_field)?)?;
            parts.push((key_field.clone(), value));
        }

        if parts.len() == 1 {
            Some(EntityKey::Single(parts.remove(0).1))
        } else {
            Some(EntityKey::composite(parts))
        }
    }

    /// Runs every declared field's converter over a data record.
    ///
    /// Undeclared fields pass through unchanged; the converter set defines
    /// canonical forms, not a validation whitelist.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] for the first field whose value does not
    /// match its declared kind.
    pub fn convert_record(
        &self,
        data: serde_json::Map<String, Value>,
    ) -> Result<serde_json::Map<String, Value>, ConversionError> {
        let mut converted = serde_json::Map::with_capacity(data.len());
        for (name, value) in data {
            let value = match self.fields.get(&name) {
                Some(field) => field.kind.convert(&name, &value)?,
                None => value,
            };
            converted.insert(name, value);
        }
        Ok(converted)
    }
}

/// Builder for [`EntityType`] descriptors.
#[derive(Debug)]
pub struct EntityTypeBuilder {
    name: String,
    keys: Vec<String>,
    fields: BTreeMap<String, Field>,
    navigations: BTreeMap<String, Navigation>,
}

impl EntityTypeBuilder {
    /// Declares a key field. Call once per key field, in key order.
    #[must_use]
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.keys.push(name.into());
        self
    }

    /// Declares a structural field with its kind.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        self.fields.insert(name.clone(), Field { name, kind });
        self
    }

    /// Declares a relation to another entity type.
    #[must_use]
    pub fn navigation(
        mut self,
        name: impl Into<String>,
        target_type: impl Into<String>,
        collection: bool,
    ) -> Self {
        let name = name.into();
        self.navigations.insert(
            name.clone(),
            Navigation {
                name,
                target_type: target_type.into(),
                collection,
            },
        );
        self
    }

    /// Builds the descriptor.
    #[must_use]
    pub fn build(self) -> EntityType {
        EntityType {
            name: self.name,
            keys: self.keys,
            fields: self.fields,
            navigations: self.navigations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> EntityType {
        EntityType::builder("Person")
            .key("UserName")
            .field("UserName", FieldKind::String)
            .field("Age", FieldKind::Int)
            .field("Joined", FieldKind::DateTimeOffset)
            .navigation("Friends", "Person", true)
            .build()
    }

    #[test]
    fn test_resolve_single_key() {
        let data = json!({"UserName": "russellwhyte", "Age": 30})
            .as_object()
            .unwrap()
            .clone();
        assert_eq!(
            person().resolve_key(&data),
            Some(EntityKey::from("russellwhyte"))
        );
    }

    #[test]
    fn test_resolve_key_absent_when_field_missing_or_empty() {
        let missing = json!({"Age": 30}).as_object().unwrap().clone();
        assert_eq!(person().resolve_key(&missing), None);

        let empty = json!({"UserName": ""}).as_object().unwrap().clone();
        assert_eq!(person().resolve_key(&empty), None);

        let null = json!({"UserName": null}).as_object().unwrap().clone();
        assert_eq!(person().resolve_key(&null), None);
    }

    #[test]
    fn test_resolve_composite_key() {
        let flight = EntityType::builder("Flight")
            .key("From")
            .key("To")
            .build();
        let data = json!({"From": "LAX", "To": "SFO"})
            .as_object()
            .unwrap()
            .clone();

        let key = flight.resolve_key(&data).unwrap();
        assert_eq!(key.to_literal(), "From='LAX',To='SFO'");
    }

    #[test]
    fn test_composite_key_absent_when_any_part_missing() {
        let flight = EntityType::builder("Flight")
            .key("From")
            .key("To")
            .build();
        let data = json!({"From": "LAX"}).as_object().unwrap().clone();
        assert_eq!(flight.resolve_key(&data), None);
    }

    #[test]
    fn test_datetime_converter_normalizes_rfc3339() {
        let value = FieldKind::DateTimeOffset
            .convert("Joined", &json!("2024-03-01T10:00:00+02:00"))
            .unwrap();
        assert_eq!(value, json!("2024-03-01T10:00:00+02:00"));

        let result = FieldKind::DateTimeOffset.convert("Joined", &json!("yesterday"));
        assert!(result.is_err());
    }

    #[test]
    fn test_int_converter_rejects_strings() {
        assert_eq!(FieldKind::Int.convert("Age", &json!(30)).unwrap(), json!(30));
        assert!(FieldKind::Int.convert("Age", &json!("30")).is_err());
    }

    #[test]
    fn test_decimal_converter_accepts_number_or_numeric_string() {
        assert!(FieldKind::Decimal.convert("Price", &json!(19.5)).is_ok());
        assert!(FieldKind::Decimal.convert("Price", &json!("19.5")).is_ok());
        assert!(FieldKind::Decimal.convert("Price", &json!("abc")).is_err());
    }

    #[test]
    fn test_guid_converter_checks_shape() {
        let guid = json!("01234567-89ab-cdef-0123-456789abcdef");
        assert!(FieldKind::Guid.convert("Id", &guid).is_ok());
        assert!(FieldKind::Guid.convert("Id", &json!("not-a-guid")).is_err());
    }

    #[test]
    fn test_null_passes_every_converter() {
        for kind in [
            FieldKind::String,
            FieldKind::Int,
            FieldKind::Double,
            FieldKind::Decimal,
            FieldKind::Boolean,
            FieldKind::DateTimeOffset,
            FieldKind::Guid,
            FieldKind::Complex,
        ] {
            assert_eq!(kind.convert("x", &Value::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_convert_record_passes_undeclared_fields_through() {
        let data = json!({"UserName": "x", "Undeclared": {"nested": true}})
            .as_object()
            .unwrap()
            .clone();
        let converted = person().convert_record(data).unwrap();
        assert_eq!(converted.get("Undeclared"), Some(&json!({"nested": true})));
    }

    #[test]
    fn test_convert_record_surfaces_first_mismatch() {
        let data = json!({"Age": "not a number"}).as_object().unwrap().clone();
        let error = person().convert_record(data).unwrap_err();
        assert_eq!(error.field, "Age");
    }
}
