//! Annotation-aware response mapping.
//!
//! OData payloads interleave data fields with protocol-reserved metadata
//! fields prefixed by `@` (`@odata.etag`, `@odata.count`, ...). This module
//! classifies a raw payload as entity / entity set / property, splitting it
//! into `(value, annotations)`: annotations are derived exclusively from the
//! reserved fields, never from ordinary data, and data never includes the
//! reserved fields.
//!
//! The only query string the crate ever parses is the continuation
//! `nextLink`, whose `$skip`/`$skiptoken` drive pagination.

use serde_json::{Map, Value};

use crate::resources::errors::ODataError;
use crate::resources::options::{SKIP_OPTION, SKIP_TOKEN_OPTION};
use crate::schema::EntityType;

/// The version-token annotation field.
pub const ODATA_ETAG: &str = "@odata.etag";
/// The identity-URL annotation field.
pub const ODATA_ID: &str = "@odata.id";
/// The type-name annotation field.
pub const ODATA_TYPE: &str = "@odata.type";
/// The inline-count annotation field.
pub const ODATA_COUNT: &str = "@odata.count";
/// The continuation-cursor annotation field.
pub const ODATA_NEXT_LINK: &str = "@odata.nextLink";
/// The context-URL annotation field.
pub const ODATA_CONTEXT: &str = "@odata.context";
/// The values-array / property-value field of a payload.
pub const VALUE_FIELD: &str = "value";

/// Protocol metadata of a single-entity payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EntityAnnotations {
    /// The entity's version token (`@odata.etag`).
    pub etag: Option<String>,
    /// The entity's identity URL (`@odata.id`).
    pub id: Option<String>,
    /// The entity's type name (`@odata.type`).
    pub type_name: Option<String>,
}

impl EntityAnnotations {
    /// Extracts entity annotations from a record's reserved fields.
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Self {
        Self {
            etag: string_field(record, ODATA_ETAG),
            id: string_field(record, ODATA_ID),
            type_name: string_field(record, ODATA_TYPE).map(strip_type_prefix),
        }
    }
}

/// Protocol metadata of an entity-set payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CollectionAnnotations {
    /// The total record count (`@odata.count`), when inline count was requested.
    pub count: Option<u64>,
    /// The raw continuation URL (`@odata.nextLink`).
    pub next_link: Option<String>,
    /// The `$skip` cursor parsed out of the continuation URL.
    pub next_skip: Option<u64>,
    /// The `$skiptoken` cursor parsed out of the continuation URL.
    pub next_skip_token: Option<String>,
}

impl CollectionAnnotations {
    /// Returns `true` if the server supplied a continuation cursor.
    #[must_use]
    pub const fn has_continuation(&self) -> bool {
        self.next_skip.is_some() || self.next_skip_token.is_some()
    }
}

/// Protocol metadata of a property payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PropertyAnnotations {
    /// The property's type name (`@odata.type`).
    pub type_name: Option<String>,
}

/// Splits a single-entity payload into `(data, annotations)`.
///
/// All `@`-prefixed fields become annotations; everything else is data.
/// When an [`EntityType`] is supplied, each declared field's value passes
/// through its converter.
///
/// # Errors
///
/// Returns [`ODataError::MalformedResponse`] if the payload is not an
/// object, or if a declared field's value does not match its kind.
pub fn parse_entity(
    payload: Value,
    entity_type: Option<&EntityType>,
) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
    let Value::Object(record) = payload else {
        return Err(ODataError::MalformedResponse {
            reason: "expected an entity object".to_string(),
        });
    };

    let annotations = EntityAnnotations::from_record(&record);
    let data: Map<String, Value> = record
        .into_iter()
        .filter(|(name, _)| !name.starts_with('@'))
        .collect();

    let data = match entity_type {
        Some(entity_type) => {
            entity_type
                .convert_record(data)
                .map_err(|e| ODataError::MalformedResponse {
                    reason: e.to_string(),
                })?
        }
        None => data,
    };

    Ok((data, annotations))
}

/// Splits an entity-set payload into `(records, annotations)`.
///
/// The payload must carry the `value` array; its absence is a malformed
/// response, never a silent empty collection. Each element keeps its own
/// reserved fields; they are split per entity by [`parse_entity`] when the
/// element is materialized.
///
/// # Errors
///
/// Returns [`ODataError::MalformedResponse`] if the payload is not an
/// object or the `value` array is absent.
pub fn parse_entities(payload: Value) -> Result<(Vec<Value>, CollectionAnnotations), ODataError> {
    let Value::Object(mut record) = payload else {
        return Err(ODataError::MalformedResponse {
            reason: "expected an entity-set object".to_string(),
        });
    };

    let next_link = string_field(&record, ODATA_NEXT_LINK);
    let (next_skip, next_skip_token) = next_link
        .as_deref()
        .map_or((None, None), parse_next_link);
    let annotations = CollectionAnnotations {
        count: count_field(&record),
        next_link,
        next_skip,
        next_skip_token,
    };

    match record.remove(VALUE_FIELD) {
        Some(Value::Array(items)) => Ok((items, annotations)),
        _ => Err(ODataError::MalformedResponse {
            reason: format!("entity-set response is missing its '{VALUE_FIELD}' array"),
        }),
    }
}

/// Extracts a property payload's value and annotations.
///
/// The designated `value` field may hold a scalar or a single object.
///
/// # Errors
///
/// Returns [`ODataError::MalformedResponse`] if the payload is not an
/// object or the `value` field is absent.
pub fn parse_property(payload: Value) -> Result<(Value, PropertyAnnotations), ODataError> {
    let Value::Object(mut record) = payload else {
        return Err(ODataError::MalformedResponse {
            reason: "expected a property object".to_string(),
        });
    };

    let annotations = PropertyAnnotations {
        type_name: string_field(&record, ODATA_TYPE).map(strip_type_prefix),
    };

    record
        .remove(VALUE_FIELD)
        .map(|value| (value, annotations))
        .ok_or_else(|| ODataError::MalformedResponse {
            reason: format!("property response is missing its '{VALUE_FIELD}' field"),
        })
}

/// Parses a continuation URL's query string for its paging cursors.
///
/// Returns the `$skip` and `$skiptoken` values carried by the link.
#[must_use]
pub fn parse_next_link(link: &str) -> (Option<u64>, Option<String>) {
    let Some(query_start) = link.find('?') else {
        return (None, None);
    };

    let mut skip = None;
    let mut skip_token = None;
    for param in link[query_start + 1..].split('&') {
        let mut parts = param.splitn(2, '=');
        let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let name = urlencoding::decode(name).map_or_else(|_| name.to_string(), |d| d.into_owned());
        let value =
            urlencoding::decode(value).map_or_else(|_| value.to_string(), |d| d.into_owned());
        if name == SKIP_OPTION {
            skip = value.parse::<u64>().ok();
        } else if name == SKIP_TOKEN_OPTION {
            skip_token = Some(value);
        }
    }

    (skip, skip_token)
}

fn string_field(record: &Map<String, Value>, name: &str) -> Option<String> {
    record
        .get(name)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

// Inline count may arrive as a number or an IEEE754-compatible string.
fn count_field(record: &Map<String, Value>) -> Option<u64> {
    match record.get(ODATA_COUNT) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

// "#Namespace.Type" and "Namespace.Type" both name the same type.
fn strip_type_prefix(type_name: String) -> String {
    match type_name.strip_prefix('#') {
        Some(stripped) => stripped.to_string(),
        None => type_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityType, FieldKind};
    use serde_json::json;

    #[test]
    fn test_parse_entity_splits_annotations_from_data() {
        let payload = json!({
            "@odata.etag": "W/\"08D9\"",
            "@odata.id": "People('russellwhyte')",
            "@odata.type": "#Trippin.Person",
            "UserName": "russellwhyte",
            "Age": 30
        });

        let (data, annotations) = parse_entity(payload, None).unwrap();

        assert_eq!(annotations.etag.as_deref(), Some("W/\"08D9\""));
        assert_eq!(annotations.id.as_deref(), Some("People('russellwhyte')"));
        assert_eq!(annotations.type_name.as_deref(), Some("Trippin.Person"));
        assert_eq!(data.get("UserName"), Some(&json!("russellwhyte")));
        assert_eq!(data.get("Age"), Some(&json!(30)));
        assert!(data.keys().all(|k| !k.starts_with('@')));
    }

    #[test]
    fn test_parse_entity_applies_field_converters() {
        let person = EntityType::builder("Person")
            .key("UserName")
            .field("Age", FieldKind::Int)
            .build();

        let ok = parse_entity(json!({"Age": 30}), Some(&person));
        assert!(ok.is_ok());

        let bad = parse_entity(json!({"Age": "thirty"}), Some(&person));
        assert!(matches!(bad, Err(ODataError::MalformedResponse { .. })));
    }

    #[test]
    fn test_parse_entity_rejects_non_object() {
        assert!(matches!(
            parse_entity(json!([1, 2]), None),
            Err(ODataError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_parse_entities_requires_value_array() {
        let payload = json!({"@odata.count": 5});
        let result = parse_entities(payload);
        assert!(matches!(
            result,
            Err(ODataError::MalformedResponse { reason }) if reason.contains("value")
        ));
    }

    #[test]
    fn test_parse_entities_extracts_count_and_cursor() {
        let payload = json!({
            "@odata.count": 5,
            "@odata.nextLink": "People?$top=2&$skip=2",
            "value": [{"Id": 1}, {"Id": 2}]
        });

        let (items, annotations) = parse_entities(payload).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(annotations.count, Some(5));
        assert_eq!(annotations.next_skip, Some(2));
        assert_eq!(annotations.next_skip_token, None);
        assert!(annotations.has_continuation());
    }

    #[test]
    fn test_parse_entities_accepts_string_count() {
        let payload = json!({"@odata.count": "7", "value": []});
        let (_, annotations) = parse_entities(payload).unwrap();
        assert_eq!(annotations.count, Some(7));
    }

    #[test]
    fn test_parse_entities_preserves_order() {
        let payload = json!({"value": [{"Id": 3}, {"Id": 1}, {"Id": 2}]});
        let (items, _) = parse_entities(payload).unwrap();
        let ids: Vec<i64> = items.iter().map(|v| v["Id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_parse_entities_without_annotations() {
        let payload = json!({"value": []});
        let (items, annotations) = parse_entities(payload).unwrap();
        assert!(items.is_empty());
        assert_eq!(annotations.count, None);
        assert!(!annotations.has_continuation());
    }

    #[test]
    fn test_parse_property_scalar() {
        let payload = json!({"@odata.context": "$metadata#People('1')/Age", "value": 30});
        let (value, annotations) = parse_property(payload).unwrap();
        assert_eq!(value, json!(30));
        assert_eq!(annotations.type_name, None);
    }

    #[test]
    fn test_parse_property_object_with_type() {
        let payload = json!({
            "@odata.type": "#Trippin.Location",
            "value": {"Address": "Main St"}
        });
        let (value, annotations) = parse_property(payload).unwrap();
        assert_eq!(value, json!({"Address": "Main St"}));
        assert_eq!(annotations.type_name.as_deref(), Some("Trippin.Location"));
    }

    #[test]
    fn test_parse_property_missing_value_is_malformed() {
        let payload = json!({"@odata.context": "..."});
        assert!(matches!(
            parse_property(payload),
            Err(ODataError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_parse_next_link_skip_cursor() {
        let (skip, token) = parse_next_link("https://ex.org/odata/People?$top=2&$skip=4");
        assert_eq!(skip, Some(4));
        assert_eq!(token, None);
    }

    #[test]
    fn test_parse_next_link_skiptoken_cursor() {
        let (skip, token) = parse_next_link("People?$skiptoken=abc123");
        assert_eq!(skip, None);
        assert_eq!(token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_parse_next_link_without_query() {
        assert_eq!(parse_next_link("People"), (None, None));
    }

    #[test]
    fn test_cursor_roundtrip_through_rendered_query() {
        use crate::resources::options::QueryOptions;

        let mut options = QueryOptions::new();
        options.set_top(2);
        options.set_skip(6);
        let rendered = options
            .to_query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let (skip, _) = parse_next_link(&format!("People?{rendered}"));
        assert_eq!(skip, Some(6));
    }
}
