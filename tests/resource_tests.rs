//! Integration tests for the resource algebra.
//!
//! These tests verify path composition, query-option rendering, clone
//! independence, annotation parsing, and the continuation-cursor round trip
//! without touching any transport.

use odata_client::resources::{parse_entities, parse_entity, parse_next_link, parse_property};
use odata_client::schema::{EntityType, FieldKind, TypeRegistry};
use odata_client::{Filter, KeyValue, ODataError, Resource, SortDirection, UsageError};
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Shared schema
// ============================================================================

fn registry() -> Arc<TypeRegistry> {
    TypeRegistry::builder()
        .entity_type(
            EntityType::builder("Person")
                .key("UserName")
                .field("UserName", FieldKind::String)
                .field("Age", FieldKind::Int)
                .field("Joined", FieldKind::DateTimeOffset)
                .navigation("Friends", "Person", true)
                .navigation("Manager", "Person", false)
                .navigation("Airline", "Airline", false)
                .build(),
        )
        .entity_type(
            EntityType::builder("Airline")
                .key("AirlineCode")
                .field("AirlineCode", FieldKind::String)
                .build(),
        )
        .entity_set("People", "Person")
        .entity_set("Airlines", "Airline")
        .build()
}

// ============================================================================
// Path composition
// ============================================================================

#[test]
fn navigation_appends_exactly_one_segment() {
    let person = Resource::entity_set("People", registry())
        .entity("russellwhyte")
        .unwrap();
    let friends = person.navigation("Friends").unwrap();

    assert_eq!(friends.path(), format!("{}/Friends", person.path()));
}

#[test]
fn navigation_chain_carries_keys_per_segment() {
    let resource = Resource::entity_set("People", registry())
        .entity("russellwhyte")
        .unwrap()
        .navigation("Friends")
        .unwrap()
        .entity("scottketchum")
        .unwrap();

    assert_eq!(resource.path(), "People('russellwhyte')/Friends('scottketchum')");
}

#[test]
fn navigation_has_no_key_until_entity_is_called() {
    let friends = Resource::entity_set("People", registry())
        .entity("1")
        .unwrap()
        .navigation("Friends")
        .unwrap();

    assert!(!friends.has_key());
    assert!(friends.entity("2").unwrap().has_key());
}

#[test]
fn composite_keys_render_named_parts() {
    let registry = TypeRegistry::builder()
        .entity_type(EntityType::builder("Flight").key("From").key("To").build())
        .entity_set("Flights", "Flight")
        .build();

    let flight = Resource::entity_set("Flights", registry)
        .entity(odata_client::EntityKey::composite([
            ("From".to_string(), KeyValue::from("LAX")),
            ("To".to_string(), KeyValue::from("SFO")),
        ]))
        .unwrap();

    assert_eq!(flight.path(), "Flights(From='LAX',To='SFO')");
}

#[test]
fn keyless_navigation_is_a_synchronous_usage_error() {
    let people = Resource::entity_set("People", registry());

    assert!(matches!(
        people.navigation("Friends"),
        Err(UsageError::MissingKey { .. })
    ));
    assert!(matches!(
        people.property("FirstName"),
        Err(UsageError::MissingKey { .. })
    ));
}

#[test]
fn type_narrowing_follows_the_registry() {
    let airline = Resource::entity_set("People", registry())
        .entity("1")
        .unwrap()
        .navigation("Airline")
        .unwrap();

    assert_eq!(airline.type_name(), Some("Airline"));
    assert!(airline.entity("AA").unwrap().has_key());
}

// ============================================================================
// Clone independence
// ============================================================================

#[test]
fn clone_mutation_never_leaks_either_direction() {
    let mut original = Resource::entity_set("People", registry());
    original.options_mut().set_top(5);

    let mut copy = original.clone();
    copy.options_mut().set_top(50);
    copy.options_mut().set_skip(10);

    original.options_mut().set_select(["UserName"]);

    assert_eq!(original.to_url_string(), "People?$select=UserName&$top=5");
    assert_eq!(copy.to_url_string(), "People?$top=50&$skip=10");
}

#[test]
fn derived_resource_snapshots_parent_options() {
    let mut people = Resource::entity_set("People", registry());
    people.options_mut().set_top(5);

    let person = people.entity("1").unwrap();
    people.options_mut().set_top(99);

    assert_eq!(person.options().top(), Some(5));
}

#[test]
fn expand_scopes_are_cloned_deeply() {
    let mut people = Resource::entity_set("People", registry());
    people.options_mut().expand_mut("Friends").set_top(2);

    let mut copy = people.clone();
    copy.options_mut().expand_mut("Friends").set_select(["UserName"]);

    assert_eq!(people.to_url_string(), "People?$expand=Friends($top=2)");
    assert_eq!(
        copy.to_url_string(),
        "People?$expand=Friends($select=UserName;$top=2)"
    );
}

// ============================================================================
// Query-option rendering
// ============================================================================

#[test]
fn full_option_set_renders_each_option_once() {
    let mut people = Resource::entity_set("People", registry());
    let options = people.options_mut();
    options.set_select(["UserName", "Age"]);
    options.set_filter(Filter::gt("Age", 21).and(Filter::contains("UserName", "russ")));
    options.set_search("boise");
    options.set_order_by([("Age", SortDirection::Desc)]);
    options.set_top(10);
    options.set_skip(20);
    options.set_format("json");
    options.set_custom("debug", "1");

    let url = people.to_url_string();
    assert_eq!(
        url,
        "People?$select=UserName,Age\
         &$filter=Age gt 21 and contains(UserName,'russ')\
         &$search=boise&$orderby=Age desc&$top=10&$skip=20&$format=json&debug=1"
    );

    // No duplicate option names.
    let names: Vec<&str> = url
        .split('?')
        .nth(1)
        .unwrap()
        .split('&')
        .map(|pair| pair.split('=').next().unwrap())
        .collect();
    let mut deduped = names.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(names.len(), deduped.len());
}

#[test]
fn getter_form_is_idempotent_and_pure() {
    let mut people = Resource::entity_set("People", registry());
    people.options_mut().set_top(3);

    let before = people.to_url_string();
    assert_eq!(people.options().top(), Some(3));
    assert_eq!(people.options().top(), Some(3));
    assert_eq!(people.options().select(), None);
    assert_eq!(people.to_url_string(), before);
}

// ============================================================================
// Annotation parsing
// ============================================================================

#[test]
fn entity_annotations_never_mix_into_data() {
    let (data, annotations) = parse_entity(
        json!({
            "@odata.context": "$metadata#People/$entity",
            "@odata.etag": "W/\"08D9\"",
            "@odata.id": "People('russellwhyte')",
            "UserName": "russellwhyte",
            "Age": 30
        }),
        None,
    )
    .unwrap();

    assert_eq!(data.len(), 2);
    assert_eq!(annotations.etag.as_deref(), Some("W/\"08D9\""));
}

#[test]
fn field_converters_run_only_on_declared_fields() {
    let registry = registry();
    let person = registry.entity_type("Person").unwrap();

    let ok = parse_entity(
        json!({"UserName": "x", "Joined": "2020-01-01T00:00:00Z", "Extra": [1, 2]}),
        Some(&person),
    );
    assert!(ok.is_ok());

    let bad = parse_entity(json!({"Joined": "not a date"}), Some(&person));
    assert!(matches!(bad, Err(ODataError::MalformedResponse { .. })));
}

#[test]
fn missing_values_array_is_malformed_not_empty() {
    let result = parse_entities(json!({"@odata.count": 3}));
    assert!(matches!(result, Err(ODataError::MalformedResponse { .. })));
}

#[test]
fn property_payload_requires_value_field() {
    let (value, _) = parse_property(json!({"value": "Boise"})).unwrap();
    assert_eq!(value, json!("Boise"));

    assert!(matches!(
        parse_property(json!({"other": 1})),
        Err(ODataError::MalformedResponse { .. })
    ));
}

// ============================================================================
// Continuation cursor round trip
// ============================================================================

#[test]
fn rendered_cursor_options_survive_reparsing() {
    let mut people = Resource::entity_set("People", registry());
    people.options_mut().set_top(2);
    people.options_mut().set_skip(4);

    let link = format!("https://example.org/odata/{}", people.to_url_string());
    let (skip, token) = parse_next_link(&link);

    assert_eq!(skip, Some(4));
    assert_eq!(token, None);
}

#[test]
fn percent_encoded_skiptoken_is_decoded() {
    let (skip, token) = parse_next_link("People?%24skiptoken=abc%3D%3D&x=1");
    assert_eq!(skip, None);
    assert_eq!(token.as_deref(), Some("abc=="));
}

#[test]
fn next_link_cursor_drives_a_new_resource() {
    let (_, annotations) = parse_entities(json!({
        "@odata.nextLink": "People?$top=2&$skip=2",
        "value": []
    }))
    .unwrap();

    let mut next = Resource::entity_set("People", registry());
    if let Some(skip) = annotations.next_skip {
        next.options_mut().set_skip(skip);
    }
    assert_eq!(next.to_url_string(), "People?$skip=2");
}
