//! Integration tests for the Model/Collection state machines.
//!
//! These tests drive models and collections through an in-process transport
//! double that records every issued request and replays scripted responses,
//! verifying request shapes, pagination state, optimistic concurrency, and
//! failure classification end to end.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;

use odata_client::clients::{
    HttpError, HttpMethod, HttpRequest, HttpResponse, HttpResponseError, Transport,
};
use odata_client::schema::{EntityType, FieldKind, TypeRegistry};
use odata_client::{
    Collection, Model, ModelState, ODataError, RequestOptions, Resource, UsageError,
};
use serde_json::{json, Value};

// ============================================================================
// Transport double
// ============================================================================

/// Replays scripted responses and records every request it receives.
struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push_ok(&self, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(200, HashMap::new(), body)));
    }

    fn push_no_content(&self) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(204, HashMap::new(), Value::Null)));
    }

    fn push_error(&self, code: u16) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(HttpError::Response(HttpResponseError {
                code,
                message: String::new(),
                request_id: None,
            })));
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport received an unscripted request")
    }
}

// ============================================================================
// Shared schema
// ============================================================================

fn registry() -> Arc<TypeRegistry> {
    TypeRegistry::builder()
        .entity_type(
            EntityType::builder("Person")
                .key("UserName")
                .field("UserName", FieldKind::String)
                .field("FirstName", FieldKind::String)
                .navigation("Friends", "Person", true)
                .navigation("Manager", "Person", false)
                .build(),
        )
        .entity_type(
            EntityType::builder("Item")
                .key("Id")
                .field("Id", FieldKind::Int)
                .build(),
        )
        .entity_set("People", "Person")
        .entity_set("Items", "Item")
        .build()
}

fn people() -> Resource {
    Resource::entity_set("People", registry())
}

fn opts() -> RequestOptions {
    RequestOptions::new()
}

fn has_pair(request: &HttpRequest, name: &str, value: &str) -> bool {
    request
        .query
        .iter()
        .any(|(n, v)| n == name && v == value)
}

// ============================================================================
// Model: fetch
// ============================================================================

#[tokio::test]
async fn fetch_reassigns_data_and_annotations() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.etag": "W/\"2\"",
        "UserName": "russellwhyte",
        "FirstName": "Russell"
    }));

    let mut model = Model::from_value(people(), json!({"UserName": "russellwhyte"}));
    model.fetch(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].path, "People('russellwhyte')");

    assert_eq!(model.get("FirstName"), Some(&json!("Russell")));
    assert_eq!(model.annotations().etag.as_deref(), Some("W/\"2\""));
    assert_eq!(model.state(), ModelState::Bound);
}

#[tokio::test]
async fn fetch_without_key_fails_before_any_io() {
    let transport = MockTransport::new();
    let mut model = Model::new(people(), serde_json::Map::new());

    let error = model.fetch(&transport, &opts()).await.unwrap_err();

    assert!(matches!(
        error,
        ODataError::Usage(UsageError::MissingKey { .. })
    ));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn fetch_classifies_404_as_not_found() {
    let transport = MockTransport::new();
    transport.push_error(404);

    let mut model = Model::from_value(people(), json!({"UserName": "ghost"}));
    let error = model.fetch(&transport, &opts()).await.unwrap_err();

    assert!(error.is_not_found());
    // The model keeps its pre-call state.
    assert_eq!(model.get("UserName"), Some(&json!("ghost")));
}

// ============================================================================
// Model: save
// ============================================================================

#[tokio::test]
async fn save_of_new_model_posts_to_the_set_without_key_segment() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.etag": "W/\"1\"",
        "UserName": "newuser",
        "FirstName": "New"
    }));

    let mut model = Model::new(people(), serde_json::Map::new());
    model.set("FirstName", json!("New"));
    assert!(model.is_new());

    model.save(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].path, "People");
    assert!(requests[0].version_token.is_none());

    // The server assigned the key: the model is bound now.
    assert!(!model.is_new());
    assert_eq!(model.state(), ModelState::Bound);
    assert_eq!(model.resource().path(), "People('newuser')");
}

#[tokio::test]
async fn save_of_bound_model_puts_at_keyed_address_with_version_token() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"@odata.etag": "W/\"2\"", "UserName": "1", "FirstName": "B"}));

    let mut model = Model::from_value(
        people(),
        json!({"@odata.etag": "W/\"1\"", "UserName": "1", "FirstName": "A"}),
    );
    model.set("FirstName", json!("B"));
    model.save(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Put);
    assert_eq!(requests[0].path, "People('1')");
    assert_eq!(requests[0].version_token.as_deref(), Some("W/\"1\""));

    assert_eq!(model.annotations().etag.as_deref(), Some("W/\"2\""));
}

#[tokio::test]
async fn save_keeps_local_data_on_no_content_reply() {
    let transport = MockTransport::new();
    transport.push_no_content();

    let mut model = Model::from_value(
        people(),
        json!({"@odata.etag": "W/\"1\"", "UserName": "1", "FirstName": "B"}),
    );
    model.save(&transport, &opts()).await.unwrap();

    assert_eq!(model.get("FirstName"), Some(&json!("B")));
}

#[tokio::test]
async fn conflicting_update_surfaces_as_concurrency_conflict_and_leaves_data() {
    let transport = MockTransport::new();
    transport.push_error(412);

    let mut model = Model::from_value(
        people(),
        json!({"@odata.etag": "W/\"stale\"", "UserName": "1", "FirstName": "A"}),
    );
    model.set("FirstName", json!("B"));

    let error = model.save(&transport, &opts()).await.unwrap_err();

    assert!(error.is_conflict());
    assert_eq!(model.get("FirstName"), Some(&json!("B")));
    assert_eq!(model.annotations().etag.as_deref(), Some("W/\"stale\""));
    // One attempt only; conflicts are never retried.
    assert_eq!(transport.request_count(), 1);
}

// ============================================================================
// Model: patch, destroy, fetch_or_create
// ============================================================================

#[tokio::test]
async fn patch_sends_delta_and_applies_it_locally() {
    let transport = MockTransport::new();
    transport.push_no_content();

    let mut model = Model::from_value(
        people(),
        json!({"@odata.etag": "W/\"1\"", "UserName": "1", "FirstName": "A"}),
    );
    let delta = json!({"FirstName": "Z"}).as_object().unwrap().clone();
    model.patch(&transport, delta, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Patch);
    assert_eq!(requests[0].path, "People('1')");
    assert_eq!(requests[0].body, Some(json!({"FirstName": "Z"})));
    assert_eq!(requests[0].version_token.as_deref(), Some("W/\"1\""));

    assert_eq!(model.get("FirstName"), Some(&json!("Z")));
    assert_eq!(model.get("UserName"), Some(&json!("1")));
}

#[tokio::test]
async fn destroy_deletes_with_token_and_poisons_the_model() {
    let transport = MockTransport::new();
    transport.push_no_content();

    let mut model = Model::from_value(
        people(),
        json!({"@odata.etag": "W/\"1\"", "UserName": "1"}),
    );
    model.destroy(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Delete);
    assert_eq!(requests[0].path, "People('1')");
    assert_eq!(requests[0].version_token.as_deref(), Some("W/\"1\""));
    assert!(model.is_destroyed());

    // Post-destroy use fails fast, never silently no-ops.
    let error = model.fetch(&transport, &opts()).await.unwrap_err();
    assert!(matches!(error, ODataError::Usage(UsageError::Destroyed)));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn destroy_requires_the_stored_version_token() {
    let transport = MockTransport::new();
    let mut model = Model::from_value(people(), json!({"UserName": "1"}));

    let error = model.destroy(&transport, &opts()).await.unwrap_err();

    assert!(matches!(
        error,
        ODataError::Usage(UsageError::MissingVersionToken { .. })
    ));
    assert_eq!(transport.request_count(), 0);
    assert!(!model.is_destroyed());
}

#[tokio::test]
async fn fetch_or_create_falls_back_to_create_only_on_404() {
    let transport = MockTransport::new();
    transport.push_error(404);
    transport.push_ok(json!({"UserName": "1", "FirstName": "Created"}));

    let mut model = Model::from_value(people(), json!({"UserName": "1"}));
    model.fetch_or_create(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[1].method, HttpMethod::Post);
    assert_eq!(requests[1].path, "People");
    assert_eq!(model.get("FirstName"), Some(&json!("Created")));
}

#[tokio::test]
async fn fetch_or_create_propagates_non_404_failures() {
    let transport = MockTransport::new();
    transport.push_error(500);

    let mut model = Model::from_value(people(), json!({"UserName": "1"}));
    let error = model.fetch_or_create(&transport, &opts()).await.unwrap_err();

    assert!(matches!(error, ODataError::Transport(_)));
    assert_eq!(transport.request_count(), 1);
}

// ============================================================================
// Model: references
// ============================================================================

#[tokio::test]
async fn create_ref_on_single_valued_relation_puts_identity_body() {
    let transport = MockTransport::new();
    transport.push_no_content();

    let model = Model::from_value(people(), json!({"UserName": "1"}));
    model
        .create_ref(&transport, "Manager", "People('boss')", &opts())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Put);
    assert_eq!(requests[0].path, "People('1')/Manager/$ref");
    assert_eq!(requests[0].body, Some(json!({"@odata.id": "People('boss')"})));
}

#[tokio::test]
async fn create_ref_on_collection_valued_relation_posts_one_member() {
    let transport = MockTransport::new();
    transport.push_no_content();

    let model = Model::from_value(people(), json!({"UserName": "1"}));
    model
        .create_ref(&transport, "Friends", "People('2')", &opts())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].path, "People('1')/Friends/$ref");
    assert_eq!(requests[0].body, Some(json!({"@odata.id": "People('2')"})));
}

#[tokio::test]
async fn delete_ref_on_collection_valued_relation_filters_by_identity() {
    let transport = MockTransport::new();
    transport.push_no_content();

    let model = Model::from_value(people(), json!({"UserName": "1"}));
    model
        .delete_ref(&transport, "Friends", "People('2')", &opts())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Delete);
    assert_eq!(requests[0].path, "People('1')/Friends/$ref");
    assert!(has_pair(&requests[0], "$id", "People('2')"));
}

#[tokio::test]
async fn delete_ref_on_single_valued_relation_is_a_plain_delete() {
    let transport = MockTransport::new();
    transport.push_no_content();

    let model = Model::from_value(
        people(),
        json!({"@odata.etag": "W/\"1\"", "UserName": "1"}),
    );
    model
        .delete_ref(&transport, "Manager", "People('boss')", &opts())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Delete);
    assert_eq!(requests[0].path, "People('1')/Manager/$ref");
    assert!(!has_pair(&requests[0], "$id", "People('boss')"));
    assert_eq!(requests[0].version_token.as_deref(), Some("W/\"1\""));
}

// ============================================================================
// Collection: pagination
// ============================================================================

fn items() -> Resource {
    Resource::entity_set("Items", registry())
}

#[tokio::test]
async fn first_page_derives_page_state_from_annotations() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.count": 5,
        "@odata.nextLink": "Items?$top=2&$skip=2",
        "value": [{"Id": 1}, {"Id": 2}]
    }));

    let mut collection = Collection::new(items());
    collection.options_mut().set_top(2);
    collection.fetch(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert!(has_pair(&requests[0], "$top", "2"));
    assert!(has_pair(&requests[0], "$count", "true"));

    let state = collection.page_state();
    assert_eq!(state.page, Some(1));
    assert_eq!(state.page_size, Some(2));
    assert_eq!(state.total_records, Some(5));
    assert_eq!(state.total_pages, Some(3));

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.models()[0].resource().path(), "Items(1)");
}

#[tokio::test]
async fn next_page_requests_skip_and_top_from_page_state() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.count": 5,
        "@odata.nextLink": "Items?$top=2&$skip=2",
        "value": [{"Id": 1}, {"Id": 2}]
    }));
    transport.push_ok(json!({
        "@odata.count": 5,
        "value": [{"Id": 3}, {"Id": 4}]
    }));

    let mut collection = Collection::new(items());
    collection.options_mut().set_top(2);
    collection.fetch(&transport, &opts()).await.unwrap();
    collection.get_next_page(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert!(has_pair(&requests[1], "$skip", "2"));
    assert!(has_pair(&requests[1], "$top", "2"));
    assert_eq!(collection.page_state().page, Some(2));
}

#[tokio::test]
async fn out_of_range_page_clamps_to_the_last_page() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.count": 95,
        "@odata.nextLink": "Items?$skip=20",
        "value": [{"Id": 1}]
    }));
    transport.push_ok(json!({"@odata.count": 95, "value": [{"Id": 95}]}));

    let mut collection = Collection::new(items());
    collection.fetch(&transport, &opts()).await.unwrap();
    assert_eq!(collection.page_state().total_pages, Some(5));

    collection.get_page(&transport, 6, &opts()).await.unwrap();

    let requests = transport.requests();
    // Page 6 clamps to page 5: skip = 20 * 4.
    assert!(has_pair(&requests[1], "$skip", "80"));
    assert_eq!(collection.page_state().page, Some(5));
}

#[tokio::test]
async fn page_navigation_degrades_to_plain_fetch_without_count() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"value": [{"Id": 1}]}));
    transport.push_ok(json!({"value": [{"Id": 1}]}));

    let mut collection = Collection::new(items());
    collection.fetch(&transport, &opts()).await.unwrap();

    let state = *collection.page_state();
    assert_eq!(state.total_records, None);
    assert_eq!(state.total_pages, None);

    collection.get_last_page(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    // No paging options were injected: both are plain fetches.
    assert!(!requests[1].query.iter().any(|(n, _)| n == "$skip"));
    assert_eq!(collection.page_state().page, Some(1));
}

#[tokio::test]
async fn failed_fetch_leaves_collection_untouched() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"@odata.count": 2, "value": [{"Id": 1}, {"Id": 2}]}));
    transport.push_error(500);

    let mut collection = Collection::new(items());
    collection.fetch(&transport, &opts()).await.unwrap();
    let before_models = collection.len();
    let before_state = *collection.page_state();

    let error = collection.fetch(&transport, &opts()).await.unwrap_err();
    assert!(matches!(error, ODataError::Transport(_)));
    assert_eq!(collection.len(), before_models);
    assert_eq!(*collection.page_state(), before_state);
}

#[tokio::test]
async fn malformed_collection_payload_is_not_a_silent_empty_set() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"@odata.count": 2}));

    let mut collection = Collection::new(items());
    let error = collection.fetch(&transport, &opts()).await.unwrap_err();

    assert!(matches!(error, ODataError::MalformedResponse { .. }));
}

#[tokio::test]
async fn count_ignores_current_paging() {
    let transport = MockTransport::new();
    transport.push_ok(json!(42));

    let mut collection = Collection::new(items());
    collection.options_mut().set_top(2);
    collection.options_mut().set_skip(4);

    let count = collection.count(&transport, &opts()).await.unwrap();
    assert_eq!(count, 42);

    let requests = transport.requests();
    assert_eq!(requests[0].path, "Items/$count");
    assert!(requests[0].query.is_empty());
}

#[tokio::test]
async fn query_mutation_is_picked_up_by_the_next_fetch() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"value": []}));

    let mut collection = Collection::new(items());
    collection.set_filter(odata_client::Filter::eq("Id", 7));
    collection.fetch(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert!(has_pair(&requests[0], "$filter", "Id eq 7"));
}

// ============================================================================
// Resource: fetch_all page loop
// ============================================================================

#[tokio::test]
async fn fetch_all_follows_cursors_until_exhausted_in_order() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.nextLink": "Items?$skip=2",
        "value": [{"Id": 1}, {"Id": 2}]
    }));
    transport.push_ok(json!({
        "@odata.nextLink": "Items?$skip=4",
        "value": [{"Id": 3}, {"Id": 4}]
    }));
    transport.push_ok(json!({"value": [{"Id": 5}]}));

    let all = items().fetch_all(&transport, &opts()).await.unwrap();

    let ids: Vec<i64> = all.iter().map(|v| v["Id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(has_pair(&requests[1], "$skip", "2"));
    assert!(has_pair(&requests[2], "$skip", "4"));
}

#[tokio::test]
async fn fetch_all_switches_to_skiptoken_cursors() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.nextLink": "Items?$skiptoken=t1",
        "value": [{"Id": 1}]
    }));
    transport.push_ok(json!({"value": [{"Id": 2}]}));

    let all = items().fetch_all(&transport, &opts()).await.unwrap();
    assert_eq!(all.len(), 2);

    let requests = transport.requests();
    assert!(has_pair(&requests[1], "$skiptoken", "t1"));
}

#[tokio::test]
async fn fetch_all_does_not_mutate_the_source_resource() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.nextLink": "Items?$skip=1",
        "value": [{"Id": 1}]
    }));
    transport.push_ok(json!({"value": [{"Id": 2}]}));

    let resource = items();
    resource.fetch_all(&transport, &opts()).await.unwrap();

    assert_eq!(resource.to_url_string(), "Items");
}

// ============================================================================
// Resource verbs: guards, properties, operations
// ============================================================================

#[tokio::test]
async fn entity_verbs_on_a_keyless_set_fail_before_any_io() {
    let transport = MockTransport::new();
    let sets = people();

    let error = sets.get_entity(&transport, &opts()).await.unwrap_err();
    assert!(matches!(
        error,
        ODataError::Usage(UsageError::MissingKey { .. })
    ));

    let error = sets.delete(&transport, None, &opts()).await.unwrap_err();
    assert!(matches!(
        error,
        ODataError::Usage(UsageError::MissingKey { .. })
    ));

    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn property_fetch_returns_value_and_annotations() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "@odata.context": "$metadata#People('1')/FirstName",
        "value": "Russell"
    }));

    let property = people()
        .entity("1")
        .unwrap()
        .property("FirstName")
        .unwrap();
    let (value, _annotations) = property.get_property(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].path, "People('1')/FirstName");
    assert_eq!(value, json!("Russell"));
}

#[tokio::test]
async fn bound_action_posts_at_the_call_address() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"value": 99}));

    let model = Model::from_value(people(), json!({"UserName": "1"}));
    let action = model.action_resource("Trippin.ShareTrip", None).unwrap();
    let (value, _) = action
        .post_property(&transport, json!({"tripId": 7}), &opts())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].path, "People('1')/Trippin.ShareTrip");
    assert_eq!(requests[0].body, Some(json!({"tripId": 7})));
    assert_eq!(value, json!(99));
}

#[tokio::test]
async fn bound_function_gets_with_inline_params() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "AirlineCode": "AA",
        "@odata.etag": "W/\"a\""
    }));

    let model = Model::from_value(people(), json!({"UserName": "1"}));
    let function = model
        .function_resource(
            "Trippin.GetFavoriteAirline",
            [("year".to_string(), odata_client::KeyValue::Int(2020))],
            None,
        )
        .unwrap();
    let (data, annotations) = function.get_entity(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(
        requests[0].path,
        "People('1')/Trippin.GetFavoriteAirline(year=2020)"
    );
    assert_eq!(data.get("AirlineCode"), Some(&json!("AA")));
    assert_eq!(annotations.etag.as_deref(), Some("W/\"a\""));
}

#[tokio::test]
async fn model_call_action_parses_the_reply_as_an_entity() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"@odata.etag": "W/\"s\"", "UserName": "1", "FirstName": "Shared"}));

    let model = Model::from_value(people(), json!({"UserName": "1"}));
    let (data, annotations) = model
        .call_action(&transport, "Trippin.ShareTrip", json!({"tripId": 7}), &opts())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].path, "People('1')/Trippin.ShareTrip");
    assert_eq!(data.get("FirstName"), Some(&json!("Shared")));
    assert_eq!(annotations.etag.as_deref(), Some("W/\"s\""));
}

#[tokio::test]
async fn collection_call_function_gets_at_the_set_address() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"UserName": "newest"}));

    let collection = Collection::new(people());
    let (data, _) = collection
        .call_function(&transport, "Trippin.GetNewestPerson", [], &opts())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].path, "People/Trippin.GetNewestPerson()");
    assert_eq!(data.get("UserName"), Some(&json!("newest")));
}

// ============================================================================
// Related resources
// ============================================================================

#[tokio::test]
async fn related_collection_fetches_through_the_navigation_address() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"value": [{"UserName": "scottketchum"}]}));

    let model = Model::from_value(people(), json!({"UserName": "russellwhyte"}));
    let mut friends = model.related_collection("Friends").unwrap();
    friends.fetch(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].path, "People('russellwhyte')/Friends");
    assert_eq!(
        friends.models()[0].resource().path(),
        "People('russellwhyte')/Friends('scottketchum')"
    );
}

#[tokio::test]
async fn related_model_fetch_uses_its_own_key() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"UserName": "ronaldmundy", "FirstName": "Ronald"}));

    let model = Model::from_value(
        people(),
        json!({"UserName": "1", "Manager": {"UserName": "ronaldmundy"}}),
    );
    let mut manager = model.related_model("Manager").unwrap();
    manager.fetch(&transport, &opts()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].path, "People('1')/Manager('ronaldmundy')");
    assert_eq!(manager.get("FirstName"), Some(&json!("Ronald")));
}
