//! Resource composition and verb dispatch.
//!
//! A [`Resource`] composes a [`PathSegments`] path with a [`QueryOptions`]
//! set and a declared entity type. Navigation methods derive new, fully
//! independent child resources (deep-copying path and options at call
//! time); verb methods delegate to the [`Transport`] collaborator and route
//! the raw payload through the annotation parser, returning
//! `(value, annotations)`, never the raw response.
//!
//! # Example
//!
//! ```rust
//! use odata_client::resources::Resource;
//! use odata_client::schema::TypeRegistry;
//!
//! let people = Resource::entity_set("People", TypeRegistry::empty());
//! let friends = people.entity("russellwhyte").unwrap().navigation("Friends").unwrap();
//!
//! assert_eq!(people.path(), "People");
//! assert_eq!(friends.path(), "People('russellwhyte')/Friends");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::clients::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::resources::annotations::{
    parse_entities, parse_entity, parse_property, CollectionAnnotations, EntityAnnotations,
    PropertyAnnotations,
};
use crate::resources::errors::{ODataError, UsageError};
use crate::resources::options::{QueryOptions, COUNT_OPTION};
use crate::resources::segments::{
    EntityKey, KeyValue, PathSegments, Segment, SegmentKind, COUNT_SEGMENT, METADATA_SEGMENT,
    REF_SEGMENT, VALUE_SEGMENT,
};
use crate::schema::{EntityType, Navigation, TypeRegistry};

/// Per-request transport options.
///
/// Extra headers and query params are passed to the transport alongside the
/// resource's own rendered address; `with_count` asks the server for an
/// inline total count on collection fetches.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers for this request.
    pub headers: HashMap<String, String>,
    /// Extra query pairs for this request.
    pub params: Vec<(String, String)>,
    /// Request the inline `$count=true` total on a collection fetch.
    pub with_count: bool,
}

impl RequestOptions {
    /// Creates empty request options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a query pair.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Sets the inline-count flag.
    #[must_use]
    pub const fn with_count(mut self, with_count: bool) -> Self {
        self.with_count = with_count;
        self
    }
}

/// An immutable composition of path, query options, and declared type.
///
/// Construction always takes an explicit path and option set; nothing is
/// silently shared between instances. Every navigation operation clones
/// both, appends its segment, narrows the declared type through the
/// injected [`TypeRegistry`], and returns a new `Resource`; mutating
/// either resource afterwards never affects the other.
#[derive(Debug, Clone)]
pub struct Resource {
    segments: PathSegments,
    options: QueryOptions,
    registry: Arc<TypeRegistry>,
    type_name: Option<String>,
}

impl Resource {
    /// Creates a resource from an explicit path, options, and type.
    #[must_use]
    pub const fn new(
        segments: PathSegments,
        options: QueryOptions,
        registry: Arc<TypeRegistry>,
        type_name: Option<String>,
    ) -> Self {
        Self {
            segments,
            options,
            registry,
            type_name,
        }
    }

    /// Creates a resource addressing an entity set.
    ///
    /// The member type is resolved through the registry; an unregistered
    /// set yields an untyped resource (no converters, no relation checks).
    #[must_use]
    pub fn entity_set(name: impl Into<String>, registry: Arc<TypeRegistry>) -> Self {
        let name = name.into();
        let type_name = registry
            .entity_set_type(&name)
            .map(|et| et.name().to_string());

        let mut segments = PathSegments::new();
        segments.push(SegmentKind::EntitySet, name);

        Self::new(segments, QueryOptions::new(), registry, type_name)
    }

    /// Creates a resource addressing the `$metadata` service document.
    #[must_use]
    pub fn metadata(registry: Arc<TypeRegistry>) -> Self {
        let mut segments = PathSegments::new();
        segments.push(SegmentKind::Metadata, METADATA_SEGMENT);
        Self::new(segments, QueryOptions::new(), registry, None)
    }

    /// Returns the rendered path.
    #[must_use]
    pub fn path(&self) -> String {
        self.segments.path()
    }

    /// Returns the path segments.
    #[must_use]
    pub const fn segments(&self) -> &PathSegments {
        &self.segments
    }

    /// Returns the query options.
    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Returns the query options for in-place mutation.
    pub fn options_mut(&mut self) -> &mut QueryOptions {
        &mut self.options
    }

    /// Returns the declared entity type name, if known.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Returns the declared entity type descriptor, if registered.
    #[must_use]
    pub fn entity_type(&self) -> Option<Arc<EntityType>> {
        self.type_name
            .as_deref()
            .and_then(|name| self.registry.entity_type(name))
    }

    /// Looks up a relation descriptor on the declared type.
    #[must_use]
    pub fn navigation_descriptor(&self, name: &str) -> Option<Navigation> {
        self.entity_type()
            .and_then(|et| et.navigation(name).cloned())
    }

    /// Returns the entity key of the addressed segment, if set.
    #[must_use]
    pub fn key(&self) -> Option<&EntityKey> {
        self.segments.key()
    }

    /// Returns `true` if the addressed segment carries an entity key.
    #[must_use]
    pub fn has_key(&self) -> bool {
        self.segments.has_key()
    }

    /// Renders the full address: path plus query string.
    ///
    /// Values are not percent-encoded here; encoding happens at the
    /// transport boundary.
    #[must_use]
    pub fn to_url_string(&self) -> String {
        let path = self.path();
        let query = self
            .options
            .to_query_pairs()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        }
    }

    /// Derives a resource addressing one member of this set.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::KeylessSegment`] if the addressed segment
    /// cannot carry an entity key (e.g. a `$count` or property address).
    pub fn entity(&self, key: impl Into<EntityKey>) -> Result<Self, UsageError> {
        let mut derived = self.clone();
        derived.segments.set_key(key.into())?;
        Ok(derived)
    }

    /// Derives the collection address owning the addressed entity.
    ///
    /// Drops the entity key from the addressed segment; creating a new
    /// member POSTs here rather than at a keyed address.
    #[must_use]
    pub fn collection(&self) -> Self {
        let mut derived = self.clone();
        derived.segments.clear_key();
        derived
    }

    /// Derives a resource addressing a relation of the addressed entity.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if no entity key is set, or
    /// [`UsageError::UnknownRelation`] if the declared type has no such
    /// relation.
    pub fn navigation(&self, name: impl Into<String>) -> Result<Self, UsageError> {
        let name = name.into();
        if !self.has_key() {
            return Err(UsageError::MissingKey {
                operation: "navigation",
            });
        }

        let type_name = self.narrow_relation(&name)?;

        let mut derived = self.clone();
        derived.segments.push(SegmentKind::NavigationProperty, name);
        derived.type_name = type_name;
        Ok(derived)
    }

    /// Derives a resource addressing a structural property of the entity.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if no entity key is set.
    pub fn property(&self, name: impl Into<String>) -> Result<Self, UsageError> {
        if !self.has_key() {
            return Err(UsageError::MissingKey {
                operation: "property",
            });
        }

        let mut derived = self.clone();
        derived.segments.push(SegmentKind::Property, name);
        derived.type_name = None;
        Ok(derived)
    }

    /// Derives a resource addressing a bound action call.
    ///
    /// Query options do not carry into the call address; `return_type`
    /// declares the action's result type, when known.
    #[must_use]
    pub fn action(&self, name: impl Into<String>, return_type: Option<&str>) -> Self {
        let mut derived = self.clone();
        derived.segments.push(SegmentKind::Action, name);
        derived.options = QueryOptions::new();
        derived.type_name = return_type.map(ToString::to_string);
        derived
    }

    /// Derives a resource addressing a bound function call.
    ///
    /// Parameters render inline in the call segment:
    /// `GetNearestAirport(lat=33,lon=-118)`.
    #[must_use]
    pub fn function(
        &self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = (String, KeyValue)>,
        return_type: Option<&str>,
    ) -> Self {
        let mut segment = Segment::new(SegmentKind::Function, name);
        segment.params = params.into_iter().collect();

        let mut derived = self.clone();
        derived.segments.push_segment(segment);
        derived.options = QueryOptions::new();
        derived.type_name = return_type.map(ToString::to_string);
        derived
    }

    /// Derives the `$ref` reference address of this resource.
    #[must_use]
    pub fn reference(&self) -> Self {
        self.constant_segment(SegmentKind::Ref, REF_SEGMENT)
    }

    /// Derives the `$count` address of this resource.
    #[must_use]
    pub fn count(&self) -> Self {
        self.constant_segment(SegmentKind::Count, COUNT_SEGMENT)
    }

    /// Derives the `$value` raw-value address of this resource.
    #[must_use]
    pub fn value(&self) -> Self {
        self.constant_segment(SegmentKind::Value, VALUE_SEGMENT)
    }

    fn constant_segment(&self, kind: SegmentKind, name: &str) -> Self {
        let mut derived = self.clone();
        derived.segments.push(kind, name);
        derived
    }

    // Resolves a relation's target type. Untyped resources navigate
    // unchecked; typed resources reject unknown relations.
    fn narrow_relation(&self, name: &str) -> Result<Option<String>, UsageError> {
        let Some(type_name) = self.type_name.as_deref() else {
            return Ok(None);
        };
        match self.entity_type() {
            Some(entity_type) => entity_type.navigation(name).map_or_else(
                || {
                    Err(UsageError::UnknownRelation {
                        name: name.to_string(),
                        type_name: type_name.to_string(),
                    })
                },
                |nav| Ok(Some(nav.target_type.clone())),
            ),
            // Declared but unregistered type: carry the name, skip the check.
            None => Ok(None),
        }
    }

    // An entity-scoped verb on a bare entity-set address is a misuse; it
    // is rejected before any request is issued. Keyless navigation
    // addresses stay valid (single-valued relations have no key).
    fn ensure_entity_scoped(&self, operation: &'static str) -> Result<(), UsageError> {
        match self.segments.last() {
            Some(segment) if segment.kind == SegmentKind::EntitySet && segment.key.is_none() => {
                Err(UsageError::MissingKey { operation })
            }
            _ => Ok(()),
        }
    }

    /// Issues a request for this address and classifies the outcome.
    pub(crate) async fn execute<C: Transport>(
        &self,
        client: &C,
        method: HttpMethod,
        body: Option<Value>,
        version_token: Option<String>,
        options: &RequestOptions,
    ) -> Result<HttpResponse, ODataError> {
        let mut query = self.options.to_query_pairs();
        if options.with_count {
            query.push((COUNT_OPTION.to_string(), "true".to_string()));
        }
        query.extend(options.params.iter().cloned());

        let mut builder = HttpRequest::builder(method, self.path())
            .query(query)
            .headers(options.headers.clone())
            .version_token_opt(version_token);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let request = builder
            .build()
            .map_err(|e| ODataError::Transport(e.into()))?;

        tracing::debug!(method = %method, path = %self.path(), "dispatching resource request");

        client
            .send(request)
            .await
            .map_err(|e| ODataError::from_http(e, &self.path()))
    }

    // A 204 reply has no payload; the version token may still arrive as a
    // header. Callers keep their local data in that case.
    fn entity_from_response(
        &self,
        response: HttpResponse,
    ) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
        if response.body.is_null() {
            let annotations = EntityAnnotations {
                etag: response.etag().map(ToString::to_string),
                ..EntityAnnotations::default()
            };
            return Ok((Map::new(), annotations));
        }
        parse_entity(response.body, self.entity_type().as_deref())
    }

    /// Fetches the addressed single entity.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::NotFound`] for a 404 reply,
    /// [`ODataError::MalformedResponse`] if the payload is not an entity
    /// object, and [`ODataError::Transport`] for other failures.
    pub async fn get_entity<C: Transport>(
        &self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
        self.ensure_entity_scoped("get_entity")?;
        let response = self
            .execute(client, HttpMethod::Get, None, None, options)
            .await?;
        parse_entity(response.body, self.entity_type().as_deref())
    }

    /// Fetches the addressed entity collection.
    ///
    /// With `options.with_count` set, the rendered query string includes the
    /// inline-count option and the returned annotations carry the total.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::MalformedResponse`] if the payload has no
    /// `value` array, plus the transport classifications of
    /// [`get_entity`](Self::get_entity).
    pub async fn get_entities<C: Transport>(
        &self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(Vec<Value>, CollectionAnnotations), ODataError> {
        let response = self
            .execute(client, HttpMethod::Get, None, None, options)
            .await?;
        parse_entities(response.body)
    }

    /// Fetches the addressed property value.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::MalformedResponse`] if the payload has no
    /// `value` field, plus the transport classifications of
    /// [`get_entity`](Self::get_entity).
    pub async fn get_property<C: Transport>(
        &self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(Value, PropertyAnnotations), ODataError> {
        let response = self
            .execute(client, HttpMethod::Get, None, None, options)
            .await?;
        parse_property(response.body)
    }

    /// Fetches the addressed `$count` value as a plain integer.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::MalformedResponse`] if the body is not a bare
    /// number.
    pub async fn get_count<C: Transport>(
        &self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<u64, ODataError> {
        let response = self
            .execute(client, HttpMethod::Get, None, None, options)
            .await?;
        let count = match &response.body {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        count.ok_or_else(|| ODataError::MalformedResponse {
            reason: format!("count response is not a number: {}", response.body),
        })
    }

    /// Creates an entity (or invokes an action returning one).
    ///
    /// # Errors
    ///
    /// See [`get_entity`](Self::get_entity); a bodyless 204 reply yields an
    /// empty data map with header-derived annotations.
    pub async fn post_entity<C: Transport>(
        &self,
        client: &C,
        body: Value,
        options: &RequestOptions,
    ) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
        let response = self
            .execute(client, HttpMethod::Post, Some(body), None, options)
            .await?;
        self.entity_from_response(response)
    }

    /// Invokes an action returning an entity collection.
    ///
    /// # Errors
    ///
    /// See [`get_entities`](Self::get_entities).
    pub async fn post_entities<C: Transport>(
        &self,
        client: &C,
        body: Value,
        options: &RequestOptions,
    ) -> Result<(Vec<Value>, CollectionAnnotations), ODataError> {
        let response = self
            .execute(client, HttpMethod::Post, Some(body), None, options)
            .await?;
        parse_entities(response.body)
    }

    /// Invokes an action returning a property value.
    ///
    /// # Errors
    ///
    /// See [`get_property`](Self::get_property).
    pub async fn post_property<C: Transport>(
        &self,
        client: &C,
        body: Value,
        options: &RequestOptions,
    ) -> Result<(Value, PropertyAnnotations), ODataError> {
        let response = self
            .execute(client, HttpMethod::Post, Some(body), None, options)
            .await?;
        parse_property(response.body)
    }

    /// Issues a POST whose reply carries no entity (e.g. `$ref` creation).
    ///
    /// # Errors
    ///
    /// Transport classifications of [`get_entity`](Self::get_entity).
    pub async fn post_void<C: Transport>(
        &self,
        client: &C,
        body: Value,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.execute(client, HttpMethod::Post, Some(body), None, options)
            .await?;
        Ok(())
    }

    /// Replaces the addressed entity, guarded by its version token.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::ConcurrencyConflict`] for a 412 reply, plus
    /// the classifications of [`get_entity`](Self::get_entity).
    pub async fn put_entity<C: Transport>(
        &self,
        client: &C,
        body: Value,
        version_token: Option<String>,
        options: &RequestOptions,
    ) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
        self.ensure_entity_scoped("put_entity")?;
        let response = self
            .execute(client, HttpMethod::Put, Some(body), version_token, options)
            .await?;
        self.entity_from_response(response)
    }

    /// Issues a PUT whose reply carries no entity (e.g. `$ref` binding).
    ///
    /// # Errors
    ///
    /// See [`put_entity`](Self::put_entity).
    pub async fn put_void<C: Transport>(
        &self,
        client: &C,
        body: Value,
        version_token: Option<String>,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.execute(client, HttpMethod::Put, Some(body), version_token, options)
            .await?;
        Ok(())
    }

    /// Applies a partial update, guarded by the entity's version token.
    ///
    /// # Errors
    ///
    /// See [`put_entity`](Self::put_entity).
    pub async fn patch_entity<C: Transport>(
        &self,
        client: &C,
        body: Value,
        version_token: Option<String>,
        options: &RequestOptions,
    ) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
        self.ensure_entity_scoped("patch_entity")?;
        let response = self
            .execute(client, HttpMethod::Patch, Some(body), version_token, options)
            .await?;
        self.entity_from_response(response)
    }

    /// Deletes the addressed resource, guarded by its version token.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::ConcurrencyConflict`] for a 412 reply,
    /// [`ODataError::NotFound`] for 404, and [`ODataError::Transport`]
    /// otherwise.
    pub async fn delete<C: Transport>(
        &self,
        client: &C,
        version_token: Option<String>,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.ensure_entity_scoped("delete")?;
        self.execute(client, HttpMethod::Delete, None, version_token, options)
            .await?;
        Ok(())
    }

    /// Fetches every page of the addressed collection.
    ///
    /// Repeatedly fetches, injecting the `$skip`/`$skiptoken` cursor from
    /// each page's annotations into a cloned resource, while the response
    /// carries a continuation annotation. The concatenated result preserves
    /// server order. The traversal is driven entirely by server-supplied
    /// cursors (no page count is assumed in advance), and each page is
    /// requested only after the previous one resolved.
    ///
    /// # Errors
    ///
    /// See [`get_entities`](Self::get_entities); the first failing page
    /// aborts the traversal.
    pub async fn fetch_all<C: Transport>(
        &self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, ODataError> {
        let mut resource = self.clone();
        let mut all = Vec::new();

        loop {
            let (items, annotations) = resource.get_entities(client, options).await?;
            all.extend(items);

            if let Some(token) = annotations.next_skip_token {
                resource.options.clear_skip();
                resource.options.set_skip_token(token);
            } else if let Some(skip) = annotations.next_skip {
                resource.options.clear_skip_token();
                resource.options.set_skip(skip);
            } else {
                break;
            }
        }

        Ok(all)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url_string())
    }
}

// Verify Resource is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Resource>();
    assert_send_sync::<RequestOptions>();
};
