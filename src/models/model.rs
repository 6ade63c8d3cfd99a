//! The Model state machine: one entity bound to the resource addressing it.
//!
//! A [`Model`] binds a dynamic data record to the [`Resource`] that
//! addresses it and moves through three lifecycle states: *transient*
//! (constructed from local data, no resolvable key), *bound* (the resource
//! carries a key after a successful fetch or save), and *destroyed* (no
//! further operations permitted; post-destroy use fails fast, never
//! silently no-ops).
//!
//! # Example
//!
//! ```rust,ignore
//! let people = Resource::entity_set("People", registry);
//! let mut model = Model::new(people, serde_json::Map::new());
//! model.set("UserName", json!("russellwhyte"));
//! model.set("FirstName", json!("Russell"));
//!
//! model.save(&client, &RequestOptions::new()).await?;   // POST People
//! model.set("FirstName", json!("Russ"));
//! model.save(&client, &RequestOptions::new()).await?;   // PUT People('russellwhyte')
//! model.destroy(&client, &RequestOptions::new()).await?;
//! ```

use serde_json::{Map, Value};

use crate::clients::Transport;
use crate::models::collection::Collection;
use crate::resources::{
    EntityAnnotations, EntityKey, KeyValue, ODataError, RequestOptions, Resource, UsageError,
    ODATA_ID,
};

/// Lifecycle state of a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Constructed from local data; the resource carries no key.
    Transient,
    /// The resource carries a key after a successful fetch or save.
    Bound,
    /// Destroyed; every further operation fails with a usage error.
    Destroyed,
}

/// Returns a new record with the fields of `delta` applied over `current`.
///
/// This is the explicit patch operation: the current record is never
/// mutated in place, so a failed request can leave the model untouched.
/// Fields present in `delta` overwrite (or add to) `current`, including
/// explicit nulls.
#[must_use]
pub fn apply_patch(current: &Map<String, Value>, delta: &Map<String, Value>) -> Map<String, Value> {
    let mut next = current.clone();
    for (name, value) in delta {
        next.insert(name.clone(), value.clone());
    }
    next
}

/// One entity's data bound to the resource addressing it.
///
/// The model exclusively owns its resource (constructors take it by value);
/// a caller that keeps its own copy of the resource cannot affect the model
/// and vice versa. Either an operation succeeds and the model is fully
/// reassigned from the response, or it fails and the model is left exactly
/// as it was.
#[derive(Debug, Clone)]
pub struct Model {
    resource: Resource,
    data: Map<String, Value>,
    annotations: EntityAnnotations,
    state: ModelState,
}

impl Model {
    /// Creates a model from local data bound to the given resource.
    ///
    /// The model is *transient* until a fetch or save binds it.
    #[must_use]
    pub fn new(resource: Resource, data: Map<String, Value>) -> Self {
        let state = if resource.has_key() {
            ModelState::Bound
        } else {
            ModelState::Transient
        };
        Self {
            resource,
            data,
            annotations: EntityAnnotations::default(),
            state,
        }
    }

    /// Creates a model from a raw payload record, splitting annotations
    /// from data fields.
    ///
    /// Used when materializing members of a fetched collection; reserved
    /// `@`-prefixed fields become the model's annotations.
    #[must_use]
    pub fn from_value(resource: Resource, record: Value) -> Self {
        let record = match record {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let annotations = EntityAnnotations::from_record(&record);
        let data: Map<String, Value> = record
            .into_iter()
            .filter(|(name, _)| !name.starts_with('@'))
            .collect();

        let mut model = Self::new(resource, data);
        model.annotations = annotations;
        model
    }

    /// Returns the bound resource.
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Returns the current data record.
    #[must_use]
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Returns one data field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Sets one data field locally (no request is issued).
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.data.insert(name.into(), value);
    }

    /// Returns the protocol annotations of the last response.
    #[must_use]
    pub const fn annotations(&self) -> &EntityAnnotations {
        &self.annotations
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ModelState {
        self.state
    }

    /// Returns `true` once the model has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state == ModelState::Destroyed
    }

    /// Returns the entity's identity URL, preferring the server-supplied
    /// `@odata.id` annotation and falling back to the keyed resource path.
    #[must_use]
    pub fn identity_url(&self) -> Option<String> {
        if let Some(id) = &self.annotations.id {
            return Some(id.clone());
        }
        self.resolve_key()
            .and_then(|key| self.resource.entity(key).ok())
            .map(|resource| resource.path())
    }

    /// Resolves the entity key from the declared key fields of the data.
    ///
    /// A single key field yields a scalar key, several yield a composite
    /// key; any absent or empty key field means the key is absent.
    #[must_use]
    pub fn resolve_key(&self) -> Option<EntityKey> {
        self.resource
            .entity_type()
            .and_then(|entity_type| entity_type.resolve_key(&self.data))
    }

    /// Returns `true` iff no entity key resolves from the current data.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.resolve_key().is_none()
    }

    /// Rebinds the model to another resource.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::TypeMismatch`] if both the model's and the
    /// resource's declared types are known and differ.
    pub fn attach(&mut self, resource: Resource) -> Result<(), UsageError> {
        if let (Some(expected), Some(found)) = (self.resource.type_name(), resource.type_name()) {
            if expected != found {
                return Err(UsageError::TypeMismatch {
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        if resource.has_key() && self.state == ModelState::Transient {
            self.state = ModelState::Bound;
        }
        self.resource = resource;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), UsageError> {
        if self.is_destroyed() {
            return Err(UsageError::Destroyed);
        }
        Ok(())
    }

    fn keyed_resource(&self, operation: &'static str) -> Result<Resource, UsageError> {
        let key = self
            .resolve_key()
            .ok_or(UsageError::MissingKey { operation })?;
        self.resource.entity(key)
    }

    // Reassigns local state from a successful response. Empty response data
    // (a 204 reply) keeps the local record; annotations merge field-wise.
    fn assign(&mut self, data: Map<String, Value>, annotations: EntityAnnotations) {
        if !data.is_empty() {
            self.data = data;
        }
        if annotations.etag.is_some() {
            self.annotations.etag = annotations.etag;
        }
        if annotations.id.is_some() {
            self.annotations.id = annotations.id;
        }
        if annotations.type_name.is_some() {
            self.annotations.type_name = annotations.type_name;
        }
        if let Some(key) = self.resolve_key() {
            if let Ok(resource) = self.resource.entity(key) {
                self.resource = resource;
            }
            self.state = ModelState::Bound;
        }
    }

    /// Fetches the entity and reassigns data and annotations.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if the model is transient,
    /// [`ODataError::NotFound`] for a 404 reply, and the other resource
    /// classifications otherwise. On failure the model is unchanged.
    pub async fn fetch<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.ensure_active()?;
        let resource = self.keyed_resource("fetch")?;

        let (data, annotations) = resource.get_entity(client, options).await?;
        self.assign(data, annotations);
        Ok(())
    }

    // POSTs the current record at the owning collection's address.
    async fn create_entity<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        let body = Value::Object(self.data.clone());
        let (data, annotations) = self
            .resource
            .collection()
            .post_entity(client, body, options)
            .await?;
        self.assign(data, annotations);
        Ok(())
    }

    // PUTs the current record at the keyed entity address with its token.
    async fn update_entity<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        let resource = self.keyed_resource("save")?;
        let body = Value::Object(self.data.clone());
        let (data, annotations) = resource
            .put_entity(client, body, self.annotations.etag.clone(), options)
            .await?;
        self.assign(data, annotations);
        Ok(())
    }

    /// Saves the entity: a create when new, an update otherwise.
    ///
    /// A new model (no resolvable key) is POSTed against the owning set's
    /// resource; a bound model is PUT at its entity resource carrying the
    /// last-known version token. Either way the model is reassigned from
    /// the response; the server may mutate fields, including assigning
    /// the key.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::ConcurrencyConflict`] when the version token
    /// no longer matches (never silently retried), plus the usual resource
    /// classifications. On failure the model is unchanged.
    pub async fn save<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.ensure_active()?;
        if self.is_new() {
            self.create_entity(client, options).await
        } else {
            self.update_entity(client, options).await
        }
    }

    /// Applies a partial update through the explicit patch operation.
    ///
    /// The delta is PATCHed at the entity resource carrying the version
    /// token; locally, [`apply_patch`] produces the new record, which any
    /// server-returned representation then overrides.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if the model is transient and
    /// [`ODataError::ConcurrencyConflict`] on a version mismatch. On
    /// failure the model is unchanged.
    pub async fn patch<C: Transport>(
        &mut self,
        client: &C,
        delta: Map<String, Value>,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.ensure_active()?;
        let resource = self.keyed_resource("patch")?;

        let (data, annotations) = resource
            .patch_entity(
                client,
                Value::Object(delta.clone()),
                self.annotations.etag.clone(),
                options,
            )
            .await?;

        self.data = apply_patch(&self.data, &delta);
        self.assign(data, annotations);
        Ok(())
    }

    /// Deletes the entity and transitions the model to *destroyed*.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] without a resolvable key,
    /// [`UsageError::MissingVersionToken`] without a stored version token,
    /// and [`ODataError::ConcurrencyConflict`] when the token no longer
    /// matches. On failure the model stays usable.
    pub async fn destroy<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.ensure_active()?;
        let resource = self.keyed_resource("destroy")?;
        let token = self
            .annotations
            .etag
            .clone()
            .ok_or(UsageError::MissingVersionToken {
                operation: "destroy",
            })?;

        resource.delete(client, Some(token), options).await?;
        self.state = ModelState::Destroyed;
        Ok(())
    }

    /// Fetches the entity, creating it if the service reports 404.
    ///
    /// Only [`ODataError::NotFound`] triggers the create fallback; every
    /// other failure propagates unchanged. A model with no resolvable key
    /// goes straight to the create.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch) and [`save`](Self::save).
    pub async fn fetch_or_create<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.ensure_active()?;
        if self.is_new() {
            return self.create_entity(client, options).await;
        }
        match self.fetch(client, options).await {
            Err(error) if error.is_not_found() => self.create_entity(client, options).await,
            other => other,
        }
    }

    fn relation_resource(&self, name: &str) -> Result<Resource, UsageError> {
        self.ensure_active()?;
        self.keyed_resource("relation")?.navigation(name)
    }

    /// Builds a child model over a single-valued relation.
    ///
    /// The child is bound to the `entity(key)/name` resource and seeded
    /// from whatever related data is already present locally (an expanded
    /// record, or nothing); no request is issued.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if this model is transient, or
    /// [`UsageError::UnknownRelation`] if the declared type has no such
    /// relation.
    pub fn related_model(&self, name: &str) -> Result<Self, UsageError> {
        let resource = self.relation_resource(name)?;
        let seed = self.data.get(name).cloned().unwrap_or(Value::Null);
        Ok(Self::from_value(resource, seed))
    }

    /// Builds a child collection over a collection-valued relation.
    ///
    /// Seeded from locally present related records; no request is issued.
    ///
    /// # Errors
    ///
    /// See [`related_model`](Self::related_model).
    pub fn related_collection(&self, name: &str) -> Result<Collection, UsageError> {
        let resource = self.relation_resource(name)?;
        let seed = match self.data.get(name) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(Collection::from_values(resource, seed))
    }

    /// Associates a related entity by identity reference.
    ///
    /// Issues the request against the `entity(key)/name/$ref` address with
    /// a body carrying the target's identity URL. Single-valued relations
    /// bind with PUT; collection-valued relations add a member with POST.
    /// An untyped model defaults to the single-valued form.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if this model is transient, plus
    /// the usual resource classifications.
    pub async fn create_ref<C: Transport>(
        &self,
        client: &C,
        name: &str,
        target_id: &str,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        let reference = self.relation_resource(name)?.reference();
        let body = serde_json::json!({ ODATA_ID: target_id });

        let collection_valued = self
            .resource
            .navigation_descriptor(name)
            .is_some_and(|nav| nav.collection);
        if collection_valued {
            reference.post_void(client, body, options).await
        } else {
            reference
                .put_void(client, body, self.annotations.etag.clone(), options)
                .await
        }
    }

    /// Disassociates a related entity by identity reference.
    ///
    /// Single-valued relations unbind with a plain DELETE; collection-valued
    /// relations remove one member with a DELETE carrying the `$id` filter.
    ///
    /// # Errors
    ///
    /// See [`create_ref`](Self::create_ref).
    pub async fn delete_ref<C: Transport>(
        &self,
        client: &C,
        name: &str,
        target_id: &str,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        let reference = self.relation_resource(name)?.reference();
        let token = self.annotations.etag.clone();

        let collection_valued = self
            .resource
            .navigation_descriptor(name)
            .is_some_and(|nav| nav.collection);
        if collection_valued {
            let options = options.clone().param(crate::resources::ID_OPTION, target_id);
            reference.delete(client, token, &options).await
        } else {
            reference.delete(client, token, options).await
        }
    }

    /// Invokes a bound action on this entity.
    ///
    /// POSTs `body` at the keyed resource's action address and parses the
    /// reply as an entity record (a bodyless 204 reply yields an empty map).
    /// Actions with collection or scalar results go through
    /// [`action_resource`](Self::action_resource) and the matching resource
    /// verb instead.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if the model is transient, plus
    /// the usual resource classifications.
    pub async fn call_action<C: Transport>(
        &self,
        client: &C,
        name: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
        let resource = self.action_resource(name, None)?;
        resource.post_entity(client, body, options).await
    }

    /// Invokes a bound function on this entity.
    ///
    /// GETs the keyed resource's function address with its parameters
    /// rendered inline, parsing the reply as an entity record. Functions
    /// with collection or scalar results go through
    /// [`function_resource`](Self::function_resource) instead.
    ///
    /// # Errors
    ///
    /// See [`call_action`](Self::call_action).
    pub async fn call_function<C: Transport>(
        &self,
        client: &C,
        name: &str,
        params: impl IntoIterator<Item = (String, KeyValue)>,
        options: &RequestOptions,
    ) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
        let resource = self.function_resource(name, params, None)?;
        resource.get_entity(client, options).await
    }

    /// Derives the resource of a bound action on this entity.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if the model is transient.
    pub fn action_resource(
        &self,
        name: &str,
        return_type: Option<&str>,
    ) -> Result<Resource, UsageError> {
        self.ensure_active()?;
        Ok(self.keyed_resource("action")?.action(name, return_type))
    }

    /// Derives the resource of a bound function on this entity.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::MissingKey`] if the model is transient.
    pub fn function_resource(
        &self,
        name: &str,
        params: impl IntoIterator<Item = (String, KeyValue)>,
        return_type: Option<&str>,
    ) -> Result<Resource, UsageError> {
        self.ensure_active()?;
        Ok(self
            .keyed_resource("function")?
            .function(name, params, return_type))
    }
}
