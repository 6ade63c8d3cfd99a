//! The Collection state machine: an ordered list of models over one set.
//!
//! A [`Collection`] binds an ordered sequence of [`Model`]s to the
//! [`Resource`] addressing their entity set (or navigation collection) and
//! tracks pagination state derived from server annotations. Page-relative
//! navigation clamps into `[1, total_pages]` when the total is known and
//! degrades to a plain re-fetch when the server never supplied a count.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut people = Collection::new(Resource::entity_set("People", registry));
//! people.options_mut().set_top(2);
//!
//! people.fetch(&client, &RequestOptions::new()).await?;
//! assert_eq!(people.page_state().total_pages, Some(3));
//!
//! people.get_next_page(&client, &RequestOptions::new()).await?;  // $top=2&$skip=2
//! ```

use serde_json::{Map, Value};

use crate::clients::Transport;
use crate::models::model::Model;
use crate::resources::{
    CollectionAnnotations, EntityAnnotations, Filter, KeyValue, ODataError, QueryOptions,
    RequestOptions, Resource, SortDirection, UsageError,
};

/// Pagination state of a [`Collection`].
///
/// `total_records` and `total_pages` stay unset until the server supplies a
/// count annotation; `total_pages = ceil(total_records / page_size)` holds
/// whenever both inputs are known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PageState {
    /// The current 1-based page, set by the first fetch.
    pub page: Option<u64>,
    /// The page size, set explicitly or inferred from the continuation cursor.
    pub page_size: Option<u64>,
    /// The server-reported total record count.
    pub total_records: Option<u64>,
    /// The derived total page count.
    pub total_pages: Option<u64>,
}

/// An ordered list of models bound to the resource addressing their set.
///
/// The collection exclusively owns its resource and its models. Query
/// mutators operate on the collection's own resource options, not a copy,
/// so subsequent fetches pick the changes up.
#[derive(Debug, Clone)]
pub struct Collection {
    resource: Resource,
    models: Vec<Model>,
    page_state: PageState,
}

impl Collection {
    /// Creates an empty collection bound to the given resource.
    #[must_use]
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            models: Vec::new(),
            page_state: PageState::default(),
        }
    }

    /// Creates a collection seeded from raw payload records.
    ///
    /// Each record becomes a model bound to the `set(key)` entity resource
    /// when its key resolves; no request is issued.
    #[must_use]
    pub fn from_values(resource: Resource, items: Vec<Value>) -> Self {
        let models = Self::materialize(&resource, items);
        Self {
            resource,
            models,
            page_state: PageState::default(),
        }
    }

    fn materialize(resource: &Resource, items: Vec<Value>) -> Vec<Model> {
        items
            .into_iter()
            .map(|item| {
                let mut model = Model::from_value(resource.clone(), item);
                if let Some(key) = model.resolve_key() {
                    if let Ok(entity_resource) = resource.entity(key) {
                        // Same declared type by construction.
                        let _ = model.attach(entity_resource);
                    }
                }
                model
            })
            .collect()
    }

    /// Returns the bound resource.
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Returns the current models, in server order.
    #[must_use]
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Returns the number of currently held models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no models are currently held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Returns a finite, restartable iterator over the current models.
    ///
    /// The iterator views the models as they are now; a later `fetch`
    /// replaces the backing sequence without invalidating anything handed
    /// out earlier.
    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    /// Returns the pagination state.
    #[must_use]
    pub const fn page_state(&self) -> &PageState {
        &self.page_state
    }

    /// Rebinds the collection to another resource.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::TypeMismatch`] if both declared types are
    /// known and differ.
    pub fn attach(&mut self, resource: Resource) -> Result<(), UsageError> {
        if let (Some(expected), Some(found)) = (self.resource.type_name(), resource.type_name()) {
            if expected != found {
                return Err(UsageError::TypeMismatch {
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        self.resource = resource;
        Ok(())
    }

    fn recompute_total_pages(&mut self) {
        self.page_state.total_pages = match (self.page_state.total_records, self.page_state.page_size)
        {
            (Some(records), Some(size)) if size > 0 => Some((records + size - 1) / size),
            _ => None,
        };
    }

    fn apply_annotations(&mut self, annotations: &CollectionAnnotations) {
        if let Some(count) = annotations.count {
            self.page_state.total_records = Some(count);
        }
        // A continuation $skip on the first page reveals the server's page size.
        if self.page_state.page_size.is_none() {
            self.page_state.page_size = annotations.next_skip;
        }
        self.recompute_total_pages();
    }

    // Fetches one page; local state is reassigned only after the response
    // parsed, so a failed call leaves everything as it was.
    async fn fetch_at<C: Transport>(
        &mut self,
        client: &C,
        page: u64,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        let mut resource = self.resource.clone();
        if let Some(size) = self.page_state.page_size {
            resource.options_mut().set_top(size);
            resource.options_mut().set_skip(size * (page - 1));
        }

        let options = options.clone().with_count(true);
        let (items, annotations) = resource.get_entities(client, &options).await?;

        self.page_state.page = Some(page);
        self.models = Self::materialize(&self.resource, items);
        self.apply_annotations(&annotations);
        Ok(())
    }

    /// Fetches the current page, replacing models and pagination state.
    ///
    /// Applies `top`/`skip` derived from the page state to a cloned
    /// resource and requests the inline count; the returned annotations
    /// recompute the page state.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::MalformedResponse`] if the payload has no
    /// `value` array, plus the usual transport classifications. On failure
    /// the collection is unchanged.
    pub async fn fetch<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        let page = self.page_state.page.unwrap_or(1);
        self.fetch_at(client, page, options).await
    }

    /// Fetches the given 1-based page.
    ///
    /// Out-of-range pages clamp into `[1, total_pages]` when the total is
    /// known; when it is unknown the requested page is fetched as-is (a
    /// plain re-fetch at that cursor).
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn get_page<C: Transport>(
        &mut self,
        client: &C,
        page: u64,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        let page = page.max(1);
        let target = match self.page_state.total_pages {
            Some(pages) => page.min(pages).max(1),
            None => page,
        };
        self.fetch_at(client, target, options).await
    }

    /// Fetches the first page.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn get_first_page<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        self.get_page(client, 1, options).await
    }

    /// Fetches the page after the current one.
    ///
    /// Degrades to a plain re-fetch when no page has been fetched yet.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn get_next_page<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        match self.page_state.page {
            Some(page) => self.get_page(client, page + 1, options).await,
            None => self.fetch(client, options).await,
        }
    }

    /// Fetches the page before the current one.
    ///
    /// Degrades to a plain re-fetch when no page has been fetched yet.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn get_previous_page<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        match self.page_state.page {
            Some(page) => self.get_page(client, page.saturating_sub(1), options).await,
            None => self.fetch(client, options).await,
        }
    }

    /// Fetches the last page.
    ///
    /// Degrades to a plain re-fetch when the server never supplied a count.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn get_last_page<C: Transport>(
        &mut self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<(), ODataError> {
        match self.page_state.total_pages {
            Some(pages) => self.get_page(client, pages, options).await,
            None => self.fetch(client, options).await,
        }
    }

    /// Updates the page size without fetching.
    ///
    /// Recomputes `total_pages` when the total record count is known and
    /// clamps the current page back into range.
    pub fn set_page_size(&mut self, size: u64) {
        self.page_state.page_size = Some(size);
        self.recompute_total_pages();
        if let (Some(page), Some(pages)) = (self.page_state.page, self.page_state.total_pages) {
            self.page_state.page = Some(page.min(pages).max(1));
        }
    }

    /// Requests the set's total count through a dedicated `$count` address.
    ///
    /// Ignores the current page and size.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::MalformedResponse`] if the count body is not
    /// a number, plus the usual transport classifications.
    pub async fn count<C: Transport>(
        &self,
        client: &C,
        options: &RequestOptions,
    ) -> Result<u64, ODataError> {
        let mut counter = self.resource.count();
        counter.options_mut().clear_top();
        counter.options_mut().clear_skip();
        counter.options_mut().clear_skip_token();
        counter.get_count(client, options).await
    }

    /// Returns the bound resource's query options.
    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        self.resource.options()
    }

    /// Returns the bound resource's query options for in-place mutation.
    ///
    /// Mutations land on the collection's own resource, so subsequent
    /// fetches pick them up.
    pub fn options_mut(&mut self) -> &mut QueryOptions {
        self.resource.options_mut()
    }

    /// Sets the `$select` field list on the bound resource.
    pub fn set_select<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options_mut().set_select(fields);
    }

    /// Sets the `$filter` expression on the bound resource.
    pub fn set_filter(&mut self, filter: Filter) {
        self.options_mut().set_filter(filter);
    }

    /// Sets the `$search` text on the bound resource.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.options_mut().set_search(search);
    }

    /// Sets the `$orderby` terms on the bound resource.
    pub fn set_order_by<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = (S, SortDirection)>,
        S: Into<String>,
    {
        self.options_mut().set_order_by(terms);
    }

    /// Sets the `$apply` transformation on the bound resource.
    pub fn set_transform(&mut self, transform: impl Into<String>) {
        self.options_mut().set_transform(transform);
    }

    /// Returns the scoped options of an expand target on the bound resource.
    pub fn expand_mut(&mut self, relation: impl Into<String>) -> &mut QueryOptions {
        self.options_mut().expand_mut(relation)
    }

    /// Invokes an action bound to this set.
    ///
    /// POSTs `body` at the set resource's action address and parses the
    /// reply as an entity record (a bodyless 204 reply yields an empty map).
    /// Actions with collection or scalar results go through
    /// [`action_resource`](Self::action_resource) and the matching resource
    /// verb instead.
    ///
    /// # Errors
    ///
    /// The usual resource classifications.
    pub async fn call_action<C: Transport>(
        &self,
        client: &C,
        name: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<(Map<String, Value>, EntityAnnotations), ODataError> {
        self.resource
            .action(name, None)
            .post_entity(client, body, options)
            .await
    }

    /// Invokes a function bound to this set.
    ///
    /// GETs the set resource's function address with its parameters rendered
    /// inline, parsing the reply as an entity record.
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
        self.resource
            .function(name, params, None)
            .get_entity(client, options)
            .await
    }

    /// Derives the resource of an action bound to this set.
    #[must_use]
    pub fn action_resource(&self, name: &str, return_type: Option<&str>) -> Resource {
        self.resource.action(name, return_type)
    }

    /// Derives the resource of a function bound to this set.
    #[must_use]
    pub fn function_resource(
        &self,
        name: &str,
        params: impl IntoIterator<Item = (String, KeyValue)>,
        return_type: Option<&str>,
    ) -> Resource {
        self.resource.function(name, params, return_type)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
