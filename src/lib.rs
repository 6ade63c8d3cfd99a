//! # OData Client
//!
//! A Rust client toolkit for consuming OData v4 REST services: it builds
//! syntactically correct request paths and query strings, executes them
//! through an injected transport, parses annotated JSON payloads back into
//! dynamic typed entities, and exposes a stateful Model/Collection
//! abstraction over those entities.
//!
//! ## Overview
//!
//! This crate provides:
//! - Immutable, clonable resource composition via [`Resource`]: every
//!   navigation step derives a new, independent resource
//! - A typed query-option model ([`QueryOptions`], [`Filter`]) with a
//!   recursive expand tree
//! - Annotation-aware response mapping: protocol metadata (`@odata.*`) is
//!   split from data fields, never mixed into them
//! - Pagination driven entirely by server-supplied continuation cursors
//! - Optimistic concurrency via version tokens mapped to `If-Match`
//! - A [`Model`]/[`Collection`] state machine with fetch/save/destroy,
//!   navigation-scoped children, and `$ref` association management
//! - An injected [`Transport`](clients::Transport) collaborator, shipped as
//!   a reqwest-based [`HttpClient`](clients::HttpClient)
//!
//! ## Quick Start
//!
//! ```rust
//! use odata_client::schema::{EntityType, FieldKind, TypeRegistry};
//! use odata_client::{Filter, Resource};
//!
//! // Describe the service types once and share the registry.
//! let registry = TypeRegistry::builder()
//!     .entity_type(
//!         EntityType::builder("Person")
//!             .key("UserName")
//!             .field("UserName", FieldKind::String)
//!             .field("Age", FieldKind::Int)
//!             .navigation("Friends", "Person", true)
//!             .build(),
//!     )
//!     .entity_set("People", "Person")
//!     .build();
//!
//! // Compose addresses; every step derives an independent resource.
//! let mut people = Resource::entity_set("People", registry);
//! people.options_mut().set_filter(Filter::gt("Age", 21));
//! people.options_mut().set_top(10);
//!
//! let friends = people.entity("russellwhyte").unwrap().navigation("Friends").unwrap();
//! assert_eq!(friends.path(), "People('russellwhyte')/Friends");
//! ```
//!
//! ## Issuing Requests
//!
//! ```rust,ignore
//! use odata_client::clients::HttpClient;
//! use odata_client::{Collection, RequestOptions, ServiceConfig, ServiceRootUrl};
//!
//! let config = ServiceConfig::builder()
//!     .service_root(ServiceRootUrl::new("https://services.odata.org/V4/TripPinService")?)
//!     .build()?;
//! let client = HttpClient::new(config);
//!
//! // Page through an entity set.
//! let mut people = Collection::new(Resource::entity_set("People", registry));
//! people.fetch(&client, &RequestOptions::new()).await?;
//! while people.page_state().page < people.page_state().total_pages {
//!     people.get_next_page(&client, &RequestOptions::new()).await?;
//! }
//!
//! // Mutate one entity with optimistic concurrency.
//! let mut person = people.models()[0].clone();
//! person.set("FirstName", serde_json::json!("Russ"));
//! person.save(&client, &RequestOptions::new()).await?;   // PUT + If-Match
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: The type registry and transport are injected
//!   explicitly; nothing is discovered via reflection
//! - **Clone on derive**: Navigation never aliases path or option state
//!   between resources
//! - **Fail fast**: API misuse ([`UsageError`]) is raised synchronously,
//!   before any I/O
//! - **All-or-nothing state**: A Model/Collection is reassigned only from a
//!   fully parsed successful response
//! - **Async-first**: Designed for use with the Tokio runtime; dropping a
//!   pending call aborts only that request

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod resources;
pub mod schema;

// Re-export public types at crate root for convenience
pub use config::{Credentials, ServiceConfig, ServiceConfigBuilder, ServiceRootUrl};
pub use error::ConfigError;
pub use models::{apply_patch, Collection, Model, ModelState, PageState};
pub use resources::{
    CollectionAnnotations, EntityAnnotations, EntityKey, Filter, KeyValue, ODataError,
    PathSegments, PropertyAnnotations, QueryOptions, RequestOptions, Resource, SegmentKind,
    SortDirection, UsageError,
};
pub use schema::{EntityType, FieldKind, TypeRegistry};
