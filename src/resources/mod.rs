//! The resource algebra: paths, query options, annotations, and verbs.
//!
//! This module is the protocol core of the crate:
//!
//! - **[`PathSegments`] / [`Segment`] / [`EntityKey`]**: An ordered, typed
//!   sequence describing a resource address. Entity keys are segment slots,
//!   never query options.
//! - **[`QueryOptions`] / [`Filter`]**: The recognized query modifiers,
//!   including a recursive expand tree and a filter expression tree.
//! - **[`Resource`]**: The immutable composition root. Navigation methods
//!   derive new, independent child resources; verb methods delegate to the
//!   transport and route payloads through the annotation parser.
//! - **Annotation parsing**: [`parse_entity`], [`parse_entities`], and
//!   [`parse_property`] split payloads into `(value, annotations)`.
//! - **[`ODataError`] / [`UsageError`]**: The semantic failure taxonomy.
//!
//! # Example
//!
//! ```rust
//! use odata_client::resources::{Filter, Resource};
//! use odata_client::schema::TypeRegistry;
//!
//! let mut people = Resource::entity_set("People", TypeRegistry::empty());
//! people.options_mut().set_filter(Filter::eq("City", "Boise"));
//! people.options_mut().set_top(10);
//!
//! assert_eq!(people.to_url_string(), "People?$filter=City eq 'Boise'&$top=10");
//! ```

mod annotations;
mod errors;
mod options;
mod resource;
mod segments;

pub use annotations::{
    parse_entities, parse_entity, parse_next_link, parse_property, CollectionAnnotations,
    EntityAnnotations, PropertyAnnotations, ODATA_CONTEXT, ODATA_COUNT, ODATA_ETAG, ODATA_ID,
    ODATA_NEXT_LINK, ODATA_TYPE, VALUE_FIELD,
};
pub use errors::{ODataError, UsageError};
pub use options::{
    CompareOp, Filter, FilterValue, QueryOptions, SortDirection, COUNT_OPTION, ID_OPTION,
    SKIP_OPTION, SKIP_TOKEN_OPTION,
};
pub use resource::{RequestOptions, Resource};
pub use segments::{
    EntityKey, KeyValue, PathSegments, Segment, SegmentKind, COUNT_SEGMENT, METADATA_SEGMENT,
    REF_SEGMENT, VALUE_SEGMENT,
};
