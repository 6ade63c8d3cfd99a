//! Stateful Model/Collection abstractions over fetched entities.
//!
//! - **[`Model`]**: One entity's data bound to the resource addressing it,
//!   with fetch/save/patch/destroy, navigation-scoped children, and `$ref`
//!   association management.
//! - **[`Collection`]**: An ordered list of models over an entity set (or
//!   navigation collection), with pagination derived from server
//!   annotations, a dedicated count operation, and in-place query mutation.
//!
//! Both own their resource exclusively and are reassigned only from fully
//! parsed successful responses.

mod collection;
mod model;

pub use collection::{Collection, PageState};
pub use model::{apply_patch, Model, ModelState};
