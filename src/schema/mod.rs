//! The type-resolution collaborator.
//!
//! This module provides [`TypeRegistry`], the explicit mapping from entity
//! type and entity-set names to [`EntityType`] descriptors. Resources narrow
//! their declared type through the registry when navigating, and the
//! annotation parser uses descriptors to run per-field value converters.
//!
//! Schema/metadata *ingestion* is out of scope: callers build the registry
//! by hand or from their own metadata tooling and inject it once.
//!
//! # Example
//!
//! ```rust
//! use odata_client::schema::{EntityType, FieldKind, TypeRegistry};
//!
//! let registry = TypeRegistry::builder()
//!     .entity_type(
//!         EntityType::builder("Person")
//!             .key("UserName")
//!             .field("UserName", FieldKind::String)
//!             .navigation("Friends", "Person", true)
//!             .build(),
//!     )
//!     .entity_set("People", "Person")
//!     .build();
//!
//! let person = registry.entity_set_type("People").unwrap();
//! assert_eq!(person.name(), "Person");
//! ```

mod types;

pub use types::{ConversionError, EntityType, EntityTypeBuilder, Field, FieldKind, Navigation};

use std::collections::HashMap;
use std::sync::Arc;

/// Registry mapping type and entity-set names to entity type descriptors.
///
/// The registry is immutable once built and shared via `Arc` by every
/// resource derived from it. There is no runtime reflection anywhere: all
/// type narrowing is an explicit lookup through this table.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<EntityType>>,
    entity_sets: HashMap<String, String>,
}

impl TypeRegistry {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Returns an empty registry wrapped for sharing.
    ///
    /// Useful for schema-less operation: resources built against an empty
    /// registry carry no declared type and skip value conversion.
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Looks up an entity type descriptor by type name.
    #[must_use]
    pub fn entity_type(&self, name: &str) -> Option<Arc<EntityType>> {
        self.types.get(name).cloned()
    }

    /// Looks up the entity type declared for an entity set.
    #[must_use]
    pub fn entity_set_type(&self, set: &str) -> Option<Arc<EntityType>> {
        self.entity_sets
            .get(set)
            .and_then(|type_name| self.entity_type(type_name))
    }

    /// Resolves the target type of a relation on the named type.
    #[must_use]
    pub fn navigation_target(&self, type_name: &str, relation: &str) -> Option<Arc<EntityType>> {
        self.entity_type(type_name)
            .and_then(|et| {
                et.navigation(relation)
                    .map(|nav| nav.target_type.clone())
            })
            .and_then(|target| self.entity_type(&target))
    }
}

/// Builder for [`TypeRegistry`] instances.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    types: HashMap<String, Arc<EntityType>>,
    entity_sets: HashMap<String, String>,
}

impl TypeRegistryBuilder {
    /// Registers an entity type descriptor.
    #[must_use]
    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.types
            .insert(entity_type.name().to_string(), Arc::new(entity_type));
        self
    }

    /// Declares an entity set and the type name of its members.
    #[must_use]
    pub fn entity_set(mut self, set: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.entity_sets.insert(set.into(), type_name.into());
        self
    }

    /// Builds the registry wrapped for sharing.
    #[must_use]
    pub fn build(self) -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry {
            types: self.types,
            entity_sets: self.entity_sets,
        })
    }
}

// Verify registry types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TypeRegistry>();
    assert_send_sync::<EntityType>();
};
