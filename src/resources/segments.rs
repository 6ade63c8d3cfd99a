//! Path segments and entity keys.
//!
//! A resource address is an ordered sequence of typed [`Segment`]s:
//! entity sets, navigation properties, structural properties, action and
//! function calls, and the protocol's constant segments (`$ref`, `$count`,
//! `$value`, `$metadata`). An [`EntityKey`] is carried by the segment it
//! identifies a member of, never by the query-option set.
//!
//! # Example
//!
//! ```rust
//! use odata_client::resources::{EntityKey, KeyValue, PathSegments, SegmentKind};
//!
//! let mut segments = PathSegments::new();
//! segments.push(SegmentKind::EntitySet, "People");
//! segments.set_key(EntityKey::single(KeyValue::from("russellwhyte"))).unwrap();
//! segments.push(SegmentKind::NavigationProperty, "Friends");
//!
//! assert_eq!(segments.path(), "People('russellwhyte')/Friends");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::resources::errors::UsageError;

/// The `$ref` constant segment.
pub const REF_SEGMENT: &str = "$ref";
/// The `$count` constant segment.
pub const COUNT_SEGMENT: &str = "$count";
/// The `$value` constant segment.
pub const VALUE_SEGMENT: &str = "$value";
/// The `$metadata` constant segment.
pub const METADATA_SEGMENT: &str = "$metadata";

/// The kind of a path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// An addressable entity set (e.g. `People`).
    EntitySet,
    /// A navigation property traversed as a path segment.
    NavigationProperty,
    /// A structural property of an entity.
    Property,
    /// A bound action call.
    Action,
    /// A bound function call (parameters render inline).
    Function,
    /// The `$ref` reference address.
    Ref,
    /// The `$count` address.
    Count,
    /// The `$value` raw-value address.
    Value,
    /// The `$metadata` service document address.
    Metadata,
}

impl SegmentKind {
    /// Returns `true` if a segment of this kind may carry an entity key.
    #[must_use]
    pub const fn can_carry_key(self) -> bool {
        matches!(self, Self::EntitySet | Self::NavigationProperty)
    }
}

/// A single scalar key or function-parameter value.
///
/// Renders as an OData key literal: strings are single-quoted with embedded
/// quotes doubled, numbers and booleans render bare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    /// A string value, rendered single-quoted.
    String(String),
    /// An integer value, rendered bare.
    Int(i64),
    /// A boolean value, rendered bare.
    Bool(bool),
}

impl KeyValue {
    /// Renders the value as an OData literal.
    ///
    /// # Example
    ///
    /// ```rust
    /// use odata_client::resources::KeyValue;
    ///
    /// assert_eq!(KeyValue::from("O'Neil").to_literal(), "'O''Neil'");
    /// assert_eq!(KeyValue::from(42).to_literal(), "42");
    /// ```
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    /// Builds a `KeyValue` from a JSON value, if it is key-shaped.
    ///
    /// Empty strings, non-integer numbers, nulls, and structured values are
    /// not valid keys and yield `None`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(Self::String(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(Self::Int),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            _ => None,
        }
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for KeyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

/// The key identifying one member of an entity set.
///
/// A single declared key field yields a scalar key; multiple declared key
/// fields yield a composite key rendered as `name=literal` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    /// A scalar key: `People('russellwhyte')`.
    Single(KeyValue),
    /// A composite key: `Flights(From='LAX',To='SFO')`.
    Composite(BTreeMap<String, KeyValue>),
}

impl EntityKey {
    /// Creates a scalar key.
    #[must_use]
    pub const fn single(value: KeyValue) -> Self {
        Self::Single(value)
    }

    /// Creates a composite key from named parts.
    #[must_use]
    pub fn composite(parts: impl IntoIterator<Item = (String, KeyValue)>) -> Self {
        Self::Composite(parts.into_iter().collect())
    }

    /// Renders the key as the parenthesized literal's interior.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::Single(value) => value.to_literal(),
            Self::Composite(parts) => parts
                .iter()
                .map(|(name, value)| format!("{name}={}", value.to_literal()))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<KeyValue> for EntityKey {
    fn from(value: KeyValue) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self::Single(KeyValue::from(value))
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self::Single(KeyValue::from(value))
    }
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        Self::Single(KeyValue::from(value))
    }
}

impl From<i32> for EntityKey {
    fn from(value: i32) -> Self {
        Self::Single(KeyValue::from(value))
    }
}

impl From<bool> for EntityKey {
    fn from(value: bool) -> Self {
        Self::Single(KeyValue::from(value))
    }
}

/// One typed element of a resource path.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// The segment kind.
    pub kind: SegmentKind,
    /// The segment name (`People`, `Friends`, `$count`, ...).
    pub name: String,
    /// The entity key, when this segment addresses a single member.
    pub key: Option<EntityKey>,
    /// Inline parameters, used only by function-call segments.
    pub params: BTreeMap<String, KeyValue>,
}

impl Segment {
    /// Creates a new segment with no key and no parameters.
    #[must_use]
    pub fn new(kind: SegmentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            key: None,
            params: BTreeMap::new(),
        }
    }

    /// Renders the segment, including its key or parameter literal.
    #[must_use]
    pub fn render(&self) -> String {
        if self.kind == SegmentKind::Function {
            let params = self
                .params
                .iter()
                .map(|(name, value)| format!("{name}={}", value.to_literal()))
                .collect::<Vec<_>>()
                .join(",");
            return format!("{}({params})", self.name);
        }
        self.key.as_ref().map_or_else(
            || self.name.clone(),
            |key| format!("{}({})", self.name, key.to_literal()),
        )
    }
}

/// An ordered, deep-clonable sequence of segments forming a resource path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSegments {
    segments: Vec<Segment>,
}

impl PathSegments {
    /// Creates an empty path.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Appends a segment of the given kind.
    pub fn push(&mut self, kind: SegmentKind, name: impl Into<String>) {
        self.segments.push(Segment::new(kind, name));
    }

    /// Appends a fully built segment.
    pub fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the last segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Sets the entity key on the last segment.
    ///
    /// Only the last segment may carry a new key; earlier segments keep the
    /// keys they were given when they were last.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::KeylessSegment`] if the path is empty or its
    /// last segment cannot carry a key (e.g. `$count`, a property).
    pub fn set_key(&mut self, key: EntityKey) -> Result<(), UsageError> {
        match self.segments.last_mut() {
            Some(segment) if segment.kind.can_carry_key() => {
                segment.key = Some(key);
                Ok(())
            }
            _ => Err(UsageError::KeylessSegment),
        }
    }

    /// Removes the entity key from the last segment, if it carries one.
    pub fn clear_key(&mut self) {
        if let Some(segment) = self.segments.last_mut() {
            segment.key = None;
        }
    }

    /// Returns the entity key of the last segment, if it carries one.
    #[must_use]
    pub fn key(&self) -> Option<&EntityKey> {
        self.segments.last().and_then(|segment| segment.key.as_ref())
    }

    /// Returns `true` if the last segment carries an entity key.
    #[must_use]
    pub fn has_key(&self) -> bool {
        self.key().is_some()
    }

    /// Renders the path, segments in order, `/`-separated.
    #[must_use]
    pub fn path(&self) -> String {
        self.segments
            .iter()
            .map(Segment::render)
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for PathSegments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
