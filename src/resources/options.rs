//! Query options and the filter expression tree.
//!
//! [`QueryOptions`] holds every recognized query modifier with plain
//! getter/setter pairs: getters borrow without mutating, setters mutate the
//! instance they are called on and nothing else. Expand targets nest
//! recursively: each expanded relation owns a scoped `QueryOptions` that is
//! editable independently of its parent's top-level options.
//!
//! # Example
//!
//! ```rust
//! use odata_client::resources::{Filter, QueryOptions, SortDirection};
//!
//! let mut options = QueryOptions::new();
//! options.set_select(["FirstName", "LastName"]);
//! options.set_filter(Filter::gt("Age", 21));
//! options.set_order_by([("LastName", SortDirection::Asc)]);
//! options.set_top(10);
//! options.expand_mut("Friends").set_top(2);
//!
//! let rendered = options
//!     .to_query_pairs()
//!     .into_iter()
//!     .map(|(k, v)| format!("{k}={v}"))
//!     .collect::<Vec<_>>()
//!     .join("&");
//! assert_eq!(
//!     rendered,
//!     "$select=FirstName,LastName&$filter=Age gt 21&$orderby=LastName asc&$expand=Friends($top=2)&$top=10"
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// The `$count` inline-count option name, injected by collection verbs.
pub const COUNT_OPTION: &str = "$count";
/// The `$id` option name, used by reference-removal requests.
pub const ID_OPTION: &str = "$id";
/// The `$skip` option name.
pub const SKIP_OPTION: &str = "$skip";
/// The `$skiptoken` option name.
pub const SKIP_TOKEN_OPTION: &str = "$skiptoken";

/// Sort direction for an `$orderby` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Returns the protocol keyword for this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A comparison operator in a filter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
}

impl CompareOp {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }
}

/// A literal value in a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A string literal, rendered single-quoted.
    String(String),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Double(f64),
    /// A boolean literal.
    Bool(bool),
    /// The null literal.
    Null,
}

impl FilterValue {
    fn to_literal(&self) -> String {
        match self {
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Int(n) => n.to_string(),
            Self::Double(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Null => "null".to_string(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A `$filter` expression tree.
///
/// Built from comparison constructors and combined with
/// [`and`](Self::and) / [`or`](Self::or) / [`not`](Self::not). The
/// [`Raw`](Self::Raw) variant carries a pre-rendered expression for anything
/// the tree does not model.
///
/// # Example
///
/// ```rust
/// use odata_client::resources::Filter;
///
/// let filter = Filter::eq("City", "Boise").and(Filter::gt("Age", 21).not());
/// assert_eq!(filter.to_query_string(), "City eq 'Boise' and not (Age gt 21)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// A pre-rendered filter expression, used verbatim.
    Raw(String),
    /// A field/operator/literal comparison.
    Compare {
        /// The field path being compared.
        field: String,
        /// The comparison operator.
        op: CompareOp,
        /// The literal value.
        value: FilterValue,
    },
    /// The `contains(field,'value')` function.
    Contains {
        /// The field path.
        field: String,
        /// The substring to look for.
        value: String,
    },
    /// The `startswith(field,'value')` function.
    StartsWith {
        /// The field path.
        field: String,
        /// The prefix to look for.
        value: String,
    },
    /// A conjunction of two expressions.
    And(Box<Filter>, Box<Filter>),
    /// A disjunction of two expressions.
    Or(Box<Filter>, Box<Filter>),
    /// A negated expression.
    Not(Box<Filter>),
}

impl Filter {
    /// Creates a raw, pre-rendered filter expression.
    #[must_use]
    pub fn raw(expression: impl Into<String>) -> Self {
        Self::Raw(expression.into())
    }

    /// Creates an equality comparison.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    /// Creates an inequality comparison.
    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    /// Creates a greater-than comparison.
    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    /// Creates a greater-or-equal comparison.
    #[must_use]
    pub fn ge(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Ge, value)
    }

    /// Creates a less-than comparison.
    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    /// Creates a less-or-equal comparison.
    #[must_use]
    pub fn le(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Le, value)
    }

    /// Creates a `contains` function call.
    #[must_use]
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a `startswith` function call.
    #[must_use]
    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::StartsWith {
            field: field.into(),
            value: value.into(),
        }
    }

    fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<FilterValue>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Combines two expressions with `and`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combines two expressions with `or`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Negates an expression.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Renders the expression as a `$filter` value.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Raw(expression) => expression.clone(),
            Self::Compare { field, op, value } => {
                format!("{field} {} {}", op.as_str(), value.to_literal())
            }
            Self::Contains { field, value } => {
                format!("contains({field},{})", FilterValue::from(value.as_str()).to_literal())
            }
            Self::StartsWith { field, value } => {
                format!("startswith({field},{})", FilterValue::from(value.as_str()).to_literal())
            }
            Self::And(left, right) => {
                format!("{} and {}", left.render_operand(), right.render_operand())
            }
            Self::Or(left, right) => {
                format!("{} or {}", left.render_operand(), right.render_operand())
            }
            Self::Not(inner) => format!("not ({})", inner.to_query_string()),
        }
    }

    // Parenthesize nested boolean operators so precedence survives rendering.
    fn render_operand(&self) -> String {
        match self {
            Self::And(..) | Self::Or(..) => format!("({})", self.to_query_string()),
            _ => self.to_query_string(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

/// The recognized query modifiers of a resource address.
///
/// Every option is optional; unset options are omitted from the rendered
/// query string. No option kind can appear twice. Cloning is a structural
/// deep copy, including the nested expand tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    select: Option<Vec<String>>,
    filter: Option<Filter>,
    search: Option<String>,
    transform: Option<String>,
    order_by: Option<Vec<(String, SortDirection)>>,
    expand: BTreeMap<String, QueryOptions>,
    top: Option<u64>,
    skip: Option<u64>,
    skip_token: Option<String>,
    format: Option<String>,
    custom: BTreeMap<String, String>,
}

impl QueryOptions {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the selected field names, if set.
    #[must_use]
    pub fn select(&self) -> Option<&[String]> {
        self.select.as_deref()
    }

    /// Sets the `$select` field list.
    pub fn set_select<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
    }

    /// Returns the filter expression, if set.
    #[must_use]
    pub const fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Sets the `$filter` expression.
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = Some(filter);
    }

    /// Returns the search text, if set.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Sets the `$search` text.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = Some(search.into());
    }

    /// Returns the `$apply` transformation, if set.
    #[must_use]
    pub fn transform(&self) -> Option<&str> {
        self.transform.as_deref()
    }

    /// Sets the `$apply` transformation (grouping/aggregation).
    pub fn set_transform(&mut self, transform: impl Into<String>) {
        self.transform = Some(transform.into());
    }

    /// Returns the ordering terms, if set.
    #[must_use]
    pub fn order_by(&self) -> Option<&[(String, SortDirection)]> {
        self.order_by.as_deref()
    }

    /// Sets the `$orderby` terms.
    pub fn set_order_by<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = (S, SortDirection)>,
        S: Into<String>,
    {
        self.order_by = Some(
            terms
                .into_iter()
                .map(|(field, dir)| (field.into(), dir))
                .collect(),
        );
    }

    /// Returns the expand tree.
    #[must_use]
    pub const fn expand(&self) -> &BTreeMap<String, QueryOptions> {
        &self.expand
    }

    /// Returns the scoped options of an expand target, creating the entry.
    ///
    /// The returned options are editable independently of this instance's
    /// top-level options.
    pub fn expand_mut(&mut self, relation: impl Into<String>) -> &mut QueryOptions {
        self.expand.entry(relation.into()).or_default()
    }

    /// Returns the page size limit, if set.
    #[must_use]
    pub const fn top(&self) -> Option<u64> {
        self.top
    }

    /// Sets the `$top` limit.
    ///
    /// Negative values are unrepresentable: the argument is unsigned.
    pub fn set_top(&mut self, top: u64) {
        self.top = Some(top);
    }

    /// Removes the `$top` limit.
    pub fn clear_top(&mut self) {
        self.top = None;
    }

    /// Returns the skip offset, if set.
    #[must_use]
    pub const fn skip(&self) -> Option<u64> {
        self.skip
    }

    /// Sets the `$skip` offset.
    ///
    /// Negative values are unrepresentable: the argument is unsigned.
    pub fn set_skip(&mut self, skip: u64) {
        self.skip = Some(skip);
    }

    /// Removes the `$skip` offset.
    pub fn clear_skip(&mut self) {
        self.skip = None;
    }

    /// Returns the continuation token, if set.
    #[must_use]
    pub fn skip_token(&self) -> Option<&str> {
        self.skip_token.as_deref()
    }

    /// Sets the opaque `$skiptoken` continuation cursor.
    pub fn set_skip_token(&mut self, token: impl Into<String>) {
        self.skip_token = Some(token.into());
    }

    /// Removes the `$skiptoken` continuation cursor.
    pub fn clear_skip_token(&mut self) {
        self.skip_token = None;
    }

    /// Returns the response format, if set.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Sets the `$format` option.
    pub fn set_format(&mut self, format: impl Into<String>) {
        self.format = Some(format.into());
    }

    /// Returns the free-form custom options.
    #[must_use]
    pub const fn custom(&self) -> &BTreeMap<String, String> {
        &self.custom
    }

    /// Sets a free-form custom option.
    pub fn set_custom(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.custom.insert(name.into(), value.into());
    }

    /// Returns `true` if no option is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Renders the options as ordered query pairs, omitting unset options.
    ///
    /// Values are protocol-ready but not percent-encoded; encoding happens
    /// at the transport boundary.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(select) = &self.select {
            pairs.push(("$select".to_string(), select.join(",")));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("$filter".to_string(), filter.to_query_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("$search".to_string(), search.clone()));
        }
        if let Some(transform) = &self.transform {
            pairs.push(("$apply".to_string(), transform.clone()));
        }
        if let Some(order_by) = &self.order_by {
            let value = order_by
                .iter()
                .map(|(field, dir)| format!("{field} {}", dir.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("$orderby".to_string(), value));
        }
        if !self.expand.is_empty() {
            pairs.push(("$expand".to_string(), render_expand(&self.expand)));
        }
        if let Some(top) = self.top {
            pairs.push(("$top".to_string(), top.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push((SKIP_OPTION.to_string(), skip.to_string()));
        }
        if let Some(token) = &self.skip_token {
            pairs.push((SKIP_TOKEN_OPTION.to_string(), token.clone()));
        }
        if let Some(format) = &self.format {
            pairs.push(("$format".to_string(), format.clone()));
        }
        for (name, value) in &self.custom {
            pairs.push((name.clone(), value.clone()));
        }

        pairs
    }
}

/// Renders an expand tree: `Nav($select=A;$top=2),Other`.
fn render_expand(expand: &BTreeMap<String, QueryOptions>) -> String {
    expand
        .iter()
        .map(|(relation, options)| {
            if options.is_empty() {
                relation.clone()
            } else {
                let inner = options
                    .to_query_pairs()
                    .into_iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join(";");
                format!("{relation}({inner})")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
