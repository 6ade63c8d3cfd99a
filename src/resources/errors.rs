//! Error taxonomy for resource operations.
//!
//! This module contains the semantic error types surfaced by the resource
//! layer and the Model/Collection state machines, mapping transport-level
//! failures onto protocol-meaningful variants.
//!
//! # Error Handling
//!
//! - [`UsageError`]: Raised synchronously, before any I/O, and never retried.
//! - [`ODataError::NotFound`]: 404 responses, surfaced distinctly so callers
//!   can implement read-or-create fallbacks.
//! - [`ODataError::ConcurrencyConflict`]: Version-token mismatch (412) on
//!   update/delete, surfaced distinctly and never auto-retried.
//! - [`ODataError::MalformedResponse`]: Parse-level failures (expected
//!   `value` field absent), distinct from transport failures.
//! - [`ODataError::Transport`]: Everything else, passed through unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! match model.fetch(&client).await {
//!     Ok(()) => println!("loaded"),
//!     Err(ODataError::NotFound { target }) => println!("{target} does not exist"),
//!     Err(ODataError::ConcurrencyConflict { target }) => println!("{target} changed upstream"),
//!     Err(e) => println!("other failure: {e}"),
//! }
//! ```

use crate::clients::HttpError;
use thiserror::Error;

/// A misuse of the client API, detected before any request is issued.
///
/// Usage errors are always synchronous: no I/O has happened when one is
/// raised, and retrying without fixing the call is pointless.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// An entity-scoped operation was attempted without a resolvable key.
    #[error("{operation} requires a resolvable entity key")]
    MissingKey {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The path has no segment able to carry an entity key.
    #[error("path has no segment able to carry an entity key")]
    KeylessSegment,

    /// A resource of one type was attached to a Model/Collection of another.
    #[error("cannot attach a resource of type '{found}' to an instance of type '{expected}'")]
    TypeMismatch {
        /// The type the instance declares.
        expected: String,
        /// The type the resource declares.
        found: String,
    },

    /// An operation that needs optimistic-concurrency protection was
    /// attempted without a stored version token.
    #[error("{operation} requires the entity's last-known version token")]
    MissingVersionToken {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// An operation was attempted on a destroyed model.
    #[error("operation on a destroyed model")]
    Destroyed,

    /// The named relation does not exist on the declared entity type.
    #[error("unknown relation '{name}' on type '{type_name}'")]
    UnknownRelation {
        /// The relation name that was requested.
        name: String,
        /// The entity type it was requested on.
        type_name: String,
    },
}

/// Error type for resource, model, and collection operations.
///
/// All failures surface through the same asynchronous channel a success
/// would; nothing is swallowed internally. A failed operation leaves its
/// Model/Collection exactly as it was before the call.
#[derive(Debug, Error)]
pub enum ODataError {
    /// The addressed resource does not exist (HTTP 404).
    #[error("'{target}' not found")]
    NotFound {
        /// The rendered address that was requested.
        target: String,
    },

    /// The entity's version token no longer matches (HTTP 412).
    ///
    /// The server-side entity changed since it was last read. This is never
    /// retried or silently overwritten; callers decide whether to re-fetch.
    #[error("version token mismatch for '{target}'")]
    ConcurrencyConflict {
        /// The rendered address that was requested.
        target: String,
    },

    /// The response payload did not have the shape the protocol requires.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        /// What was missing or wrong.
        reason: String,
    },

    /// The client API was misused; no request was issued.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A transport-level failure, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] HttpError),
}

impl ODataError {
    /// Classifies a transport error into the resource-level taxonomy.
    ///
    /// Maps 404 to [`NotFound`](Self::NotFound) and 412 to
    /// [`ConcurrencyConflict`](Self::ConcurrencyConflict); everything else
    /// passes through as [`Transport`](Self::Transport).
    #[must_use]
    pub fn from_http(error: HttpError, target: &str) -> Self {
        match error.status_code() {
            Some(404) => Self::NotFound {
                target: target.to_string(),
            },
            Some(412) => Self::ConcurrencyConflict {
                target: target.to_string(),
            },
            _ => Self::Transport(error),
        }
    }

    /// Returns `true` if this is a [`NotFound`](Self::NotFound) error.
    ///
    /// Convenience for read-or-create fallbacks.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a
    /// [`ConcurrencyConflict`](Self::ConcurrencyConflict) error.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<UsageError>();
    assert_send_sync::<ODataError>();
};
