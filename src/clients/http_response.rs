//! HTTP response types for the transport layer.
//!
//! This module provides the [`HttpResponse`] type returned by every
//! [`Transport`](crate::clients::Transport) implementation.

use std::collections::HashMap;

/// An HTTP response from the OData service.
///
/// Contains the response status code, headers, and the body parsed as JSON.
/// Protocol metadata (`@odata.*` annotations) lives in the body and is
/// extracted by the resource layer, not here; the response constructor only
/// parses transport-level headers (`Retry-After`).
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, lowercase keys (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The parsed response body.
    ///
    /// An empty body (204 No Content) is represented as `Value::Null`.
    /// A `$count` response body is a bare JSON number.
    pub body: serde_json::Value,
    /// Seconds to wait before retrying (from the `Retry-After` header).
    pub retry_request_after: Option<f64>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing transport-level headers.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: serde_json::Value) -> Self {
        let retry_request_after = headers
            .get("retry-after")
            .and_then(|values| values.first())
            .and_then(|value| value.parse::<f64>().ok());

        Self {
            code,
            headers,
            body,
            retry_request_after,
        }
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the `request-id` header value, if present.
    ///
    /// Useful for debugging and error reporting.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get("request-id")
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `ETag` header value, if present.
    ///
    /// Single-entity responses may carry the version token as a header in
    /// addition to the `@odata.etag` body annotation.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.headers
            .get("etag")
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}
