//! Transport layer for OData service communication.
//!
//! This module provides the HTTP plumbing consumed by the resource layer:
//!
//! - **[`Transport`] trait**: The narrow collaborator interface requests go
//!   through. The resource layer is agnostic to how it is implemented.
//! - **[`HttpClient`]**: The shipped reqwest-based implementation with
//!   credential policy and retry handling for throttled responses.
//! - **[`HttpRequest`] / [`HttpResponse`]**: The request/response shapes.
//! - **[`HttpError`]**: Unified transport error taxonomy.
//!
//! Retry, backoff, and timeout policy all live here; the resource layer
//! never retries on its own.

mod errors;
mod http_client;
mod http_request;
mod http_response;

pub use errors::{
    HttpError, HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError,
};
pub use http_client::{HttpClient, Transport, CLIENT_VERSION, RETRY_WAIT_TIME};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::HttpResponse;
