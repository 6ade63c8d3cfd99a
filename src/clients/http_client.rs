//! HTTP client for OData service communication.
//!
//! This module provides the [`Transport`] trait (the narrow interface the
//! resource layer issues requests through) and [`HttpClient`], the shipped
//! reqwest-based implementation with retry handling for throttled responses.

use std::collections::HashMap;

use crate::clients::errors::{HttpError, HttpResponseError, MaxHttpRetriesExceededError};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::config::{Credentials, ServiceConfig};

/// Fixed retry wait time in seconds when no `Retry-After` header is present.
pub const RETRY_WAIT_TIME: u64 = 1;

/// Library version from Cargo.toml.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The transport collaborator consumed by the resource layer.
///
/// Implementations must deliver the exact rendered path and query pairs of
/// the request, map `version_token` to the `If-Match` conditional-request
/// header, and surface the HTTP status through
/// [`HttpError::status_code`] so the resource layer can classify 404 and
/// 412 responses. Retry, backoff, and timeout policy belong here, never in
/// the resource layer.
///
/// Cancellation follows Rust future semantics: dropping the future returned
/// by [`send`](Self::send) aborts the in-flight request.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    /// Sends an HTTP request and returns the parsed response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the request fails validation, the network
    /// fails, or the service responds with a non-2xx status.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// HTTP client for making requests to an OData service.
///
/// The client handles:
/// - URL construction from the configured service root
/// - Default headers including `OData-Version` and User-Agent
/// - Credential policy (`Authorization` header)
/// - Version-token pass-through as `If-Match`
/// - Automatic retry for 429 and 503 responses
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust
/// use odata_client::{ServiceConfig, ServiceRootUrl};
/// use odata_client::clients::HttpClient;
///
/// let config = ServiceConfig::builder()
///     .service_root(ServiceRootUrl::new("https://example.org/odata").unwrap())
///     .build()
///     .unwrap();
///
/// let client = HttpClient::new(config);
/// ```
#[derive(Debug)]
pub struct HttpClient {
    /// The internal reqwest HTTP client.
    client: reqwest::Client,
    /// The service configuration.
    config: ServiceConfig,
    /// Default headers to include in all requests.
    default_headers: HashMap<String, String>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new HTTP client for the given service configuration.
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be created. This should
    /// only happen in extremely unusual circumstances (e.g., TLS
    /// initialization failure).
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let user_agent = format!("{user_agent_prefix}OData Client Library v{CLIENT_VERSION}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        default_headers.insert("OData-Version".to_string(), "4.0".to_string());
        default_headers.insert("OData-MaxVersion".to_string(), "4.0".to_string());

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            default_headers,
        }
    }

    /// Returns the configured service root URL as a string.
    #[must_use]
    pub fn service_root(&self) -> &str {
        self.config.service_root().as_ref()
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Parses response headers into a `HashMap` with lowercase keys.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    /// Calculates the retry delay based on response and status code.
    fn calculate_retry_delay(response: &HttpResponse, status: u16) -> std::time::Duration {
        // For 429: use Retry-After if present. For 503: fixed delay.
        if status == 429 {
            if let Some(retry_after) = response.retry_request_after {
                return std::time::Duration::from_secs_f64(retry_after);
            }
        }
        std::time::Duration::from_secs(RETRY_WAIT_TIME)
    }
}

impl Transport for HttpClient {
    /// Sends an HTTP request to the OData service.
    ///
    /// Handles URL construction, header merging, credential application,
    /// response parsing, and retry for 429/503 responses (up to the
    /// configured `max_tries`).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - A network error occurs (`Network`)
    /// - A non-2xx response is received (`Response`)
    /// - Max retries are exceeded (`MaxRetries`)
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let url = self.config.service_root().join(&request.path);

        let mut headers = self.default_headers.clone();
        if request.body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        if let Some(token) = &request.version_token {
            headers.insert("If-Match".to_string(), token.clone());
        }
        for (key, value) in &request.headers {
            headers.insert(key.clone(), value.clone());
        }

        tracing::debug!(
            method = %request.method,
            url = %url,
            query = ?request.query,
            "issuing request"
        );

        let max_tries = self.config.max_tries();
        let mut tries: u32 = 0;
        loop {
            tries += 1;

            let mut req_builder = match request.method {
                HttpMethod::Get => self.client.get(&url),
                HttpMethod::Post => self.client.post(&url),
                HttpMethod::Put => self.client.put(&url),
                HttpMethod::Patch => self.client.patch(&url),
                HttpMethod::Delete => self.client.delete(&url),
            };

            for (key, value) in &headers {
                req_builder = req_builder.header(key, value);
            }

            req_builder = match self.config.credentials() {
                Credentials::Anonymous => req_builder,
                Credentials::Bearer(token) => req_builder.bearer_auth(token),
                Credentials::Basic { username, password } => {
                    req_builder.basic_auth(username, Some(password))
                }
            };

            if !request.query.is_empty() {
                req_builder = req_builder.query(&request.query);
            }

            if let Some(body) = &request.body {
                req_builder = req_builder.body(body.to_string());
            }

            let res = req_builder.send().await?;

            let code = res.status().as_u16();
            let res_headers = Self::parse_response_headers(res.headers());
            let body_text = res.text().await.unwrap_or_default();

            // $count responses are bare numbers, which parse as JSON too.
            let body = if body_text.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_str(&body_text)
                    .unwrap_or_else(|_| serde_json::json!({ "raw_body": body_text }))
            };

            let response = HttpResponse::new(code, res_headers, body);

            if response.is_ok() {
                return Ok(response);
            }

            let message = response.body.to_string();
            let request_id = response.request_id().map(String::from);

            let should_retry = code == 429 || code == 503;
            if !should_retry {
                return Err(HttpError::Response(HttpResponseError {
                    code,
                    message,
                    request_id,
                }));
            }

            if tries >= max_tries {
                if max_tries == 1 {
                    return Err(HttpError::Response(HttpResponseError {
                        code,
                        message,
                        request_id,
                    }));
                }
                return Err(HttpError::MaxRetries(MaxHttpRetriesExceededError {
                    code,
                    tries: max_tries,
                    message,
                    request_id,
                }));
            }

            let delay = Self::calculate_retry_delay(&response, code);
            tracing::warn!(
                code,
                tries,
                delay_secs = delay.as_secs_f64(),
                "throttled response, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
