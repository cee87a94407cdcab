//! The network side of a call.
//!
//! A [`Transport`] takes a [`ComposedRequest`] and reports back what happened
//! as a [`RawResponse`]. Low-level errors are classified into the closed
//! [`TransportFailure`] set here, so the resolver never sees a transport's
//! native error type.

use crate::compose::ComposedRequest;
use crate::error::TransportFailure;
use crate::resolve::{RawResponse, ResponseHead};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Executes composed requests.
///
/// Implementations must return exactly once per call and never panic on
/// network errors; every failure is reported through
/// [`RawResponse::failure`].
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use flowline::{ComposedRequest, RawResponse, Transport};
///
/// /// Answers every request with the same canned response.
/// struct Canned(u16, &'static str);
///
/// #[async_trait]
/// impl Transport for Canned {
///     async fn execute(&self, _request: ComposedRequest) -> RawResponse {
///         RawResponse::new(self.0, self.1)
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and reports the result.
    async fn execute(&self, request: ComposedRequest) -> RawResponse;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn execute(&self, request: ComposedRequest) -> RawResponse {
        (**self).execute(request).await
    }
}

/// Timeouts applied by [`ReqwestTransport`].
///
/// # Examples
///
/// ```
/// use flowline::Timeouts;
/// use std::time::Duration;
///
/// let timeouts = Timeouts::default();
/// assert_eq!(timeouts.request, Duration::from_secs(15));
/// assert_eq!(timeouts.resource, Duration::from_secs(60));
///
/// let custom = Timeouts::long().with_request(Duration::from_secs(5));
/// assert_eq!(custom.request, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Inactivity timeout: how long connecting, or waiting for the next
    /// bytes of the response, may stall.
    pub request: Duration,
    /// Upper bound for the whole call, including reading the body.
    pub resource: Duration,
}

impl Timeouts {
    /// 15 second request timeout, 60 second resource timeout.
    pub const fn short() -> Self {
        Self {
            request: Duration::from_secs(15),
            resource: Duration::from_secs(60),
        }
    }

    /// 60 second request timeout, 5 minute resource timeout.
    pub const fn long() -> Self {
        Self {
            request: Duration::from_secs(60),
            resource: Duration::from_secs(300),
        }
    }

    /// Sets the request timeout.
    pub fn with_request(mut self, timeout: Duration) -> Self {
        self.request = timeout;
        self
    }

    /// Sets the resource timeout.
    pub fn with_resource(mut self, timeout: Duration) -> Self {
        self.resource = timeout;
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::short()
    }
}

/// A [`Transport`] backed by `reqwest`.
///
/// The underlying client keeps a connection pool, so one transport should be
/// shared across calls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(timeouts: Timeouts) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.request)
            .read_timeout(timeouts.request)
            .timeout(timeouts.resource)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured `reqwest` client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ComposedRequest) -> RawResponse {
        let start_time = Instant::now();
        log_request(&request);

        let ComposedRequest {
            url,
            method,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let failure = classify_send_error(&e);
                tracing::warn!(
                    error = %e,
                    failure = %failure,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    "Request failed before a response arrived"
                );
                return RawResponse::failed(failure);
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                let failure = classify_body_error(&e);
                tracing::warn!(
                    error = %e,
                    failure = %failure,
                    status = status,
                    "Failed to read response body"
                );
                return RawResponse::failed(failure);
            }
        };

        let latency = start_time.elapsed();
        if (200..=299).contains(&status) {
            tracing::info!(
                status = status,
                latency_ms = latency.as_millis(),
                "Received HTTP response"
            );
        } else if (400..=599).contains(&status) {
            tracing::warn!(
                status = status,
                latency_ms = latency.as_millis(),
                "Received HTTP error response"
            );
        } else {
            tracing::info!(
                status = status,
                latency_ms = latency.as_millis(),
                "Received HTTP response with unexpected status"
            );
        }
        tracing::debug!(
            headers = ?headers,
            body = %String::from_utf8_lossy(&body),
            "Response dump"
        );

        RawResponse {
            body: Some(body),
            head: Some(ResponseHead { status, headers }),
            failure: None,
        }
    }
}

fn log_request(request: &ComposedRequest) {
    tracing::debug!(
        method = %request.method,
        url = %request.url,
        headers = ?request.headers,
        body = request.body_text().as_deref().unwrap_or(""),
        "Executing HTTP request"
    );
}

/// Classifies an error raised while sending a request.
pub(crate) fn classify_send_error(error: &reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::TimedOut
    } else if error.is_connect() {
        TransportFailure::NotConnected
    } else if error.is_body() || error.is_decode() {
        TransportFailure::ConnectionLost
    } else {
        TransportFailure::Unknown
    }
}

/// Classifies an error raised while reading a response body. The response
/// head already arrived, so anything but a timeout means the connection
/// dropped.
pub(crate) fn classify_body_error(error: &reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::TimedOut
    } else {
        TransportFailure::ConnectionLost
    }
}
