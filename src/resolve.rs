//! Classification of raw transport results into [`Outcome`]s.
//!
//! The resolver is a pure function of its input and its [`ErrorMapping`]:
//! resolving the same [`RawResponse`] twice yields the same variant.

use crate::decode::{Decoder, ErrorModel};
use crate::error::{DecodeFailure, TransportFailure};
use crate::mapping::ErrorMapping;
use crate::outcome::Outcome;
use bytes::Bytes;
use http::HeaderMap;

/// Status line and headers of an HTTP response.
#[derive(Debug, Clone, Default)]
pub struct ResponseHead {
    /// The HTTP status code.
    pub status: u16,
    /// The response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Creates a head with the given status and no headers.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }

    /// Returns `true` for statuses in `200..=299`.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// What a transport hands back for one call.
///
/// A transport fills in whatever it observed: a failure kind when the call
/// never completed, a head when an HTTP response arrived, and the body bytes
/// if there were any.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// The response body.
    pub body: Option<Bytes>,
    /// The response head. `None` means no status code could be obtained.
    pub head: Option<ResponseHead>,
    /// A transport-level failure.
    pub failure: Option<TransportFailure>,
}

impl RawResponse {
    /// A response with a status and a body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            body: Some(body.into()),
            head: Some(ResponseHead::new(status)),
            failure: None,
        }
    }

    /// A response with a status and no body.
    pub fn without_body(status: u16) -> Self {
        Self {
            body: None,
            head: Some(ResponseHead::new(status)),
            failure: None,
        }
    }

    /// A call that failed at the transport level.
    pub fn failed(kind: TransportFailure) -> Self {
        Self {
            body: None,
            head: None,
            failure: Some(kind),
        }
    }

    /// Replaces the response headers, creating an empty head if needed.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.head.get_or_insert_with(ResponseHead::default).headers = headers;
        self
    }

    /// The status code, if there was an HTTP response.
    pub fn status(&self) -> Option<u16> {
        self.head.as_ref().map(|head| head.status)
    }
}

/// Resolves [`RawResponse`]s into [`Outcome`]s.
///
/// # Examples
///
/// ```
/// use flowline::{Json, Outcome, RawResponse, Resolver};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct User { id: u64 }
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct ApiError { error: String }
///
/// let resolver = Resolver::default();
///
/// let ok = resolver.resolve::<Json<User>, Json<ApiError>>(RawResponse::new(200, r#"{"id":1}"#));
/// assert!(matches!(ok, Outcome::Success(User { id: 1 })));
///
/// let err = resolver.resolve::<Json<User>, Json<ApiError>>(RawResponse::new(404, r#"{"error":"gone"}"#));
/// assert!(matches!(err, Outcome::DomainError(ApiError { .. })));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    mapping: ErrorMapping,
}

impl Resolver {
    /// Creates a resolver that uses `mapping` for transport failures.
    pub fn new(mapping: ErrorMapping) -> Self {
        Self { mapping }
    }

    /// The error mapping in use.
    pub fn mapping(&self) -> &ErrorMapping {
        &self.mapping
    }

    /// Classifies `raw` into exactly one [`Outcome`].
    ///
    /// `S` selects the success type and `E` the structured error type
    /// ([`Raw`](crate::Raw) for none). Checks run in order, first match wins:
    ///
    /// 1. A transport failure resolves to `TransportFailure`, or to
    ///    `DomainError` when `E` is structured and the mapping yields an `E`.
    /// 2. A missing head resolves to `InvalidResponseShape`.
    /// 3. A 2xx status decodes the body as `S`: `Success` or
    ///    `DecodeFailure`, or `EmptyBody` when there is no body.
    /// 4. Any other status decodes the body as `E` (`DomainError` or
    ///    `DecodeFailure`), returns it as `RawError` when no structured type
    ///    was requested, or resolves to `EmptyBody` when there is no body.
    ///
    /// A zero-length body counts as no body.
    pub fn resolve<S, E>(&self, raw: RawResponse) -> Outcome<S::Output, E::Output>
    where
        S: Decoder,
        E: ErrorModel,
    {
        if let Some(kind) = raw.failure {
            return self.resolve_failure::<S::Output, E>(kind);
        }

        let Some(head) = raw.head else {
            tracing::warn!("Response has no status code");
            return Outcome::InvalidResponseShape;
        };
        let status = head.status;

        let Some(body) = raw.body.filter(|body| !body.is_empty()) else {
            tracing::debug!(status, "Response has no body");
            return Outcome::EmptyBody { status };
        };

        if head.is_success() {
            return match S::decode(&body) {
                Ok(value) => Outcome::Success(value),
                Err(e) => decode_failure(status, body, e),
            };
        }

        match E::decode(&body) {
            Some(Ok(error)) => {
                tracing::debug!(status, "Decoded structured error response");
                Outcome::DomainError(error)
            }
            Some(Err(e)) => decode_failure(status, body, e),
            None => {
                tracing::debug!(status, body_len = body.len(), "Returning raw error response");
                Outcome::RawError { status, body }
            }
        }
    }

    fn resolve_failure<V, E>(&self, kind: TransportFailure) -> Outcome<V, E::Output>
    where
        E: ErrorModel,
    {
        if E::STRUCTURED {
            if let Some(mapped) = self.mapping.map::<E::Output>(kind) {
                tracing::debug!(failure = %kind, "Mapped transport failure to error model");
                return Outcome::DomainError(mapped);
            }
        }

        tracing::warn!(failure = %kind, "Transport failure");
        Outcome::TransportFailure(kind)
    }
}

fn decode_failure<V, E>(status: u16, body: Bytes, error: serde_json::Error) -> Outcome<V, E> {
    let failure = DecodeFailure::new(status, body, error);
    tracing::error!(
        status,
        error = %failure.source,
        category = failure.category(),
        line = failure.source.line(),
        column = failure.source.column(),
        raw_response = %failure.raw_text(),
        "Failed to decode response"
    );
    Outcome::DecodeFailure(failure)
}
