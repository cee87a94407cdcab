//! Error types for composing requests and resolving responses.
//!
//! Composition failures are reported as [`CompositionError`] before anything
//! is sent. Everything that can go wrong once a call was made is one of the
//! [`Outcome`](crate::Outcome) variants; [`FlowError`] is the same taxonomy
//! shaped as an error type for callers who prefer `Result` and `?`.

use crate::mapping::ErrorMapping;
use bytes::Bytes;
use serde_json::error::Category;

/// Errors raised while turning an endpoint into a request.
///
/// These are always fatal to the call: no partially built request is ever
/// returned.
#[derive(thiserror::Error, Debug)]
pub enum CompositionError {
    /// The base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL parsed, but cannot have a path appended (e.g. `mailto:`).
    #[error("Base URL cannot carry a path: {0}")]
    UnsupportedBaseUrl(String),

    /// A header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The JSON body could not be encoded.
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while configuring a [`Client`](crate::Client).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A default header name or value is not valid HTTP.
    #[error("Invalid default header: {0}")]
    InvalidHeader(String),

    /// The built-in HTTP transport could not be initialized.
    #[error("Failed to build HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Native transport failures.
///
/// This set is the contract between transports and the resolver; a transport
/// classifies whatever went wrong on its side into one of these kinds.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportFailure {
    /// Any failure that does not fit the other kinds.
    #[error("unknown transport failure")]
    Unknown,

    /// The request or resource timeout elapsed.
    #[error("request timed out")]
    TimedOut,

    /// There is no network connectivity (or the host could not be reached).
    #[error("not connected to the network")]
    NotConnected,

    /// The connection dropped while the call was in flight.
    #[error("network connection was lost")]
    ConnectionLost,

    /// The call was cancelled by its owner.
    #[error("request was cancelled")]
    Cancelled,
}

impl TransportFailure {
    /// Every failure kind.
    pub const ALL: [TransportFailure; 5] = [
        TransportFailure::Unknown,
        TransportFailure::TimedOut,
        TransportFailure::NotConnected,
        TransportFailure::ConnectionLost,
        TransportFailure::Cancelled,
    ];
}

/// A response body that did not decode into the requested type.
///
/// Keeps the raw body and the serde error so decoding problems can be
/// diagnosed from logs or error reports.
#[derive(thiserror::Error, Debug)]
#[error("Failed to decode response (status {status}): {source}")]
pub struct DecodeFailure {
    /// The HTTP status code of the response.
    pub status: u16,
    /// The raw body that failed to decode.
    pub raw_body: Bytes,
    /// The underlying serde error.
    #[source]
    pub source: serde_json::Error,
}

impl DecodeFailure {
    /// Creates a decode failure.
    pub fn new(status: u16, raw_body: Bytes, source: serde_json::Error) -> Self {
        Self {
            status,
            raw_body,
            source,
        }
    }

    /// A short description of what kind of mismatch occurred.
    pub fn category(&self) -> &'static str {
        match self.source.classify() {
            Category::Io => "io",
            Category::Syntax => "malformed json",
            Category::Data => "shape mismatch",
            Category::Eof => "truncated json",
        }
    }

    /// The raw body as text, with invalid UTF-8 replaced.
    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw_body).into_owned()
    }
}

/// Every way a call can fail, with `E` as the caller's structured error model.
///
/// Produced by [`Outcome::into_result`](crate::Outcome::into_result), and
/// convertible from [`CompositionError`] so composition and resolution
/// failures can share one `?` chain.
///
/// # Examples
///
/// ```
/// use flowline::{FlowError, TransportFailure};
///
/// #[derive(Debug, PartialEq)]
/// struct ApiError { code: u32 }
///
/// let err: FlowError<ApiError> = FlowError::Domain(ApiError { code: 7 });
/// assert_eq!(err.domain(), Some(&ApiError { code: 7 }));
///
/// let err: FlowError<ApiError> = TransportFailure::TimedOut.into();
/// assert_eq!(err.domain(), None);
/// assert_eq!(err.transport_failure(), Some(TransportFailure::TimedOut));
/// ```
#[derive(thiserror::Error, Debug)]
pub enum FlowError<E> {
    /// The request could not be composed.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CompositionError),

    /// The server returned a structured error, or a transport failure was
    /// mapped into one.
    #[error("API error: {0:?}")]
    Domain(E),

    /// The server returned a non-2xx status and the body was left raw.
    #[error("HTTP error {status}: {}", String::from_utf8_lossy(.body))]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        body: Bytes,
    },

    /// The call never produced an HTTP response.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportFailure),

    /// The body did not decode into the requested type.
    #[error(transparent)]
    Decode(#[from] DecodeFailure),

    /// The transport returned something that is not an HTTP response.
    #[error("Response is not an HTTP response")]
    InvalidResponse,

    /// The response had no body where one was expected.
    #[error("Response with status {status} has no body")]
    NoData {
        /// The HTTP status code.
        status: u16,
    },
}

impl<E> FlowError<E> {
    /// Returns the structured domain error, if this is one.
    pub fn domain(&self) -> Option<&E> {
        match self {
            FlowError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the error and returns the structured domain error, if any.
    pub fn into_domain(self) -> Option<E> {
        match self {
            FlowError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the transport failure kind, if this is one.
    pub fn transport_failure(&self) -> Option<TransportFailure> {
        match self {
            FlowError::Transport(kind) => Some(*kind),
            _ => None,
        }
    }

    /// The user-facing message for a transport failure, from the message
    /// provider of the process-wide [`ErrorMapping`].
    ///
    /// Returns `None` for every other error, or when no provider is installed.
    pub fn user_message(&self) -> Option<String> {
        self.user_message_with(ErrorMapping::global()?)
    }

    /// Like [`user_message`](Self::user_message), with an explicit mapping.
    pub fn user_message_with(&self, mapping: &ErrorMapping) -> Option<String> {
        mapping.user_message(self.transport_failure()?)
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FlowError::Api { status, .. } => Some(*status),
            FlowError::Decode(failure) => Some(failure.status),
            FlowError::NoData { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_body(&self) -> Option<&[u8]> {
        match self {
            FlowError::Api { body, .. } => Some(&body[..]),
            FlowError::Decode(failure) => Some(&failure.raw_body[..]),
            _ => None,
        }
    }
}
