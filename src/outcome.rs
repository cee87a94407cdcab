//! The resolved result of a call.

use crate::error::{DecodeFailure, FlowError, TransportFailure};
use crate::mapping::ErrorMapping;
use bytes::Bytes;

/// The one result a completed call resolves to.
///
/// `V` is the caller's success type and `E` the structured error type. When
/// no structured error type was requested, `E` is
/// [`Infallible`](std::convert::Infallible) and non-2xx bodies arrive as
/// [`Outcome::RawError`].
///
/// # Examples
///
/// ```
/// use flowline::{Outcome, TransportFailure};
///
/// let outcome: Outcome<u32, String> = Outcome::Success(7);
/// assert!(outcome.is_success());
/// assert_eq!(outcome.into_result().ok(), Some(7));
///
/// let outcome: Outcome<u32, String> = Outcome::TransportFailure(TransportFailure::TimedOut);
/// assert_eq!(outcome.kind(), "transport_failure");
/// ```
#[derive(Debug)]
pub enum Outcome<V, E> {
    /// A 2xx response whose body decoded as `V`.
    Success(V),

    /// A non-2xx response whose body decoded as `E`, or a transport failure
    /// rewritten by the error mapping.
    DomainError(E),

    /// A non-2xx response whose body was left raw.
    RawError {
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        body: Bytes,
    },

    /// The call never produced an HTTP response.
    TransportFailure(TransportFailure),

    /// The body did not decode into the requested type.
    DecodeFailure(DecodeFailure),

    /// The transport returned a response without a status code.
    InvalidResponseShape,

    /// The response carried no body.
    EmptyBody {
        /// The HTTP status code.
        status: u16,
    },
}

impl<V, E> Outcome<V, E> {
    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// A stable, lowercase name for the variant, suitable for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::DomainError(_) => "domain_error",
            Outcome::RawError { .. } => "raw_error",
            Outcome::TransportFailure(_) => "transport_failure",
            Outcome::DecodeFailure(_) => "decode_failure",
            Outcome::InvalidResponseShape => "invalid_response_shape",
            Outcome::EmptyBody { .. } => "empty_body",
        }
    }

    /// Returns the success value, if any.
    pub fn success(&self) -> Option<&V> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the structured domain error, if any.
    pub fn domain_error(&self) -> Option<&E> {
        match self {
            Outcome::DomainError(error) => Some(error),
            _ => None,
        }
    }

    /// The user-facing message for a transport failure, from the message
    /// provider of the process-wide [`ErrorMapping`].
    ///
    /// Returns `None` for every other variant, or when no provider is installed.
    pub fn user_message(&self) -> Option<String> {
        self.user_message_with(ErrorMapping::global()?)
    }

    /// Like [`user_message`](Self::user_message), with an explicit mapping.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowline::{ErrorMapping, Outcome, TransportFailure};
    ///
    /// let mapping = ErrorMapping::new().with_messages(|_| "Try again later.".to_string());
    ///
    /// let outcome: Outcome<(), ()> = Outcome::TransportFailure(TransportFailure::TimedOut);
    /// assert_eq!(outcome.user_message_with(&mapping).as_deref(), Some("Try again later."));
    ///
    /// let outcome: Outcome<(), ()> = Outcome::EmptyBody { status: 204 };
    /// assert_eq!(outcome.user_message_with(&mapping), None);
    /// ```
    pub fn user_message_with(&self, mapping: &ErrorMapping) -> Option<String> {
        match self {
            Outcome::TransportFailure(kind) => mapping.user_message(*kind),
            _ => None,
        }
    }

    /// Maps the success value, leaving every other variant untouched.
    pub fn map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(V) -> U,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::DomainError(error) => Outcome::DomainError(error),
            Outcome::RawError { status, body } => Outcome::RawError { status, body },
            Outcome::TransportFailure(kind) => Outcome::TransportFailure(kind),
            Outcome::DecodeFailure(failure) => Outcome::DecodeFailure(failure),
            Outcome::InvalidResponseShape => Outcome::InvalidResponseShape,
            Outcome::EmptyBody { status } => Outcome::EmptyBody { status },
        }
    }

    /// Converts the outcome into a `Result`, with every failure as a [`FlowError`].
    pub fn into_result(self) -> Result<V, FlowError<E>> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::DomainError(error) => Err(FlowError::Domain(error)),
            Outcome::RawError { status, body } => Err(FlowError::Api { status, body }),
            Outcome::TransportFailure(kind) => Err(FlowError::Transport(kind)),
            Outcome::DecodeFailure(failure) => Err(FlowError::Decode(failure)),
            Outcome::InvalidResponseShape => Err(FlowError::InvalidResponse),
            Outcome::EmptyBody { status } => Err(FlowError::NoData { status }),
        }
    }
}

impl<V, E> From<Outcome<V, E>> for Result<V, FlowError<E>> {
    fn from(outcome: Outcome<V, E>) -> Self {
        outcome.into_result()
    }
}
