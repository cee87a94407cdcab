//! Mapping of transport failures into caller-defined error models.
//!
//! By default a transport failure (timeout, no connectivity, ...) is never
//! turned into the caller's structured error type: it comes back as
//! [`Outcome::TransportFailure`](crate::Outcome::TransportFailure). An
//! application that wants one error type for everything registers a mapper
//! here and hands it to the [`Resolver`](crate::Resolver) or
//! [`ClientBuilder`](crate::ClientBuilder).

use crate::error::TransportFailure;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

type MapFn = dyn Fn(TransportFailure) -> Option<Box<dyn Any + Send>> + Send + Sync;
type MessageFn = dyn Fn(TransportFailure) -> String + Send + Sync;

static GLOBAL: OnceLock<ErrorMapping> = OnceLock::new();

/// Returned when a process-wide mapping was already installed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("a process-wide error mapping is already installed")]
pub struct MappingAlreadyInstalled;

/// An optional mapper from [`TransportFailure`] to a structured error, plus
/// an optional provider of user-facing messages for those failures.
///
/// The mapper produces values of one type `T`. When a call requests a
/// different error model type, the mapped value is ignored and the failure
/// stays unmapped.
///
/// The message provider is independent of the mapper: it lets an application
/// show localized text for an unmapped transport failure through
/// [`Outcome::user_message`](crate::Outcome::user_message) and
/// [`FlowError::user_message`](crate::FlowError::user_message).
///
/// # Examples
///
/// ```
/// use flowline::{ErrorMapping, TransportFailure};
///
/// #[derive(Debug, PartialEq)]
/// struct AppError { message: String }
///
/// let mapping = ErrorMapping::new().on_transport_failure(|kind| match kind {
///     TransportFailure::Cancelled => None,
///     other => Some(AppError { message: other.to_string() }),
/// });
///
/// assert_eq!(
///     mapping.map::<AppError>(TransportFailure::TimedOut),
///     Some(AppError { message: "request timed out".to_string() })
/// );
/// assert_eq!(mapping.map::<AppError>(TransportFailure::Cancelled), None);
/// assert_eq!(mapping.map::<String>(TransportFailure::TimedOut), None);
/// ```
#[derive(Clone, Default)]
pub struct ErrorMapping {
    mapper: Option<Arc<MapFn>>,
    output: Option<(TypeId, &'static str)>,
    messages: Option<Arc<MessageFn>>,
}

impl ErrorMapping {
    /// Creates an empty mapping that maps nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mapper, replacing any previous one.
    pub fn on_transport_failure<T, F>(mut self, mapper: F) -> Self
    where
        T: Send + 'static,
        F: Fn(TransportFailure) -> Option<T> + Send + Sync + 'static,
    {
        self.mapper = Some(Arc::new(move |kind: TransportFailure| {
            mapper(kind).map(|value| Box::new(value) as Box<dyn Any + Send>)
        }));
        self.output = Some((TypeId::of::<T>(), std::any::type_name::<T>()));
        self
    }

    /// Sets the user-facing message provider, replacing any previous one.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowline::{ErrorMapping, TransportFailure};
    ///
    /// let mapping = ErrorMapping::new().with_messages(|kind| match kind {
    ///     TransportFailure::NotConnected => "You are offline.".to_string(),
    ///     _ => "Something went wrong. Try again later.".to_string(),
    /// });
    ///
    /// assert_eq!(
    ///     mapping.user_message(TransportFailure::NotConnected).as_deref(),
    ///     Some("You are offline.")
    /// );
    /// ```
    pub fn with_messages<F>(mut self, provider: F) -> Self
    where
        F: Fn(TransportFailure) -> String + Send + Sync + 'static,
    {
        self.messages = Some(Arc::new(provider));
        self
    }

    /// Returns `true` if a message provider is registered.
    pub fn has_messages(&self) -> bool {
        self.messages.is_some()
    }

    /// The user-facing message for `kind`, if a provider is registered.
    pub fn user_message(&self, kind: TransportFailure) -> Option<String> {
        self.messages.as_ref().map(|provider| provider(kind))
    }

    /// Returns `true` if a mapper is registered.
    pub fn is_configured(&self) -> bool {
        self.mapper.is_some()
    }

    /// Runs the mapper for `kind` and returns its value if it is an `E`.
    pub fn map<E>(&self, kind: TransportFailure) -> Option<E>
    where
        E: 'static,
    {
        let mapper = self.mapper.as_ref()?;
        if let Some((type_id, type_name)) = self.output {
            if type_id != TypeId::of::<E>() {
                tracing::debug!(
                    mapper_output = type_name,
                    requested = std::any::type_name::<E>(),
                    failure = %kind,
                    "Error mapping produces a different type; leaving failure unmapped"
                );
                return None;
            }
        }

        mapper(kind)?.downcast::<E>().ok().map(|value| *value)
    }

    /// Installs `mapping` as the process-wide default.
    ///
    /// Intended to be called once during application start-up. Clients built
    /// without an explicit mapping pick it up in
    /// [`ClientBuilder::build`](crate::ClientBuilder::build).
    ///
    /// # Errors
    ///
    /// Returns [`MappingAlreadyInstalled`] if a default was installed before.
    pub fn install(mapping: ErrorMapping) -> Result<(), MappingAlreadyInstalled> {
        GLOBAL.set(mapping).map_err(|_| MappingAlreadyInstalled)
    }

    /// The process-wide default, if one was installed.
    pub fn global() -> Option<&'static ErrorMapping> {
        GLOBAL.get()
    }
}

impl fmt::Debug for ErrorMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMapping")
            .field("output", &self.output.map(|(_, name)| name))
            .field("messages", &self.messages.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Mapped(TransportFailure);

    #[test]
    fn test_empty_mapping_maps_nothing() {
        let mapping = ErrorMapping::new();
        assert!(!mapping.is_configured());
        for kind in TransportFailure::ALL {
            assert_eq!(mapping.map::<Mapped>(kind), None);
        }
    }

    #[test]
    fn test_mapping_covers_every_kind() {
        let mapping = ErrorMapping::new().on_transport_failure(|kind| Some(Mapped(kind)));
        assert!(mapping.is_configured());
        for kind in TransportFailure::ALL {
            assert_eq!(mapping.map::<Mapped>(kind), Some(Mapped(kind)));
        }
    }

    #[test]
    fn test_type_mismatch_is_unmapped() {
        let mapping = ErrorMapping::new().on_transport_failure(|kind| Some(Mapped(kind)));
        assert_eq!(mapping.map::<String>(TransportFailure::Unknown), None);
    }

    #[test]
    fn test_messages_are_independent_of_mapper() {
        let mapping = ErrorMapping::new();
        assert!(!mapping.has_messages());
        assert_eq!(mapping.user_message(TransportFailure::TimedOut), None);

        let mapping = mapping.with_messages(|kind| format!("sorry: {}", kind));
        assert!(mapping.has_messages());
        assert!(!mapping.is_configured());
        assert_eq!(
            mapping.user_message(TransportFailure::TimedOut).as_deref(),
            Some("sorry: request timed out")
        );
        assert_eq!(mapping.map::<Mapped>(TransportFailure::TimedOut), None);
    }

    #[test]
    fn test_later_mapper_replaces_earlier() {
        let mapping = ErrorMapping::new()
            .on_transport_failure(|kind| Some(Mapped(kind)))
            .on_transport_failure(|_| Some("replaced".to_string()));
        assert_eq!(mapping.map::<Mapped>(TransportFailure::Unknown), None);
        assert_eq!(
            mapping.map::<String>(TransportFailure::Unknown),
            Some("replaced".to_string())
        );
    }
}
