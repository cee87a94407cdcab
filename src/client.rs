//! The client that runs calls end to end.
//!
//! A [`Client`] composes an [`Endpoint`] into a request, hands it to its
//! [`Transport`] and resolves whatever comes back into an [`Outcome`]. Use
//! [`ClientBuilder`] to configure and create clients.

use crate::{
    compose::{ComposedRequest, Composer, QueryPolicy},
    data_task::DataTask,
    decode::{Decoder, ErrorModel, Json, Raw},
    error::{CompositionError, ConfigError},
    mapping::ErrorMapping,
    outcome::Outcome,
    resolve::{RawResponse, Resolver},
    response::Response,
    target::Endpoint,
    transport::{ReqwestTransport, Timeouts, Transport},
};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The response type produced by [`Client::fetch`].
pub type FetchResponse<S, E> = Response<Outcome<<S as Decoder>::Output, <E as ErrorModel>::Output>>;

/// Runs calls against any [`Endpoint`].
///
/// The client is cheap to clone and designed to be reused across calls; the
/// built-in transport keeps a connection pool.
///
/// # Examples
///
/// ```no_run
/// use flowline::{Client, HttpMethod, Json, Outcome, Target, Task};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// #[derive(Deserialize, Debug)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// #[derive(Deserialize, Debug)]
/// struct ApiError {
///     message: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder()
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
///
/// let target = Target::new("https://api.example.com", HttpMethod::Post, "/users")
///     .with_task(Task::json(CreateUser { name: "Alice".to_string() }));
///
/// let response = client.fetch::<Json<User>, Json<ApiError>>(&target).await?;
/// match response.data {
///     Outcome::Success(user) => println!("Created user {}", user.id),
///     Outcome::DomainError(error) => println!("Rejected: {}", error.message),
///     other => println!("Call failed: {}", other.kind()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    composer: Composer,
    resolver: Resolver,
    default_headers: HeaderMap,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Composes `endpoint` into the request this client would send.
    ///
    /// Default headers are added here. They never replace a header the
    /// endpoint or its body encoding already set.
    ///
    /// # Errors
    ///
    /// Returns a [`CompositionError`] if the URL, headers or body are invalid.
    pub fn compose<T>(&self, endpoint: &T) -> Result<ComposedRequest, CompositionError>
    where
        T: Endpoint + ?Sized,
    {
        let mut request = self.inner.composer.compose(endpoint)?;
        for (name, value) in &self.inner.default_headers {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        Ok(request)
    }

    /// Runs a call and resolves it into an [`Outcome`].
    ///
    /// `S` selects how a 2xx body is decoded and `E` how a non-2xx body is
    /// decoded. Use [`Json<T>`] for typed JSON and [`Raw`] to keep the bytes.
    ///
    /// Only composition errors are returned as `Err`; everything that happens
    /// after the request is handed to the transport is an `Outcome` variant.
    ///
    /// # Errors
    ///
    /// Returns a [`CompositionError`] if the request could not be built. The
    /// transport is not called in that case.
    pub async fn fetch<S, E>(
        &self,
        endpoint: &(impl Endpoint + ?Sized),
    ) -> Result<FetchResponse<S, E>, CompositionError>
    where
        S: Decoder,
        E: ErrorModel,
    {
        let request = self.compose(endpoint)?;
        Ok(self.execute::<S, E>(request).await)
    }

    /// Fetches a JSON body, leaving error bodies raw.
    ///
    /// # Errors
    ///
    /// Returns a [`CompositionError`] if the request could not be built.
    pub async fn fetch_json<T>(
        &self,
        endpoint: &(impl Endpoint + ?Sized),
    ) -> Result<Response<Outcome<T, Infallible>>, CompositionError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.fetch::<Json<T>, Raw>(endpoint).await
    }

    /// Fetches the raw body bytes without decoding anything.
    ///
    /// # Errors
    ///
    /// Returns a [`CompositionError`] if the request could not be built.
    pub async fn fetch_raw(
        &self,
        endpoint: &(impl Endpoint + ?Sized),
    ) -> Result<Response<Outcome<Bytes, Infallible>>, CompositionError> {
        self.fetch::<Raw, Raw>(endpoint).await
    }

    /// Sends an already composed request and resolves the result.
    pub async fn execute<S, E>(&self, request: ComposedRequest) -> FetchResponse<S, E>
    where
        S: Decoder,
        E: ErrorModel,
    {
        let start_time = Instant::now();
        let raw = self.inner.transport.execute(request).await;
        self.inner.finish::<S, E>(raw, start_time.elapsed())
    }

    /// Starts a call in the background and returns a handle to control it.
    ///
    /// The call starts running immediately. See [`DataTask`] for suspending,
    /// resuming and cancelling it.
    ///
    /// # Errors
    ///
    /// Returns a [`CompositionError`] if the request could not be built. No
    /// task is started in that case.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn<S, E>(
        &self,
        endpoint: &(impl Endpoint + ?Sized),
    ) -> Result<DataTask<FetchResponse<S, E>>, CompositionError>
    where
        S: Decoder + 'static,
        E: ErrorModel + 'static,
        S::Output: Send + 'static,
    {
        let request = self.compose(endpoint)?;
        let start_time = Instant::now();
        let transport = Arc::clone(&self.inner.transport);
        let inner = Arc::clone(&self.inner);

        Ok(DataTask::spawn(
            async move { transport.execute(request).await },
            move |raw| inner.finish::<S, E>(raw, start_time.elapsed()),
        ))
    }

    /// The error mapping this client resolves with.
    pub fn error_mapping(&self) -> &ErrorMapping {
        self.inner.resolver.mapping()
    }

    /// The user-facing message for a transport failure, from this client's
    /// error mapping.
    pub fn user_message<V, E>(&self, outcome: &Outcome<V, E>) -> Option<String> {
        outcome.user_message_with(self.error_mapping())
    }
}

impl ClientInner {
    fn finish<S, E>(&self, raw: RawResponse, latency: Duration) -> FetchResponse<S, E>
    where
        S: Decoder,
        E: ErrorModel,
    {
        let status = raw.status();
        let headers = raw
            .head
            .as_ref()
            .map(|head| head.headers.clone())
            .unwrap_or_default();

        let outcome = self.resolver.resolve::<S, E>(raw);
        tracing::debug!(
            status = status,
            outcome = outcome.kind(),
            latency_ms = latency.as_millis(),
            "Resolved call"
        );

        Response::new(outcome, status, headers, latency)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("composer", &self.inner.composer)
            .field("resolver", &self.inner.resolver)
            .field("default_headers", &self.inner.default_headers)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use flowline::{ClientBuilder, ErrorMapping, QueryPolicy, Timeouts, TransportFailure};
///
/// #[derive(Debug)]
/// struct AppError {
///     message: String,
/// }
///
/// # fn example() -> Result<(), flowline::ConfigError> {
/// let client = ClientBuilder::new()
///     .timeouts(Timeouts::long())
///     .query_policy(QueryPolicy::Merge)
///     .error_mapping(ErrorMapping::new().on_transport_failure(|kind: TransportFailure| {
///         Some(AppError { message: kind.to_string() })
///     }))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    timeouts: Timeouts,
    error_mapping: Option<ErrorMapping>,
    query_policy: QueryPolicy,
    default_headers: HeaderMap,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            timeouts: Timeouts::default(),
            error_mapping: None,
            query_policy: QueryPolicy::default(),
            default_headers: HeaderMap::new(),
        }
    }

    /// Uses `transport` instead of the built-in `reqwest` transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the timeouts of the built-in transport.
    ///
    /// Ignored when a custom transport is set.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the error mapping.
    ///
    /// Without one, the process-wide mapping from [`ErrorMapping::install`]
    /// is used, if any.
    pub fn error_mapping(mut self, mapping: ErrorMapping) -> Self {
        self.error_mapping = Some(mapping);
        self
    }

    /// Sets how endpoint query parameters combine with a query already
    /// present in the base URL.
    pub fn query_policy(mut self, policy: QueryPolicy) -> Self {
        self.query_policy = policy;
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, ConfigError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| ConfigError::InvalidHeader(format!("invalid name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| ConfigError::InvalidHeader(format!("invalid value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in transport cannot be initialized.
    pub fn build(self) -> Result<Client, ConfigError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeouts)?),
        };

        let mapping = self
            .error_mapping
            .or_else(|| ErrorMapping::global().cloned())
            .unwrap_or_default();

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                composer: Composer::new().with_query_policy(self.query_policy),
                resolver: Resolver::new(mapping),
                default_headers: self.default_headers,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFailure;
    use crate::target::{HttpMethod, Target};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        requests: Mutex<Vec<ComposedRequest>>,
    }

    struct Reply(RawResponse, Arc<Recording>);

    #[async_trait]
    impl Transport for Reply {
        async fn execute(&self, request: ComposedRequest) -> RawResponse {
            self.1.requests.lock().unwrap().push(request);
            self.0.clone()
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    fn client_with(raw: RawResponse) -> (Client, Arc<Recording>) {
        let recording = Arc::new(Recording::default());
        let client = Client::builder()
            .transport(Reply(raw, Arc::clone(&recording)))
            .default_header("x-app", "tests")
            .unwrap()
            .default_header("content-type", "text/plain")
            .unwrap()
            .build()
            .unwrap();
        (client, recording)
    }

    #[tokio::test]
    async fn test_fetch_resolves_through_transport() {
        let (client, recording) = client_with(RawResponse::new(200, r#"{"id":9}"#));
        let target = Target::new("https://api.example.com", HttpMethod::Get, "/items/9");

        let response = client.fetch_json::<Item>(&target).await.unwrap();
        assert_eq!(response.status, Some(200));
        assert_eq!(response.data.success(), Some(&Item { id: 9 }));

        let requests = recording.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.as_str(), "https://api.example.com/items/9");
    }

    #[tokio::test]
    async fn test_default_headers_do_not_override() {
        let (client, _) = client_with(RawResponse::new(200, "{}"));
        let target = Target::new("https://api.example.com", HttpMethod::Get, "/");

        let request = client.compose(&target).unwrap();
        assert_eq!(request.header("x-app"), Some("tests"));
        assert_eq!(request.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_composition_error_skips_transport() {
        let (client, recording) = client_with(RawResponse::new(200, "{}"));
        let target = Target::new("not a url", HttpMethod::Get, "/");

        let result = client.fetch_raw(&target).await;
        assert!(matches!(result, Err(CompositionError::InvalidUrl(_))));
        assert!(recording.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_has_no_status() {
        let (client, _) = client_with(RawResponse::failed(TransportFailure::TimedOut));
        let target = Target::new("https://api.example.com", HttpMethod::Get, "/");

        let response = client.fetch_raw(&target).await.unwrap();
        assert_eq!(response.status, None);
        assert!(response.headers.is_empty());
        assert!(matches!(
            response.data,
            Outcome::TransportFailure(TransportFailure::TimedOut)
        ));
    }

    #[tokio::test]
    async fn test_user_message_from_client_mapping() {
        let client = Client::builder()
            .transport(Reply(
                RawResponse::failed(TransportFailure::NotConnected),
                Arc::new(Recording::default()),
            ))
            .error_mapping(ErrorMapping::new().with_messages(|_| "offline".to_string()))
            .build()
            .unwrap();
        let target = Target::new("https://api.example.com", HttpMethod::Get, "/");

        let response = client.fetch_json::<Item>(&target).await.unwrap();
        assert_eq!(client.user_message(&response.data).as_deref(), Some("offline"));
    }

    #[test]
    fn test_invalid_default_header() {
        let result = Client::builder().default_header("bad header", "value");
        assert!(matches!(result, Err(ConfigError::InvalidHeader(_))));
    }
}
