//! Response wrapper that carries an outcome together with transport details.
//!
//! Every call resolves to an [`Outcome`], and the [`Response`] around it keeps
//! the status, headers and latency that were observed, so they stay available
//! for logging even when the call failed.

use crate::error::FlowError;
use crate::outcome::Outcome;
use http::HeaderMap;
use std::time::Duration;

/// The result of one call plus what the transport observed.
///
/// `status` is `None` when no HTTP response arrived (for example on a
/// transport failure).
///
/// # Examples
///
/// ```no_run
/// use flowline::{Client, HttpMethod, Json, Outcome, Raw, Target};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder().build()?;
/// let target = Target::new("https://api.example.com", HttpMethod::Get, "/users/123");
///
/// let response = client.fetch::<Json<User>, Raw>(&target).await?;
/// println!("Request took {:?}", response.latency);
///
/// if let Outcome::Success(user) = &response.data {
///     println!("User {}: {}", user.id, user.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The resolved data.
    pub data: T,

    /// The HTTP status code, if a response arrived.
    pub status: Option<u16>,

    /// The response headers. Empty when no response arrived.
    pub headers: HeaderMap,

    /// Time from handing the request to the transport until it reported back.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(data: T, status: Option<u16>, headers: HeaderMap, latency: Duration) -> Self {
        Self {
            data,
            status,
            headers,
            latency,
        }
    }

    /// Maps the data to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use flowline::Response;
    /// # use http::HeaderMap;
    /// # use std::time::Duration;
    /// let response = Response::new(42, Some(200), HeaderMap::new(), Duration::from_millis(100));
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// assert_eq!(string_response.status, Some(200));
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            latency: self.latency,
        }
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use flowline::Response;
    /// # use http::{HeaderMap, HeaderValue};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let response = Response::new((), Some(200), headers, Duration::from_millis(100));
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Discards the metadata.
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<V, E> Response<Outcome<V, E>> {
    /// Splits the outcome into a `Result`, keeping the metadata on success.
    ///
    /// # Errors
    ///
    /// Returns the [`FlowError`] for every outcome other than
    /// [`Outcome::Success`].
    pub fn into_result(self) -> Result<Response<V>, FlowError<E>> {
        let Response {
            data,
            status,
            headers,
            latency,
        } = self;
        let value = data.into_result()?;
        Ok(Response::new(value, status, headers, latency))
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
