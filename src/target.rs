//! Endpoint descriptors.
//!
//! An endpoint describes one logical API call: where it goes, which verb it
//! uses, which headers it carries and how its body or query is populated.
//! Applications usually implement [`Endpoint`] on an enum with one variant per
//! call; [`Target`] is a ready-made value type for one-off requests.

use crate::error::CompositionError;
use crate::task::Task;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::fmt;

/// The HTTP verbs an endpoint can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
}

impl HttpMethod {
    /// All supported verbs.
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    /// The verb as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
        }
    }
}

/// A declarative description of one API call.
///
/// # Examples
///
/// ```
/// use flowline::{Endpoint, HttpMethod, Task};
///
/// enum UsersApi {
///     List,
///     Show(u64),
/// }
///
/// impl Endpoint for UsersApi {
///     fn base_url(&self) -> &str {
///         "https://api.example.com"
///     }
///
///     fn path(&self) -> String {
///         match self {
///             UsersApi::List => "/users".to_string(),
///             UsersApi::Show(id) => format!("/users/{}", id),
///         }
///     }
///
///     fn method(&self) -> HttpMethod {
///         HttpMethod::Get
///     }
///
///     fn task(&self) -> Task {
///         Task::Plain
///     }
/// }
///
/// let request = flowline::compose(&UsersApi::Show(7)).unwrap();
/// assert_eq!(request.url.as_str(), "https://api.example.com/users/7");
/// ```
pub trait Endpoint {
    /// Absolute origin the path is appended to.
    fn base_url(&self) -> &str;

    /// Path relative to the base URL. Empty means the base URL as-is.
    fn path(&self) -> String;

    /// The HTTP verb.
    fn method(&self) -> HttpMethod;

    /// Headers sent with the request.
    fn headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// How the body and query string are populated.
    fn task(&self) -> Task;
}

/// A self-contained endpoint descriptor.
///
/// # Examples
///
/// ```
/// use flowline::{HttpMethod, Target, Task};
/// use flowline::params::Parameters;
///
/// let target = Target::new("https://api.example.com", HttpMethod::Get, "/search")
///     .with_header("Accept-Language", "pt-BR")
///     .unwrap()
///     .with_task(Task::query(Parameters::new().with("q", "rust")));
///
/// let request = flowline::compose(&target).unwrap();
/// assert_eq!(request.url.as_str(), "https://api.example.com/search?q=rust");
/// ```
#[derive(Debug, Clone)]
pub struct Target {
    /// The absolute origin.
    pub base_url: String,

    /// The request path (relative to the base URL).
    pub path: String,

    /// The HTTP method.
    pub method: HttpMethod,

    /// Headers for this request.
    pub headers: HeaderMap,

    /// Body and parameter strategy.
    pub task: Task,
}

impl Target {
    /// Creates a target with no headers and a [`Task::Plain`] body.
    pub fn new(base_url: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            method,
            headers: HeaderMap::new(),
            task: Task::Plain,
        }
    }

    /// Adds a header, replacing any previous value under the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, CompositionError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| CompositionError::InvalidHeader(format!("invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| CompositionError::InvalidHeader(format!("invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the body and parameter strategy.
    pub fn with_task(mut self, task: Task) -> Self {
        self.task = task;
        self
    }
}

impl Endpoint for Target {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    fn task(&self) -> Task {
        self.task.clone()
    }
}

impl<T> Endpoint for &T
where
    T: Endpoint + ?Sized,
{
    fn base_url(&self) -> &str {
        (**self).base_url()
    }

    fn path(&self) -> String {
        (**self).path()
    }

    fn method(&self) -> HttpMethod {
        (**self).method()
    }

    fn headers(&self) -> HeaderMap {
        (**self).headers()
    }

    fn task(&self) -> Task {
        (**self).task()
    }
}
