//! Turns endpoint descriptors into transport-ready requests.
//!
//! Composition is pure: the same endpoint always yields the same request, and
//! a failure at any step aborts the whole composition.

use crate::error::CompositionError;
use crate::params::Parameters;
use crate::target::Endpoint;
use crate::task::{EncodableBody, ParameterEncoding, Task};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method};
use url::Url;

/// Content type set on requests that do not choose one.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type set on form-urlencoded bodies.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// What happens to a query string already present on the base URL when
/// query parameters are injected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryPolicy {
    /// The injected parameters become the entire query.
    #[default]
    Replace,
    /// The injected parameters are appended after the existing ones.
    Merge,
}

/// A concrete request, ready to hand to a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct ComposedRequest {
    /// The final absolute URL, including any injected query.
    pub url: Url,
    /// The HTTP method.
    pub method: Method,
    /// Request headers.
    pub headers: HeaderMap,
    /// The request body, if any.
    pub body: Option<Bytes>,
}

impl ComposedRequest {
    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }
}

impl TryFrom<ComposedRequest> for http::Request<Bytes> {
    type Error = http::uri::InvalidUri;

    fn try_from(request: ComposedRequest) -> Result<Self, Self::Error> {
        let uri: http::Uri = request.url.as_str().parse()?;
        let mut http_request = http::Request::new(request.body.unwrap_or_default());
        *http_request.method_mut() = request.method;
        *http_request.uri_mut() = uri;
        *http_request.headers_mut() = request.headers;
        Ok(http_request)
    }
}

/// Builds [`ComposedRequest`]s from [`Endpoint`]s.
///
/// # Examples
///
/// ```
/// use flowline::{Composer, HttpMethod, QueryPolicy, Target, Task};
/// use flowline::params::Parameters;
///
/// let target = Target::new("https://api.example.com/items?page=1", HttpMethod::Get, "")
///     .with_task(Task::query(Parameters::new().with("limit", 10)));
///
/// let replaced = Composer::new().compose(&target).unwrap();
/// assert_eq!(replaced.url.query(), Some("limit=10"));
///
/// let merged = Composer::new()
///     .with_query_policy(QueryPolicy::Merge)
///     .compose(&target)
///     .unwrap();
/// assert_eq!(merged.url.query(), Some("page=1&limit=10"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Composer {
    query_policy: QueryPolicy,
}

impl Composer {
    /// Creates a composer that replaces existing query strings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query policy.
    pub fn with_query_policy(mut self, policy: QueryPolicy) -> Self {
        self.query_policy = policy;
        self
    }

    /// The configured query policy.
    pub fn query_policy(&self) -> QueryPolicy {
        self.query_policy
    }

    /// Composes a request for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or cannot carry a path, or
    /// if a JSON body cannot be encoded.
    pub fn compose<T>(&self, endpoint: &T) -> Result<ComposedRequest, CompositionError>
    where
        T: Endpoint + ?Sized,
    {
        let mut url = join_url(endpoint.base_url(), &endpoint.path())?;
        let mut headers = endpoint.headers();

        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        }

        let body = match endpoint.task() {
            Task::Plain => None,
            Task::Json(body) => Some(encode_json(&body)?),
            Task::Parameters {
                parameters,
                encoding: ParameterEncoding::Query,
            } => {
                self.apply_query(&mut url, &parameters);
                None
            }
            Task::Parameters {
                parameters,
                encoding: ParameterEncoding::FormUrlEncoded,
            } => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_FORM));
                Some(form_body(&parameters))
            }
            Task::JsonWithQuery { body, query } => {
                self.apply_query(&mut url, &query);
                let encoded = encode_json(&body)?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
                Some(encoded)
            }
        };

        let method: Method = endpoint.method().into();

        tracing::trace!(
            method = %method,
            url = %url,
            body_len = body.as_ref().map_or(0, |b| b.len()),
            "Composed request"
        );

        Ok(ComposedRequest {
            url,
            method,
            headers,
            body,
        })
    }

    fn apply_query(&self, url: &mut Url, parameters: &Parameters) {
        if self.query_policy == QueryPolicy::Replace {
            url.set_query(None);
        }

        if parameters.is_empty() {
            return;
        }

        let mut pairs = url.query_pairs_mut();
        for (key, value) in parameters.stringified() {
            pairs.append_pair(key, &value);
        }
    }
}

/// Composes a request for `endpoint` with the default [`Composer`].
///
/// # Errors
///
/// See [`Composer::compose`].
pub fn compose<T>(endpoint: &T) -> Result<ComposedRequest, CompositionError>
where
    T: Endpoint + ?Sized,
{
    Composer::default().compose(endpoint)
}

fn join_url(base: &str, path: &str) -> Result<Url, CompositionError> {
    let mut url = Url::parse(base)?;

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Ok(url);
    }

    url.path_segments_mut()
        .map_err(|_| CompositionError::UnsupportedBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

fn encode_json(body: &EncodableBody) -> Result<Bytes, CompositionError> {
    body.encode().map(Bytes::from).map_err(|e| {
        tracing::warn!(
            error = %e,
            body_type = body.type_name(),
            "Failed to encode request body"
        );
        CompositionError::Encode(e)
    })
}

fn form_body(parameters: &Parameters) -> Bytes {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in parameters.stringified() {
        serializer.append_pair(key, &value);
    }
    Bytes::from(serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use crate::target::{HttpMethod, Target};
    use serde::{Deserialize, Serialize, Serializer};

    const BASE: &str = "https://api.test.com";

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct Login {
        user: String,
        remember: bool,
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("value cannot be encoded"))
        }
    }

    fn target(task: Task) -> Target {
        Target::new(BASE, HttpMethod::Post, "/test").with_task(task)
    }

    #[test]
    fn test_plain_request() {
        let request = compose(&Target::new(BASE, HttpMethod::Get, "/test")).unwrap();

        assert_eq!(request.url.as_str(), "https://api.test.com/test");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.header("content-type"), Some(CONTENT_TYPE_JSON));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_path_joining() {
        let cases = [
            ("https://api.test.com", "", "https://api.test.com/"),
            ("https://api.test.com", "/test", "https://api.test.com/test"),
            ("https://api.test.com/", "test/", "https://api.test.com/test"),
            ("https://api.test.com/v1", "/users/7", "https://api.test.com/v1/users/7"),
            ("https://api.test.com/v1/", "users", "https://api.test.com/v1/users"),
            ("https://api.test.com:8443", "/a b", "https://api.test.com:8443/a%20b"),
        ];

        for (base, path, expected) in cases {
            let request = compose(&Target::new(base, HttpMethod::Get, path)).unwrap();
            assert_eq!(request.url.as_str(), expected, "base {:?} path {:?}", base, path);
        }
    }

    #[test]
    fn test_invalid_base_url() {
        let result = compose(&Target::new("not a url", HttpMethod::Get, "/test"));
        assert!(matches!(result, Err(CompositionError::InvalidUrl(_))));

        let result = compose(&Target::new("mailto:someone@test.com", HttpMethod::Get, "/test"));
        assert!(matches!(result, Err(CompositionError::UnsupportedBaseUrl(_))));
    }

    #[test]
    fn test_existing_content_type_is_kept() {
        let target = Target::new(BASE, HttpMethod::Get, "/test")
            .with_header("Content-Type", "text/plain")
            .unwrap();
        let request = compose(&target).unwrap();
        assert_eq!(request.header("content-type"), Some("text/plain"));
        assert_eq!(request.headers.get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn test_descriptor_headers_are_forwarded() {
        let target = Target::new(BASE, HttpMethod::Get, "/test")
            .with_header("Header", "Value")
            .unwrap();
        let request = compose(&target).unwrap();
        assert_eq!(request.header("header"), Some("Value"));
    }

    #[test]
    fn test_json_body_round_trip() {
        let login = Login {
            user: "ana".to_string(),
            remember: true,
        };
        let request = compose(&target(Task::json(login.clone()))).unwrap();

        let body = request.body.clone().expect("json body");
        let decoded: Login = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded, login);
        assert_eq!(request.header("content-type"), Some(CONTENT_TYPE_JSON));
    }

    #[test]
    fn test_encode_failure_aborts_composition() {
        let result = compose(&target(Task::json(Unencodable)));
        assert!(matches!(result, Err(CompositionError::Encode(_))));

        let result = compose(&target(Task::json_with_query(
            Unencodable,
            Parameters::new().with("a", 1),
        )));
        assert!(matches!(result, Err(CompositionError::Encode(_))));
    }

    #[test]
    fn test_query_replaces_existing_query() {
        let target = Target::new("https://api.test.com/test?b=2", HttpMethod::Get, "")
            .with_task(Task::query(Parameters::new().with("a", "1")));
        let request = compose(&target).unwrap();

        assert_eq!(request.url.query(), Some("a=1"));
        assert!(request.url.query_pairs().all(|(k, _)| k != "b"));
        assert!(request.body.is_none());
        assert_eq!(request.header("content-type"), Some(CONTENT_TYPE_JSON));
    }

    #[test]
    fn test_query_merge_policy_keeps_existing_pairs() {
        let target = Target::new("https://api.test.com/test?b=2", HttpMethod::Get, "")
            .with_task(Task::query(Parameters::new().with("a", "1")));
        let request = Composer::new()
            .with_query_policy(QueryPolicy::Merge)
            .compose(&target)
            .unwrap();

        assert_eq!(request.url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_empty_query_replace_drops_query() {
        let target = Target::new("https://api.test.com/test?b=2", HttpMethod::Get, "")
            .with_task(Task::query(Parameters::new()));
        let request = compose(&target).unwrap();
        assert_eq!(request.url.query(), None);
        assert_eq!(request.url.as_str(), "https://api.test.com/test");
    }

    #[test]
    fn test_query_stringifies_values_in_order() {
        let params = Parameters::new()
            .with("page", 2)
            .with("ratio", 0.5)
            .with("active", true)
            .with("cursor", ParamValue::Null)
            .with("q", "a&b c");
        let request = compose(&Target::new(BASE, HttpMethod::Get, "/search").with_task(Task::query(params))).unwrap();

        assert_eq!(
            request.url.query(),
            Some("page=2&ratio=0.5&active=true&cursor=null&q=a%26b+c")
        );
    }

    #[test]
    fn test_form_body() {
        let params = Parameters::new()
            .with("user name", "ana maria")
            .with("token", "a=b&c")
            .with("n", 3);
        let request = compose(&target(Task::form(params))).unwrap();

        assert_eq!(request.header("content-type"), Some(CONTENT_TYPE_FORM));
        assert_eq!(
            request.body_text().as_deref(),
            Some("user+name=ana+maria&token=a%3Db%26c&n=3")
        );
        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn test_form_overrides_descriptor_content_type() {
        let target = target(Task::form(Parameters::new().with("a", 1)))
            .with_header("Content-Type", "text/plain")
            .unwrap();
        let request = compose(&target).unwrap();
        assert_eq!(request.header("content-type"), Some(CONTENT_TYPE_FORM));
    }

    #[test]
    fn test_json_with_query() {
        let login = Login {
            user: "ana".to_string(),
            remember: false,
        };
        let target = Target::new("https://api.test.com/test?stale=1", HttpMethod::Put, "")
            .with_header("Content-Type", "text/plain")
            .unwrap()
            .with_task(Task::json_with_query(
                login.clone(),
                Parameters::new().with("token", "abc").with("page", 3),
            ));
        let request = compose(&target).unwrap();

        assert_eq!(request.url.query(), Some("token=abc&page=3"));
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.header("content-type"), Some(CONTENT_TYPE_JSON));
        let decoded: Login = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(decoded, login);
    }

    #[test]
    fn test_parameters_with_query() {
        let body = Parameters::new().with("name", "ana").with("age", 30);
        let request = compose(&target(Task::parameters_with_query(
            body,
            Some(Parameters::new().with("v", 2)),
        )))
        .unwrap();

        assert_eq!(request.url.query(), Some("v=2"));
        assert_eq!(request.body_text().as_deref(), Some(r#"{"name":"ana","age":30}"#));

        let request = compose(&target(Task::parameters_with_query(
            Parameters::new().with("a", true),
            None,
        )))
        .unwrap();
        assert_eq!(request.url.query(), None);
        assert_eq!(request.body_text().as_deref(), Some(r#"{"a":true}"#));
    }

    #[test]
    fn test_into_http_request() {
        let request = compose(&target(Task::json(serde_json::json!({"k": "v"})))).unwrap();
        let http_request: http::Request<Bytes> = request.try_into().unwrap();

        assert_eq!(http_request.method(), &Method::POST);
        assert_eq!(http_request.uri(), "https://api.test.com/test");
        assert_eq!(&http_request.body()[..], br#"{"k":"v"}"#);
        assert_eq!(
            http_request.headers().get(CONTENT_TYPE).unwrap(),
            CONTENT_TYPE_JSON
        );
    }

    #[test]
    fn test_composition_is_deterministic() {
        let target = target(Task::json_with_query(
            serde_json::json!({"b": 1}),
            Parameters::new().with("x", "y"),
        ));
        let first = compose(&target).unwrap();
        let second = compose(&target).unwrap();

        assert_eq!(first.url, second.url);
        assert_eq!(first.headers, second.headers);
        assert_eq!(first.body, second.body);
    }
}
