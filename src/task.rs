//! Body and parameter strategies for a request.

use crate::params::Parameters;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

type EncodeFn = dyn Fn() -> serde_json::Result<Vec<u8>> + Send + Sync;

/// A value that will be encoded as a JSON request body.
///
/// The value is captured when the body is created but only encoded when the
/// request is composed, so an unencodable value surfaces as a composition
/// error rather than at construction.
///
/// # Examples
///
/// ```
/// use flowline::task::EncodableBody;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Login { user: String }
///
/// let body = EncodableBody::new(Login { user: "ana".to_string() });
/// assert_eq!(body.encode().unwrap(), br#"{"user":"ana"}"#);
/// ```
#[derive(Clone)]
pub struct EncodableBody {
    type_name: &'static str,
    encode: Arc<EncodeFn>,
}

impl EncodableBody {
    /// Captures `value` for later JSON encoding.
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            encode: Arc::new(move || serde_json::to_vec(&value)),
        }
    }

    /// Encodes the captured value as JSON bytes.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        (self.encode)()
    }

    /// The Rust type name of the captured value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for EncodableBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodableBody")
            .field("type", &self.type_name)
            .finish()
    }
}

/// How [`Task::Parameters`] places its pairs on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterEncoding {
    /// Pairs become the URL query string.
    Query,
    /// Pairs become an `application/x-www-form-urlencoded` body.
    FormUrlEncoded,
}

/// Describes how the body and query string of a request are populated.
#[derive(Debug, Clone, Default)]
pub enum Task {
    /// No body and no parameters.
    #[default]
    Plain,

    /// A JSON body.
    Json(EncodableBody),

    /// Key/value parameters placed according to `encoding`.
    Parameters {
        /// The parameters to write.
        parameters: Parameters,
        /// Where to write them.
        encoding: ParameterEncoding,
    },

    /// Query parameters plus a separate JSON body.
    ///
    /// The query is applied first; the body always goes out as
    /// `application/json`.
    JsonWithQuery {
        /// The JSON body.
        body: EncodableBody,
        /// Parameters for the query string.
        query: Parameters,
    },
}

impl Task {
    /// A JSON body built from any serializable value.
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Task::Json(EncodableBody::new(value))
    }

    /// Parameters written to the URL query string.
    pub fn query(parameters: Parameters) -> Self {
        Task::Parameters {
            parameters,
            encoding: ParameterEncoding::Query,
        }
    }

    /// Parameters written as a form-urlencoded body.
    pub fn form(parameters: Parameters) -> Self {
        Task::Parameters {
            parameters,
            encoding: ParameterEncoding::FormUrlEncoded,
        }
    }

    /// A JSON body from any serializable value, plus query parameters.
    pub fn json_with_query<T>(body: T, query: Parameters) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Task::JsonWithQuery {
            body: EncodableBody::new(body),
            query,
        }
    }

    /// A JSON object body built from `body`, plus optional query parameters.
    pub fn parameters_with_query(body: Parameters, query: Option<Parameters>) -> Self {
        Task::JsonWithQuery {
            body: EncodableBody::new(body),
            query: query.unwrap_or_default(),
        }
    }
}
