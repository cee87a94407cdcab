//! Ordered request parameters.
//!
//! Parameters are kept as an ordered list of `(key, value)` pairs where the
//! value is one of a small closed set of scalar kinds. This keeps the
//! stringification rule for query strings and form bodies explicit, and lets
//! the same list be serialized as a JSON object when it is used as a body.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// A single parameter value.
///
/// # Examples
///
/// ```
/// use flowline::params::ParamValue;
///
/// assert_eq!(ParamValue::from("rust").to_string(), "rust");
/// assert_eq!(ParamValue::from(42).to_string(), "42");
/// assert_eq!(ParamValue::from(1.5).to_string(), "1.5");
/// assert_eq!(ParamValue::from(true).to_string(), "true");
/// assert_eq!(ParamValue::Null.to_string(), "null");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A text value, rendered verbatim.
    String(String),
    /// An integer value.
    Int(i64),
    /// A floating point value. Whole numbers render without a fraction.
    Float(f64),
    /// A boolean, rendered as `true` or `false`.
    Bool(bool),
    /// An explicit null, rendered as `null`.
    Null,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Float(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Null => f.write_str("null"),
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ParamValue::String(s) => serializer.serialize_str(s),
            ParamValue::Int(n) => serializer.serialize_i64(*n),
            // serde_json writes non-finite floats as null
            ParamValue::Float(n) => serializer.serialize_f64(*n),
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
            ParamValue::Null => serializer.serialize_unit(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl<T> From<Option<T>> for ParamValue
where
    T: Into<ParamValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// An ordered list of request parameters.
///
/// Insertion order is preserved everywhere the parameters are written out:
/// query strings, form bodies and JSON objects.
///
/// # Examples
///
/// ```
/// use flowline::params::Parameters;
///
/// let params = Parameters::new()
///     .with("page", 2)
///     .with("sort", "name")
///     .with("desc", false);
///
/// assert_eq!(params.len(), 3);
/// assert_eq!(
///     serde_json::to_string(&params).unwrap(),
///     r#"{"page":2,"sort":"name","desc":false}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    pairs: Vec<(String, ParamValue)>,
}

impl Parameters {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter and returns the list.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Appends a parameter.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Returns the first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates over the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over the pairs with every value stringified.
    pub fn stringified(&self) -> impl Iterator<Item = (&str, String)> {
        self.iter().map(|(k, v)| (k, v.to_string()))
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for Parameters {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
