//! Type descriptors for what a call expects back.
//!
//! A call names its success type with a [`Decoder`] and its error type with an
//! [`ErrorModel`]. [`Json<T>`] decodes either side with `serde_json`; [`Raw`]
//! keeps the success body as bytes, and on the error side means "no error
//! model", so non-2xx bodies come back untouched as
//! [`Outcome::RawError`](crate::Outcome::RawError).

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::marker::PhantomData;

/// Decodes a response body of type `T` from JSON.
pub struct Json<T>(PhantomData<fn() -> T>);

/// Leaves response bodies as raw bytes.
pub struct Raw;

/// Turns a success body into the caller's success type.
pub trait Decoder {
    /// The decoded type.
    type Output;

    /// Decodes `body`. Called at most once per response.
    fn decode(body: &Bytes) -> serde_json::Result<Self::Output>;
}

impl<T> Decoder for Json<T>
where
    T: DeserializeOwned,
{
    type Output = T;

    fn decode(body: &Bytes) -> serde_json::Result<T> {
        serde_json::from_slice(body)
    }
}

impl Decoder for Raw {
    type Output = Bytes;

    fn decode(body: &Bytes) -> serde_json::Result<Bytes> {
        Ok(body.clone())
    }
}

/// Turns a non-2xx body into the caller's structured error type.
pub trait ErrorModel {
    /// The structured error type.
    type Output: Send + 'static;

    /// Whether a structured error type was requested at all.
    ///
    /// Only structured models take part in transport failure mapping.
    const STRUCTURED: bool;

    /// Decodes `body`, or returns `None` when no structured type was requested.
    fn decode(body: &Bytes) -> Option<serde_json::Result<Self::Output>>;
}

impl<T> ErrorModel for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    const STRUCTURED: bool = true;

    fn decode(body: &Bytes) -> Option<serde_json::Result<T>> {
        Some(serde_json::from_slice(body))
    }
}

impl ErrorModel for Raw {
    type Output = Infallible;

    const STRUCTURED: bool = false;

    fn decode(_body: &Bytes) -> Option<serde_json::Result<Infallible>> {
        None
    }
}
