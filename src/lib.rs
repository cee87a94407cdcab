//! # Flowline - a typed request/response pipeline over HTTP
//!
//! Flowline turns declarative endpoint descriptions into HTTP requests and
//! resolves every response into one closed set of outcomes. It is built on
//! top of `reqwest`, but the transport is a trait, so tests and alternative
//! backends plug in without touching application code.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flowline::{Client, Endpoint, HttpMethod, Json, Outcome, Task};
//! use flowline::params::Parameters;
//! use serde::Deserialize;
//!
//! enum Api {
//!     User(u64),
//!     Search(String),
//! }
//!
//! impl Endpoint for Api {
//!     fn base_url(&self) -> &str {
//!         "https://api.example.com"
//!     }
//!
//!     fn path(&self) -> String {
//!         match self {
//!             Api::User(id) => format!("/users/{}", id),
//!             Api::Search(_) => "/search".to_string(),
//!         }
//!     }
//!
//!     fn method(&self) -> HttpMethod {
//!         HttpMethod::Get
//!     }
//!
//!     fn task(&self) -> Task {
//!         match self {
//!             Api::User(_) => Task::Plain,
//!             Api::Search(term) => Task::query(Parameters::new().with("q", term.as_str())),
//!         }
//!     }
//! }
//!
//! #[derive(Deserialize, Debug)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[derive(Deserialize, Debug)]
//! struct ApiError {
//!     message: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder().build()?;
//!
//!     let response = client.fetch::<Json<User>, Json<ApiError>>(&Api::User(123)).await?;
//!     println!("Request took {:?}", response.latency);
//!
//!     match response.data {
//!         Outcome::Success(user) => println!("User: {}", user.name),
//!         Outcome::DomainError(error) => println!("API said no: {}", error.message),
//!         other => println!("Call failed: {}", other.kind()),
//!     }
//!
//!     // Or collapse everything into a Result.
//!     let user = client
//!         .fetch::<Json<User>, Json<ApiError>>(&Api::User(7))
//!         .await?
//!         .into_result()?;
//!     println!("User {}", user.data.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Outcomes
//!
//! A call that got as far as the transport always resolves to exactly one
//! [`Outcome`]:
//!
//! - [`Outcome::Success`] for a 2xx response that decoded,
//! - [`Outcome::DomainError`] for a non-2xx response that decoded as the error model,
//! - [`Outcome::RawError`] for a non-2xx response kept as bytes,
//! - [`Outcome::TransportFailure`] when no response arrived,
//! - [`Outcome::DecodeFailure`], [`Outcome::InvalidResponseShape`] and
//!   [`Outcome::EmptyBody`] for responses that could not be used.
//!
//! Building the request happens before that and fails with a
//! [`CompositionError`].
//!
//! ## Mapping transport failures
//!
//! Applications that want timeouts and connectivity problems to arrive as
//! their own error type register an [`ErrorMapping`], either per client or
//! process-wide:
//!
//! ```no_run
//! use flowline::{ErrorMapping, TransportFailure};
//!
//! #[derive(Debug)]
//! struct AppError {
//!     message: String,
//! }
//!
//! ErrorMapping::install(ErrorMapping::new().on_transport_failure(|kind: TransportFailure| {
//!     Some(AppError { message: kind.to_string() })
//! }))
//! .expect("mapping installed once at start-up");
//! ```
//!
//! ## Logging
//!
//! Requests and responses are logged with `tracing`: status and latency at
//! `info`, error statuses at `warn`, decode failures at `error` and full
//! request/response dumps at `debug`. Install any `tracing` subscriber to see
//! them.

mod client;
mod compose;
mod data_task;
mod decode;
mod error;
mod mapping;
mod outcome;
pub mod params;
mod resolve;
mod response;
mod target;
pub mod task;
mod transport;

pub use client::{Client, ClientBuilder, FetchResponse};
pub use compose::{
    compose, ComposedRequest, Composer, QueryPolicy, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON,
};
pub use data_task::{DataTask, TaskState};
pub use decode::{Decoder, ErrorModel, Json, Raw};
pub use error::{CompositionError, ConfigError, DecodeFailure, FlowError, TransportFailure};
pub use mapping::{ErrorMapping, MappingAlreadyInstalled};
pub use outcome::Outcome;
pub use resolve::{RawResponse, Resolver, ResponseHead};
pub use response::Response;
pub use target::{Endpoint, HttpMethod, Target};
pub use task::Task;
pub use transport::{ReqwestTransport, Timeouts, Transport};
