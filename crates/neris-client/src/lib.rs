//! # neris-client
//!
//! Authenticated request gateway for the NERIS API.
//!
//! [`ApiClient::call`] makes sure the client holds a usable token (acquiring,
//! refreshing or re-acquiring it through [`neris_auth::Negotiator`]),
//! attaches it, dispatches the request and classifies the response into a
//! [`CallOutcome`]. Endpoint wrappers such as [`ApiClient::health`] sit on
//! top of it.
//!
//! # Example
//!
//! ```no_run
//! use neris_client::{ApiClient, CallOutcome};
//!
//! # async fn run() -> Result<(), neris_client::ClientError> {
//! let client = ApiClient::from_env()?;
//! match client.health().await? {
//!     CallOutcome::Success(payload) => println!("{payload:?}"),
//!     CallOutcome::Failure(failure) => eprintln!("HTTP {}", failure.status),
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod endpoints;
pub mod errors;
pub mod gateway;
pub mod response;

pub use errors::ClientError;
pub use gateway::{ApiClient, normalize_body};
pub use response::{CallOutcome, Payload, RequestBody, RequestFailure};

pub use reqwest::Method;
