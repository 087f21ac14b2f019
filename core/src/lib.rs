//! JSON envelope client core.
//!
//! # Overview
//! Every call against an envelope API returns the same shape:
//! `{ success, messages, data, info }`. This crate holds that shape
//! (`ResponseEnvelope`) and a client (`ApiClient`) that builds requests,
//! hands them to a `Transport`, and normalizes whatever comes back into an
//! envelope. Callers never see an error from `ApiClient::request`; failures
//! arrive as unsuccessful envelopes and are fanned out to registered
//! failure observers.
//!
//! # Design
//! - Host-does-IO: `build_request` and `parse_response` are pure, and the
//!   network round-trip sits behind the `Transport` trait.
//! - `UreqTransport` (default `ureq` feature) is a ready-made blocking
//!   transport; disable default features to keep the core I/O-free.
//! - Logging goes through `tracing`; the installed subscriber is the sink.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod query;
pub mod transport;

pub use client::{ApiClient, FailureCallback, RequestOptions};
pub use config::ApiClientConfig;
pub use envelope::{Message, MessageCode, ResponseEnvelope};
pub use error::{ApiError, TransportError};
pub use http::{CredentialsMode, FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
pub use query::Parameters;
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
