//! Error types for the envelope client.
//!
//! # Design
//! None of these escape `ApiClient::request`: they are the internal reasons a
//! call fell back to the configured failure message. They are public because
//! `build_request` / `parse_response` expose the two halves of a call to
//! hosts that run their own I/O.

use thiserror::Error;

/// Why a call could not produce an envelope from the remote side.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport could not complete the round-trip.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The response body was not a JSON envelope.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

/// Failures raised by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS error and the like.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request could not be expressed on the wire (bad URL or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response arrived but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}
