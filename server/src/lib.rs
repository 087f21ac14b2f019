//! Server side of the JSON envelope protocol, built on axum.
//!
//! # Overview
//! `ApiEndpoint` wraps a handler so a route always answers with a
//! `ResponseEnvelope` and a status consistent with it. The `todos` module is
//! a small in-memory service assembled entirely from endpoints; the binary
//! serves it and the client integration tests run against it.

pub mod config;
pub mod context;
pub mod endpoint;
pub mod logging;
pub mod todos;

use axum::Router;
use tokio::net::TcpListener;

pub use context::{RequestContext, ResponseSink};
pub use endpoint::{not_implemented_message, unknown_error_message, ApiEndpoint, BoxFuture, EndpointHandler};
pub use todos::{Db, Todo};

/// The demo todo service on a fresh, empty store.
pub fn app() -> Router {
    todos::router(Db::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}
