//! Endpoint adapter that always answers with a well-formed envelope.
//!
//! # Design
//! An `ApiEndpoint` terminates an axum route. For every request it starts
//! from status 200 and a fresh `ResponseEnvelope`, lets the configured
//! handler fill the envelope in, and derives the status from the outcome:
//! an unsuccessful envelope with a non-error status becomes a 400. A handler
//! error discards whatever the handler wrote into the envelope and answers
//! with a single `UNKNOWN_ERROR` message instead (status 500 unless the
//! handler already chose an error status). A panicking handler is treated
//! the same as a failing one. Nothing a handler does can make
//! the endpoint answer with anything but a JSON envelope.
//!
//! The handler slot is shared between clones, so a route can be registered
//! first and wired to its handler later with `set_callback`.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{self, MethodFilter, MethodRouter};
use envelope_core::{Message, ResponseEnvelope};
use futures::FutureExt;
use tracing::{debug, error};

use crate::context::{RequestContext, ResponseSink};

pub const DEFAULT_ENDPOINT_NAME: &str = "APIEndpoint";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Message used when an endpoint has no handler yet.
pub fn not_implemented_message() -> Message {
    Message::with_text("NOT_IMPLEMENTED", "This endpoint is not implemented yet.")
}

/// Message sent in place of whatever a failing handler produced.
pub fn unknown_error_message() -> Message {
    Message::with_text("UNKNOWN_ERROR", "An unknown error occured.")
}

/// Populates an envelope for one request.
///
/// The handler may also set a status directly on the sink; an error status
/// it sets survives a later handler failure.
#[async_trait]
pub trait EndpointHandler: Send + Sync {
    async fn handle(
        &self,
        request: &RequestContext,
        sink: &mut ResponseSink,
        response: &mut ResponseEnvelope,
    ) -> anyhow::Result<()>;
}

/// Adapts a closure returning a boxed future into an `EndpointHandler`.
struct FnHandler<F>(F);

#[async_trait]
impl<F> EndpointHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a RequestContext, &'a mut ResponseSink, &'a mut ResponseEnvelope) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync,
{
    async fn handle(
        &self,
        request: &RequestContext,
        sink: &mut ResponseSink,
        response: &mut ResponseEnvelope,
    ) -> anyhow::Result<()> {
        (self.0)(request, sink, response).await
    }
}

/// Route terminator producing envelope responses.
#[derive(Clone)]
pub struct ApiEndpoint {
    name: Arc<str>,
    handler: Arc<RwLock<Option<Arc<dyn EndpointHandler>>>>,
}

impl fmt::Debug for ApiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiEndpoint")
            .field("name", &self.name)
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

impl Default for ApiEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiEndpoint {
    /// An endpoint without a handler; it answers `NOT_IMPLEMENTED` until one
    /// is set.
    pub fn new() -> Self {
        Self {
            name: Arc::from(DEFAULT_ENDPOINT_NAME),
            handler: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_handler(handler: impl EndpointHandler + 'static) -> Self {
        let endpoint = Self::new();
        endpoint.set_callback(handler);
        endpoint
    }

    /// Build an endpoint from a closure:
    ///
    /// ```ignore
    /// let endpoint = ApiEndpoint::from_fn(|_request, _sink, response| {
    ///     Box::pin(async move {
    ///         response.set_success();
    ///         Ok(())
    ///     })
    /// });
    /// ```
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&'a RequestContext, &'a mut ResponseSink, &'a mut ResponseEnvelope) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Self::with_handler(FnHandler(handler))
    }

    /// Name used to tag log events.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the handler. Every clone of this endpoint, including ones
    /// already installed in a router, picks up the new handler.
    pub fn set_callback(&self, handler: impl EndpointHandler + 'static) {
        let mut slot = self.handler.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(handler));
    }

    pub fn set_callback_fn<F>(&self, handler: F)
    where
        F: for<'a> Fn(&'a RequestContext, &'a mut ResponseSink, &'a mut ResponseEnvelope) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.set_callback(FnHandler(handler));
    }

    pub fn has_handler(&self) -> bool {
        self.current_handler().is_some()
    }

    fn current_handler(&self) -> Option<Arc<dyn EndpointHandler>> {
        self.handler.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Run the endpoint for one request, writing status and envelope into
    /// `sink`. Never fails.
    pub async fn execute(&self, request: &RequestContext, sink: &mut ResponseSink) {
        sink.set_status(StatusCode::OK);
        match self.run(request, sink).await {
            Ok(response) => {
                if !response.success() && sink.is_below_error() {
                    sink.set_status(StatusCode::BAD_REQUEST);
                }
                debug!(endpoint = %self.name, status = %sink.status(), success = response.success(), "responded");
                sink.write_envelope(&response);
            }
            Err(e) => self.write_failure(sink, &e),
        }
    }

    async fn run(&self, request: &RequestContext, sink: &mut ResponseSink) -> anyhow::Result<ResponseEnvelope> {
        let mut response = ResponseEnvelope::new();
        match self.current_handler() {
            Some(handler) => {
                AssertUnwindSafe(handler.handle(request, sink, &mut response))
                    .catch_unwind()
                    .await
                    .map_err(|panic| anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref())))??;
            }
            None => {
                response.add_message(not_implemented_message());
            }
        }
        Ok(response)
    }

    fn write_failure(&self, sink: &mut ResponseSink, e: &dyn fmt::Display) {
        error!(endpoint = %self.name, error = %e, "An error occured");
        if sink.is_below_error() {
            sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
        sink.write_envelope(&ResponseEnvelope::new().with_message(unknown_error_message()));
    }

    /// Buffer an axum request, execute, and convert the sink to a response.
    pub async fn respond(&self, request: Request) -> Response {
        let mut sink = ResponseSink::new();
        match RequestContext::from_request(request).await {
            Ok(context) => self.execute(&context, &mut sink).await,
            Err(e) => self.write_failure(&mut sink, &e),
        }
        sink.into_response()
    }

    /// A method router sending matching requests to this endpoint.
    pub fn on<S>(&self, filter: MethodFilter) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let endpoint = self.clone();
        routing::on(filter, move |request: Request| async move { endpoint.respond(request).await })
    }

    /// A method router sending every method to this endpoint.
    pub fn any<S>(&self) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let endpoint = self.clone();
        routing::any(move |request: Request| async move { endpoint.respond(request).await })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "panic"
    }
}
