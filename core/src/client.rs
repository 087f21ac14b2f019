//! Request builder, response normalizer and failure fan-out for JSON APIs.
//!
//! # Design
//! `ApiClient` holds its configuration and an append-only list of failure
//! observers. A call is split the way the host-does-IO pattern wants it:
//! `build_request` turns `RequestOptions` into an `HttpRequest`,
//! a `Transport` executes it, and `parse_response` turns the `HttpResponse`
//! into a `ResponseEnvelope`. `request` composes the three and never fails:
//! anything that goes wrong becomes an envelope carrying the configured
//! failure message.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::ApiClientConfig;
use crate::envelope::{Message, ResponseEnvelope};
use crate::error::ApiError;
use crate::http::{CredentialsMode, HttpBody, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
use crate::query::Parameters;
use crate::transport::Transport;

/// Observer invoked with the message list of every unsuccessful call.
pub type FailureCallback = Arc<dyn Fn(&[Message]) -> anyhow::Result<()> + Send + Sync>;

/// Per-call options for `ApiClient::request`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    /// Appended verbatim to the client's base URL.
    pub endpoint: String,
    /// Overrides the client default for this call only.
    pub credentials_mode: Option<CredentialsMode>,
    pub headers: Vec<(String, String)>,
    pub parameters: Parameters,
    /// Ignored unless the method is POST, PUT or PATCH.
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint)
    }

    pub fn head(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint).method(HttpMethod::Head)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint).method(HttpMethod::Post)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint).method(HttpMethod::Put)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint).method(HttpMethod::Patch)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint).method(HttpMethod::Delete)
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn credentials(mut self, mode: CredentialsMode) -> Self {
        self.credentials_mode = Some(mode);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn parameters(mut self, parameters: impl Into<Parameters>) -> Self {
        self.parameters = parameters.into();
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }
}

/// Client for one JSON API rooted at a base URL.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    failure_callbacks: Vec<FailureCallback>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("failure_callbacks", &self.failure_callbacks.len())
            .finish()
    }
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Self {
        Self {
            config,
            failure_callbacks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Register an observer for failed calls. Observers run in registration
    /// order; there is no removal.
    pub fn add_failure_response_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&[Message]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.failure_callbacks.push(Arc::new(callback));
        self
    }

    /// Owned variant of `add_failure_response_callback` for fluent setup.
    pub fn with_failure_response_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[Message]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_failure_response_callback(callback);
        self
    }

    /// Full URL for an endpoint plus optional query string.
    pub fn url_for(&self, endpoint: &str, parameters: &Parameters) -> String {
        let mut url = format!("{}{}", self.config.base_url, endpoint);
        let query = parameters.to_query_string();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    /// Build the outbound request without performing any I/O.
    ///
    /// Non-GET requests without a multipart body get a
    /// `Content-Type: application/json` header. Bodies are only attached for
    /// POST, PUT and PATCH; a missing JSON body is sent as `{}`.
    pub fn build_request(&self, options: &RequestOptions) -> Result<HttpRequest, ApiError> {
        let url = self.url_for(&options.endpoint, &options.parameters);
        let credentials = options.credentials_mode.unwrap_or(self.config.default_credentials_mode);

        let is_multipart = matches!(options.body, Some(RequestBody::Multipart(_)));
        let mut headers = options.headers.clone();
        if options.method != HttpMethod::Get && !is_multipart {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        let body = if options.method.accepts_body() {
            match &options.body {
                Some(RequestBody::Multipart(form)) => Some(HttpBody::Multipart(form.clone())),
                Some(RequestBody::Json(value)) => Some(HttpBody::Json(
                    serde_json::to_string(value).map_err(|e| ApiError::SerializationError(e.to_string()))?,
                )),
                None => Some(HttpBody::Json("{}".to_string())),
            }
        } else {
            None
        };

        Ok(HttpRequest {
            method: options.method,
            url,
            credentials,
            headers,
            body,
        })
    }

    /// Parse a response body into an envelope. The HTTP status is not
    /// consulted; the envelope itself carries the outcome.
    pub fn parse_response(&self, response: HttpResponse) -> Result<ResponseEnvelope, ApiError> {
        let value: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        ResponseEnvelope::from_value(value)
    }

    /// Perform a call. Never fails: transport and parse errors produce an
    /// envelope holding only the configured failure message. Failure
    /// observers run whenever the returned envelope is unsuccessful.
    pub fn request(&self, transport: &dyn Transport, options: &RequestOptions) -> ResponseEnvelope {
        match self.try_request(transport, options) {
            Ok(response) => {
                if !response.success() {
                    self.execute_failure_callbacks(response.messages());
                }
                response
            }
            Err(e) => {
                let response = ResponseEnvelope::new().with_message(self.config.failure_message.clone());
                self.execute_failure_callbacks(response.messages());
                error!(api = %self.config.name, error = %e, "An error occured");
                response
            }
        }
    }

    fn try_request(&self, transport: &dyn Transport, options: &RequestOptions) -> Result<ResponseEnvelope, ApiError> {
        let request = self.build_request(options)?;
        debug!(api = %self.config.name, method = %request.method, url = %request.url, "request");
        let response = transport.send(request)?;
        self.parse_response(response)
    }

    /// Run every observer in order. An observer that errors or panics is
    /// logged and skipped; the rest still run.
    fn execute_failure_callbacks(&self, messages: &[Message]) {
        for callback in &self.failure_callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(messages))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(api = %self.config.name, error = %e, "Error executing failure callback");
                }
                Err(panic) => {
                    error!(
                        api = %self.config.name,
                        error = panic_message(panic.as_ref()),
                        "Error executing failure callback"
                    );
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "panic"
    }
}
