//! The I/O capability an `ApiClient` sends requests through.
//!
//! # Design
//! The client core never touches the network. `Transport` is the single seam
//! where a host plugs in real I/O: a closure in tests, `UreqTransport` for a
//! blocking HTTP stack, or anything else that can turn an `HttpRequest` into
//! an `HttpResponse`. Failures come back as `TransportError` and are folded
//! into an envelope by the client.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::blocking::UreqTransport;

#[cfg(feature = "ureq")]
mod blocking {
    use tracing::debug;

    use crate::error::TransportError;
    use crate::http::{HttpBody, HttpMethod, HttpRequest, HttpResponse, MultipartForm};

    use super::Transport;

    /// Blocking transport backed by a ureq agent.
    ///
    /// HTTP error statuses are returned as data rather than errors so the
    /// envelope in the body decides the outcome. The agent keeps no cookie
    /// store, so `CredentialsMode::Include` and `Omit` behave alike here.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl std::fmt::Debug for UreqTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("UreqTransport").finish_non_exhaustive()
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        pub fn with_agent(agent: ureq::Agent) -> Self {
            Self { agent }
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            debug!(method = %request.method, url = %request.url, "sending request");

            let mut headers = request.headers;
            let payload = match request.body {
                Some(HttpBody::Json(text)) => Some(text.into_bytes()),
                Some(HttpBody::Multipart(form)) => {
                    let boundary = MultipartForm::random_boundary();
                    headers.push(("Content-Type".to_string(), MultipartForm::content_type(&boundary)));
                    Some(form.encode(&boundary))
                }
                None => None,
            };

            let url = request.url.as_str();
            let result = match request.method {
                HttpMethod::Head => with_headers(self.agent.head(url), &headers).call(),
                HttpMethod::Get => with_headers(self.agent.get(url), &headers).call(),
                HttpMethod::Delete => with_headers(self.agent.delete(url), &headers).call(),
                HttpMethod::Post => send_with_body(with_headers(self.agent.post(url), &headers), payload),
                HttpMethod::Put => send_with_body(with_headers(self.agent.put(url), &headers), payload),
                HttpMethod::Patch => send_with_body(with_headers(self.agent.patch(url), &headers), payload),
            };
            let mut response = result.map_err(map_error)?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or_default().to_string()))
                .collect();
            let body = response
                .body_mut()
                .read_to_string()
                .map_err(|e| TransportError::Body(e.to_string()))?;

            Ok(HttpResponse { status, headers, body })
        }
    }

    fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn send_with_body(
        builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
        payload: Option<Vec<u8>>,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match payload {
            Some(bytes) => builder.send(&bytes[..]),
            None => builder.send_empty(),
        }
    }

    fn map_error(error: ureq::Error) -> TransportError {
        match error {
            ureq::Error::BadUri(reason) => TransportError::InvalidRequest(reason),
            ureq::Error::Http(e) => TransportError::InvalidRequest(e.to_string()),
            other => TransportError::Connection(other.to_string()),
        }
    }
}
