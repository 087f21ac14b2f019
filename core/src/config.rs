//! Construction-time settings for an `ApiClient`.

use serde::Deserialize;

use crate::envelope::Message;
use crate::http::CredentialsMode;

pub const DEFAULT_CLIENT_NAME: &str = "API";
pub const DEFAULT_FAILURE_CODE: &str = "API_ERROR";
pub const DEFAULT_FAILURE_TEXT: &str = "An error occured while contacting the API.";

/// Immutable once handed to `ApiClient::new`.
///
/// Deserializable so it can live in an application's own config file:
///
/// ```
/// let config: envelope_core::ApiClientConfig = serde_json::from_str(
///     r#"{"name": "billing", "base_url": "https://billing.test/api", "default_credentials_mode": "include"}"#,
/// )
/// .unwrap();
/// assert_eq!(config.name, "billing");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiClientConfig {
    /// Attributed on every log event the client emits.
    pub name: String,
    /// Prefix every endpoint is appended to, without a trailing `/`.
    pub base_url: String,
    pub default_credentials_mode: CredentialsMode,
    /// Returned when a request cannot be completed at all.
    pub failure_message: Message,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLIENT_NAME.to_string(),
            base_url: String::new(),
            default_credentials_mode: CredentialsMode::Omit,
            failure_message: Message::with_text(DEFAULT_FAILURE_CODE, DEFAULT_FAILURE_TEXT),
        }
    }
}

impl ApiClientConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials_mode(mut self, mode: CredentialsMode) -> Self {
        self.default_credentials_mode = mode;
        self
    }

    pub fn with_failure_message(mut self, message: Message) -> Self {
        self.failure_message = message;
        self
    }
}
