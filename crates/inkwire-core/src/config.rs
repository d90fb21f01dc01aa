//! Client configuration.
//!
//! All identity and timing knobs live in an explicit [`ClientConfig`] value
//! threaded through construction. There is no process-global state: the
//! application id is generated once per config when the embedder did not
//! supply one.

use std::time::Duration;

/// Default window for correlated requests before they settle empty.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);

/// Configuration for one client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Id of this client session, carried in every action message envelope.
    pub client_id: String,

    /// Id of the client application instance, sent with `initialize`.
    /// Generated lazily when `None`.
    pub application_id: Option<String>,

    /// Timeout applied by `request_until` when the caller does not pick one.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            application_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Use a fixed application id instead of a generated one.
    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    /// The application id, generating and caching one if absent.
    pub fn ensure_application_id(&mut self) -> &str {
        if self.application_id.is_none() {
            let id: u64 = rand::random();
            self.application_id = Some(format!("{id:016x}"));
        }
        // Just populated above when absent.
        self.application_id.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_id_is_generated_once() {
        let mut config = ClientConfig::new("client-1");
        let first = config.ensure_application_id().to_string();
        let second = config.ensure_application_id().to_string();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn supplied_application_id_is_kept() {
        let mut config = ClientConfig::new("client-1").with_application_id("app-42");
        assert_eq!(config.ensure_application_id(), "app-42");
    }

    #[test]
    fn default_request_timeout_is_two_seconds() {
        let config = ClientConfig::new("client-1");
        assert_eq!(config.request_timeout, Duration::from_millis(2000));
    }
}
