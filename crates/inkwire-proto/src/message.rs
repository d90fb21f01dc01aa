//! Transport envelopes.
//!
//! Actions travel inside an [`ActionMessage`] notification; session setup
//! uses the [`InitializeParameters`] request. The [`method`] constants name
//! the JSON-RPC methods these map to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::Action;

/// JSON-RPC method names used by the protocol.
pub mod method {
    /// Notification carrying an [`super::ActionMessage`] in either direction.
    pub const PROCESS: &str = "process";

    /// Request initializing the server session. Returns a boolean.
    pub const INITIALIZE: &str = "initialize";

    /// Notification asking the server to shut the session down.
    pub const SHUTDOWN: &str = "shutdown";
}

/// Envelope for one action exchanged between client and server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMessage {
    /// Id of the client session this action belongs to.
    pub client_id: String,

    /// The action itself.
    pub action: Action,
}

impl ActionMessage {
    /// Wrap an action for the given client session.
    pub fn new(client_id: impl Into<String>, action: Action) -> Self {
        Self { client_id: client_id.into(), action }
    }
}

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParameters {
    /// Unique id of the client application instance.
    pub application_id: String,

    /// Server-specific launch options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

impl InitializeParameters {
    /// Create parameters with no options.
    pub fn new(application_id: impl Into<String>) -> Self {
        Self { application_id: application_id.into(), options: None }
    }

    /// Attach server-specific options.
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = Some(options);
        self
    }
}
