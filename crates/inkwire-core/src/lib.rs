//! Connection lifecycle and transport boundary for the Inkwire client.
//!
//! This crate owns everything between the wire and the action runtime: the
//! [`Transport`] boundary trait, the [`ServerConnection`] lifecycle state
//! machine, client configuration, and the connection-layer error taxonomy.
//! It performs no dispatching and knows nothing about commands or feedback;
//! those live in `inkwire-client`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod connection;
mod error;
mod transport;

pub use config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT};
pub use connection::{ClientState, ServerConnection};
pub use error::{ConnectionError, TransportError};
pub use transport::{Transport, TransportEvent, TransportProvider};
