//! Deterministic test support for the Inkwire client runtime.
//!
//! The production transport is already an abstract boundary, so tests get
//! determinism from plain in-memory channels: [`loopback`] builds a
//! transport/endpoint pair, and [`ScriptedServer`] drives the server side at
//! the action level.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod loopback;
mod server;

pub use loopback::{FailingProvider, LoopbackProvider, LoopbackTransport, ServerEndpoint, loopback};
pub use server::ScriptedServer;
