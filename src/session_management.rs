//! Session management core module.
//!
//! This module provides the core types and submodules for tracking client
//! sessions on a connectionless transport: the per-endpoint session record,
//! its lifecycle state, and the registry the dispatcher drives.

/// Submodule for the endpoint-keyed session registry.
pub mod registry;
/// Submodule for session data structures.
pub mod session;

pub use registry::SessionRegistry;
pub use session::{ActiveStream, Session};

/// Lifecycle state of a session.
///
/// An endpoint with no registry entry is implicitly unconnected; only the
/// two connected states are represented.
///
/// Variants:
/// - `Connected`: the endpoint has a session but no capture stream.
/// - `Streaming`: a capture process is running for the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Streaming,
}
