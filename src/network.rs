//! UDP protocol front end.
//!
//! This module owns the wire surface of the server: command parsing, the
//! response document types, and the dispatcher that multiplexes one UDP
//! socket across every client session.
//!
//! ## Architecture
//!
//! ```text
//! clients --UDP--> Dispatcher --spawn--> capture process (one per stream)
//!                     |                      | stdout lines
//!                     | owns the             v
//!                     | SessionRegistry   OutboundQueue --sender task--> client
//!                     |
//!                     +-- JSON responses -----------------------------> client
//! ```
//!
//! Re-exports:
//! - [`Dispatcher`]: the socket owner and dispatch loop.
//! - [`Command`]: parsed client commands.

pub mod command;
pub mod dispatcher;
pub mod types;

pub use command::Command;
pub use dispatcher::Dispatcher;
