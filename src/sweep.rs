//! Capture process subsystem.
//!
//! Owns everything between a validated argument list and record lines in a
//! session's outbound queue: the option grammar for `hackrf_sweep`, process
//! spawning with piped stdio, and graceful-then-forced termination.
//!
//! Re-exports:
//! - [`validate_args`]: syntactic validation of client-supplied options.
//! - [`spawn_sweep`], [`terminate`]: process lifecycle.
//! - [`SweepEvent`], [`SpawnedSweep`], [`ValidationResult`]: core types.

pub mod process;
pub mod types;
pub mod validator;

pub use process::{spawn_sweep, terminate};
pub use types::{ArgumentError, SpawnedSweep, StreamExit, SweepEvent, ValidationResult};
pub use validator::validate_args;
