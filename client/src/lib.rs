//! Client for the external Scribe completion engine.
//!
//! The engine ships as a platform-specific executable and speaks a
//! correlation-free, newline-delimited JSON protocol over its stdio. This
//! crate keeps one such process alive and usable:
//!
//! - [`binary`] locates the newest installed engine binary for the host
//!   platform and architecture;
//! - [`Supervisor`] owns the child process, detects death, and restarts it
//!   with a bounded budget and fixed cool-down;
//! - [`RequestChannel`] turns one written request line plus "the next line
//!   on stdout" into a single awaitable call with timeout, cancellation,
//!   and crash semantics;
//! - [`StatusCell`] exposes the latest lifecycle state to observers.

pub mod binary;
pub mod channel;
pub mod codec;
pub mod error;
pub mod status;
pub mod supervisor;

pub(crate) mod protocol;

pub use channel::RequestChannel;
pub use error::{Error, Result};
pub use status::{StatusCell, StatusReport};
pub use supervisor::{RestartPolicy, Supervisor, SupervisorConfig, report_and_exit};
