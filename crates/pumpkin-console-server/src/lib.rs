//! # pumpkin-console-server - Native Server Boundary
//!
//! Drives a Pumpkin server either as a shared library loaded at runtime or as
//! a child process.
//!
//! Depends on [`pumpkin_console_core`] for error handling.
//!
//! ## Public API
//!
//! - [`ServerBackend`] - The blocking run / fire-and-forget control surface
//! - [`LogCallback`] - Sink that receives one raw line per call, on any thread
//! - [`NativeLibrary`] - `libloading` binding to the `pumpkin_*` C exports
//! - [`ProcessServer`] - Server executable with piped stdio
//! - [`describe_exit_code()`] - Reason text for known exit codes

pub mod backend;
pub mod native;
pub mod process;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use backend::{describe_exit_code, LogCallback, ServerBackend, EXIT_OK};
pub use native::NativeLibrary;
pub use process::{ProcessServer, DEFAULT_STOP_COMMAND};
