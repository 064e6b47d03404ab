//! Pumpkin Console Library
//!
//! Headless front end over the console engine in `pumpkin-console-app`.

pub mod headless;

// Re-export main entry points
pub use headless::runner::{run_headless, HeadlessOptions, ServerTarget};
pub use headless::OutputFormat;
