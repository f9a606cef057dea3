//! Shared helpers: filesystem, platform detection, external commands, progress.

pub mod command;
pub mod fs;
pub mod platform;
pub mod progress;

pub use command::{ToolCommand, ToolOutput};
pub use platform::{Platform, find_tool};
