//! User-facing reporting and prompting.
//!
//! Components never print directly. They receive a [`Reporter`] for progress
//! messages and a [`Confirm`] for yes/no questions, so the CLI can render to a
//! terminal while tests capture messages and script answers.

mod confirm;
mod reporter;

pub use confirm::{Confirm, FixedAnswer, ScriptedConfirm, TerminalConfirm};
pub use reporter::{ConsoleReporter, Level, MemoryReporter, Reporter};
