use colored::Colorize;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Progress,
    Success,
    Warning,
    Error,
}

/// Sink for user-facing status messages.
pub trait Reporter {
    fn report(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.report(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn progress(&self, message: &str) {
        self.report(Level::Progress, message);
    }

    fn success(&self, message: &str) {
        self.report(Level::Success, message);
    }

    fn warning(&self, message: &str) {
        self.report(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.report(Level::Error, message);
    }
}

/// Colored terminal output. Warnings and errors go to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    verbose: bool,
    quiet: bool,
}

impl ConsoleReporter {
    pub const fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, level: Level, message: &str) {
        tracing::debug!(target: "pget::report", ?level, "{message}");
        match level {
            Level::Debug if self.verbose => eprintln!("{}", message.dimmed()),
            Level::Debug => {}
            Level::Info if !self.quiet => println!("{message}"),
            Level::Progress if !self.quiet => println!("{} {}", "→".cyan(), message),
            Level::Success if !self.quiet => println!("{} {}", "✓".green(), message),
            Level::Info | Level::Progress | Level::Success => {}
            Level::Warning => eprintln!("{} {}", "warning:".yellow().bold(), message),
            Level::Error => eprintln!("{} {}", "error:".red().bold(), message),
        }
    }
}

/// Captures messages in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: Mutex<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// True if any message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages().iter().any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: Level, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((level, message.to_string()));
        }
    }
}
