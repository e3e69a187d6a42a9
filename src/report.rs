//! Reporting interface injected into the conversion pipeline.
//!
//! The orchestrator and batch coordinator never print or log on their own;
//! they talk to a [`Reporter`], so the CLI can style output for a terminal
//! and tests can capture outcomes without global state.

use std::sync::Mutex;

use console::style;

pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    /// Diagnostic chatter; implementations may drop it.
    fn verbose(&self, message: &str) {
        let _ = message;
    }
}

/// Terminal reporter used by the CLI.
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warn(&self, message: &str) {
        println!("{} {}", style("[WARNING]").yellow().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", style("[ERROR]").red().bold(), message);
    }

    fn verbose(&self, message: &str) {
        if self.verbose {
            println!("{} {}", style("[VERBOSE]").dim(), message);
        }
    }
}

/// Discards everything. For library callers that want silence.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Severity tag for captured entries.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Verbose,
}

/// Collects every reported message; lets tests assert on pipeline outcomes.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<(Level, String)>>,
}

#[allow(dead_code)]
impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }

    fn verbose(&self, message: &str) {
        self.push(Level::Verbose, message);
    }
}
