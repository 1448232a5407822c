//! Output abstraction for command handlers.
//!
//! Handlers write through [`Output`] so tests can capture what would be
//! printed. [`ConsoleOutput`] writes results to stdout and failures to
//! stderr, with light styling.

use std::cell::RefCell;
use std::io::{self, Write};

use console::style;

/// Destination for user-facing command output.
pub trait Output {
    /// Print a line verbatim.
    fn println(&self, message: &str);

    /// Print an empty line.
    fn newline(&self) {
        self.println("");
    }

    /// Print a line prefixed with two spaces.
    fn indented(&self, message: &str) {
        self.println(&format!("  {}", message));
    }

    /// Print a success line.
    fn success(&self, message: &str);

    /// Print a failure line.
    fn failure(&self, message: &str);
}

/// Terminal output: results on stdout, failures on stderr.
#[derive(Debug)]
pub struct ConsoleOutput<O = io::Stdout, E = io::Stderr> {
    out: RefCell<O>,
    err: RefCell<E>,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self::with_writers(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> ConsoleOutput<O, E> {
    /// Output over arbitrary writers.
    pub fn with_writers(out: O, err: E) -> Self {
        Self {
            out: RefCell::new(out),
            err: RefCell::new(err),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> (O, E) {
        (self.out.into_inner(), self.err.into_inner())
    }
}

// Write errors (closed pipes) are ignored.
impl<O: Write, E: Write> Output for ConsoleOutput<O, E> {
    fn println(&self, message: &str) {
        let _ = writeln!(self.out.borrow_mut(), "{}", message);
    }

    fn success(&self, message: &str) {
        let _ = writeln!(self.out.borrow_mut(), "{} {}", style("✓").green(), message);
    }

    fn failure(&self, message: &str) {
        let _ = writeln!(self.err.borrow_mut(), "{} {}", style("✗").red(), message);
    }
}

/// Output captured in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct BufferOutput {
    lines: RefCell<Vec<String>>,
}

#[cfg(test)]
impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn text(&self) -> String {
        self.lines.borrow().join("\n")
    }
}

#[cfg(test)]
impl Output for BufferOutput {
    fn println(&self, message: &str) {
        self.lines.borrow_mut().push(message.to_string());
    }

    fn success(&self, message: &str) {
        self.println(&format!("ok: {}", message));
    }

    fn failure(&self, message: &str) {
        self.println(&format!("failed: {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_output_captures_lines() {
        let out = BufferOutput::new();
        out.println("one");
        out.indented("two");
        out.newline();
        out.failure("three");
        assert_eq!(out.lines(), vec!["one", "  two", "", "failed: three"]);
    }

    #[test]
    fn test_console_failures_go_to_error_stream() {
        let console = ConsoleOutput::with_writers(Vec::new(), Vec::new());
        console.println("plan");
        console.success("docker");
        console.failure("kubernetes: not found");

        let (out, err) = console.into_inner();
        let out = String::from_utf8(out).unwrap();
        let err = String::from_utf8(err).unwrap();
        assert!(out.starts_with("plan\n"));
        assert!(out.contains("docker"));
        assert!(!out.contains("kubernetes"));
        assert!(err.contains("kubernetes: not found"));
    }
}
