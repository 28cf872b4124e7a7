//! Output formatting for CLI commands
//!
//! A run prints at most one status line: the success message on stdout or
//! the `FAIL:` message on stderr. Verbose diagnostics go to stderr.

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    format: OutputFormat,
    verbose: bool,
    silent: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            silent: false,
        }
    }

    /// Returns a copy that drops success messages
    pub fn silenced(self, silent: bool) -> Self {
        Self { silent, ..self }
    }

    /// Prints a success message, unless silenced
    pub fn success(&self, message: &str) {
        if self.silent {
            return;
        }
        println!("{}", self.status_line(true, message));
    }

    /// Prints the terminal failure message of a run
    pub fn failure(&self, message: &str) {
        eprintln!("{}", self.status_line(false, message));
    }

    fn status_line(&self, success: bool, message: &str) -> String {
        match (self.format, success) {
            (OutputFormat::Text, true) => message.to_string(),
            (OutputFormat::Text, false) => format!("FAIL: {}", message),
            (OutputFormat::Json, true) => serde_json::json!({
                "success": true,
                "message": message
            })
            .to_string(),
            (OutputFormat::Json, false) => serde_json::json!({
                "success": false,
                "error": message
            })
            .to_string(),
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        let json = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        if let Ok(json) = json {
            println!("{}", json);
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}
