//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `convert <file.mm>` | Write `<file>.nw/` next to the mindmap |
//! | `inspect <dir>` | Read a project back and show its outline |
//! | `config show\|path\|init` | Manage the settings file |
//!
//! ## Global Options
//!
//! - `--format text|json` - status line and data as plain text or JSON
//! - `--verbose` / `-v` - `[verbose:<context>]` diagnostics on stderr
//! - `--config <file>` - settings file instead of the per-user one
//!
//! A run ends with one status line. Failures print `FAIL: <message>` to
//! stderr and exit non-zero:
//! ```bash
//! $ mm2nw convert story.mm
//! File written: "story.nw/nwProject.nwx".
//! ```

mod app;
mod config_cmd;
mod convert;
mod inspect;
mod output;

pub use app::{run, Cli, Commands};
pub use convert::{convert, Conversion};
pub use output::{Output, OutputFormat};
