//! mm2nw - FreeMind to novelWriter converter

use std::process::ExitCode;

fn main() -> ExitCode {
    mm2nw::cli::run()
}
