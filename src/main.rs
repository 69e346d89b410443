//! # driftmark CLI
//!
//! Tracks per-module content fingerprints across a monorepo dependency
//! graph and diffs them against named markers.
//!
//! ## Commands
//!
//! - **mark**: save the selected modules' fingerprints under one or more
//!   markers
//! - **info**: report which modules changed since a marker was last set,
//!   grouped by reason
//! - **clear**: remove selected modules' records from a marker
//!
//! ## Quick start
//!
//! ```bash
//! # After a successful build:
//! driftmark mark -k build
//!
//! # Before the next build, see what needs rebuilding:
//! driftmark info -k build
//! ```
//!
//! ## Environment variables
//!
//! - `DRIFTMARK_ROOT`: repository root (default: current directory)
//! - `DRIFTMARK_MANIFEST_PATH`: custom manifest location
//! - `DRIFTMARK_STORE_PATH`: custom fingerprint store location
//! - `DRIFTMARK_VERBOSE`: enable verbose output
//! - `DRIFTMARK_QUIET`: silence all output except errors

use std::io::IsTerminal;

use driftmark::cli::Cli;

fn main() -> miette::Result<()> {
    // Install miette's fancy panic and error report handler
    miette::set_panic_hook();

    // Pick a report handler based on terminal capabilities so errors render
    // well both interactively and in CI logs.
    if std::io::stderr().is_terminal() {
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::unicode_nocolor())
                    .with_context_lines(3),
            )
        }))?;
    } else {
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::none())
                    .with_context_lines(0),
            )
        }))?;
    }

    let cli = Cli::parse_args();

    let result = driftmark::commands::execute(&cli);

    result.map_err(Into::into)
}
