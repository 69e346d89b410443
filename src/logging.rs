use std::fmt::Display;

/// Writes command output to stderr, gated by an effective verbosity level.
///
/// `--quiet` drops everything; each `-v` unlocks one more level of detail.
/// Stdout stays reserved for machine-readable data.
#[derive(Clone, Copy, Debug)]
pub struct Logger {
    threshold: u8,
}

impl Logger {
    /// Derives the effective verbosity from the global CLI flags.
    pub fn new(verbose: u8, quiet: bool) -> Self {
        let threshold = if quiet { 0 } else { verbose.saturating_add(1) };
        Self { threshold }
    }

    /// Command summary output; shown unless `--quiet`.
    pub fn info(&self, message: impl Display) {
        if self.enabled(1) {
            eprintln!("{message}");
        }
    }

    /// Detail output; shown when at least `level` `-v` flags were given.
    pub fn verbose(&self, level: u8, message: impl Display) {
        if self.enabled(level.saturating_add(1)) {
            eprintln!("{message}");
        }
    }

    fn enabled(&self, level: u8) -> bool {
        self.threshold >= level
    }
}
