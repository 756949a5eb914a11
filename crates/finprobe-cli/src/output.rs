//! Terminal styling and progress

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Writes command output to stdout, progress to stderr
#[derive(Debug)]
pub struct Printer {
    term: Term,
    quiet: bool,
}

impl Printer {
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            quiet,
        }
    }

    /// Command result; printed even when quiet
    pub fn line(&self, text: &str) -> std::io::Result<()> {
        self.term.write_line(text)
    }

    pub fn heading(&self, text: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(&style(text).bold().to_string())
    }

    pub fn success(&self, text: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term
            .write_line(&format!("{} {text}", style("✓").green().bold()))
    }

    pub fn failure(&self, text: &str) -> std::io::Result<()> {
        Term::stderr().write_line(&format!("{} {text}", style("✗").red().bold()))
    }

    /// Spinner on stderr; hidden when quiet
    #[must_use]
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}
