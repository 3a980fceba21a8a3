//! Confirmation collaborator for destructive bulk operations

use std::io::{self, BufRead, Write};

use eyre::{Context, Result};
use tracing::debug;

/// Yes/no prompt asked before bulk clears
///
/// An `Err` is treated by callers as "no".
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> Result<bool>;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> Result<bool> + Send + Sync,
{
    fn confirm(&self, message: &str) -> Result<bool> {
        self(message)
    }
}

/// Always gives the same answer (`--yes`, tests, non-interactive use)
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, message: &str) -> Result<bool> {
        debug!(%message, answer = self.0, "AutoConfirm::confirm: called");
        Ok(self.0)
    }
}

/// Asks on the terminal, defaulting to no
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, message: &str) -> Result<bool> {
        debug!(%message, "TerminalConfirm::confirm: called");
        let mut stdout = io::stdout();
        write!(stdout, "{} [y/N] ", message).context("Failed to write prompt")?;
        stdout.flush().context("Failed to flush prompt")?;

        let mut answer = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("Failed to read answer")?;
        if read == 0 {
            debug!("TerminalConfirm::confirm: EOF, treating as no");
            return Ok(false);
        }
        Ok(parse_answer(&answer))
    }
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
