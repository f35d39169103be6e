//! Interactive console input.
//!
//! The pipeline asks for free-text changelog entries and yes/no
//! confirmations; both go through the [`Prompter`] trait so tests can
//! script the answers.

use std::io::{self, BufRead as _, Read as _, Write as _};

/// Abstraction over interactive user input.
pub trait Prompter {
    /// Print `prompt` on its own line, then read free text until
    /// end-of-input. The result is trimmed.
    fn read_multiline(&mut self, prompt: &str) -> io::Result<String>;

    /// Ask a yes/no question; an answer starting with `y` (any case) is yes.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// [`Prompter`] over the process's stdin/stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn read_multiline(&mut self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{prompt}")?;
        stdout.flush()?;
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text.trim().to_string())
    }

    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt} (y/n) ")?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(is_yes(&line))
    }
}

fn is_yes(answer: &str) -> bool {
    answer.trim_start().to_lowercase().starts_with('y')
}
