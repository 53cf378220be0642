//! Line-oriented prompt I/O for the interactive failure modes.

use std::io::{self, BufRead, Write};

/// Where interactive prompts read from and print to.
///
/// A production console wraps stdin and stdout. Tests substitute in-memory
/// buffers so prompt-driven paths run unattended.
pub struct Console {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Console {
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self { input, output }
    }

    /// A console attached to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    /// A console that reads the given lines and discards all output.
    pub fn scripted(input: &str) -> Self {
        Self::new(
            Box::new(io::Cursor::new(input.to_owned())),
            Box::new(io::sink()),
        )
    }

    /// Reads one line, trimmed. `None` at end of input.
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_owned()),
            Err(e) => {
                tracing::error!("console read failed: {e}");
                None
            }
        }
    }

    pub fn println(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.output, "{}", text.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_lines_are_trimmed() {
        let mut console = Console::scripted("  one two  \n\nthree\n");
        assert_eq!(console.read_line().as_deref(), Some("one two"));
        assert_eq!(console.read_line().as_deref(), Some(""));
        assert_eq!(console.read_line().as_deref(), Some("three"));
        assert_eq!(console.read_line(), None);
    }
}
