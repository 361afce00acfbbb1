//! Interactive path prompting.
//!
//! Used when the source or destination directory is not given on the
//! command line. Input and output are generic so the loop can be driven by
//! stdin/stdout or by in-memory buffers.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Errors returned by [`prompt_for_path`].
#[derive(Debug)]
pub enum PromptError {
    /// Reading input or writing the prompt failed.
    Io(io::Error),
    /// The input stream ended before a valid path was entered.
    InputClosed,
    /// Every allowed attempt produced an invalid path.
    AttemptsExhausted { attempts: u32 },
}

impl std::fmt::Display for PromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Could not read path from input: {}", e),
            Self::InputClosed => write!(f, "Input ended before a valid path was entered"),
            Self::AttemptsExhausted { attempts } => {
                write!(f, "No valid path entered after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for PromptError {}

impl From<io::Error> for PromptError {
    fn from(e: io::Error) -> Self {
        PromptError::Io(e)
    }
}

/// Strips surrounding whitespace and one pair of matching quotes, as left
/// behind by dragging a folder into a terminal.
///
/// # Examples
///
/// ```
/// use nfe_organizer::prompt::clean_path_input;
///
/// assert_eq!(clean_path_input("  \"/tmp/notas\"\n"), "/tmp/notas");
/// assert_eq!(clean_path_input("'C:\\XML'"), "C:\\XML");
/// assert_eq!(clean_path_input("/tmp/notas"), "/tmp/notas");
/// ```
pub fn clean_path_input(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim();
        }
    }
    trimmed
}

/// Returns the path named by `raw` if it exists on the filesystem.
pub fn validate_path_input(raw: &str) -> Option<PathBuf> {
    let cleaned = clean_path_input(raw);
    if cleaned.is_empty() {
        return None;
    }

    let path = PathBuf::from(cleaned);
    path.exists().then_some(path)
}

/// Asks for a path until an existing one is entered or `max_attempts` runs out.
///
/// # Errors
///
/// `InputClosed` when the input reaches EOF, `AttemptsExhausted` after
/// `max_attempts` invalid entries, `Io` on read/write failures.
pub fn prompt_for_path<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
    max_attempts: u32,
) -> Result<PathBuf, PromptError> {
    let mut line = String::new();

    for _ in 0..max_attempts {
        write!(output, "{}", message)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(PromptError::InputClosed);
        }

        if let Some(path) = validate_path_input(&line) {
            return Ok(path);
        }

        writeln!(output, "Invalid path. Please try again.")?;
    }

    Err(PromptError::AttemptsExhausted {
        attempts: max_attempts,
    })
}
