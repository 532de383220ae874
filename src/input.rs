//! Reading expression lines from standard input.

use crate::config::{Config, OversizePolicy};
use crate::error::{EvalError, Result};
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, IsTerminal};
use tracing::warn;

pub const PROMPT: &str = "Enter problem: ";

/// Apply the configured input bound to `line`.
pub fn enforce_limit(mut line: String, config: &Config) -> Result<String> {
    let limit = config.max_input;
    if line.len() <= limit {
        return Ok(line);
    }
    match config.oversize {
        OversizePolicy::Reject => Err(EvalError::InputTooLong {
            len: line.len(),
            limit,
        }),
        OversizePolicy::Truncate => {
            let mut end = limit;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            warn!(len = line.len(), limit, "input truncated");
            line.truncate(end);
            Ok(line)
        }
    }
}

/// Where lines come from: an interactive terminal with line editing, or a
/// plain stream.
pub enum LineSource {
    Terminal(DefaultEditor),
    Stream(Box<dyn BufRead>),
}

impl LineSource {
    /// Use `rustyline` when stdin is a terminal, plain reads otherwise.
    pub fn stdin() -> anyhow::Result<Self> {
        if std::io::stdin().is_terminal() {
            let editor = DefaultEditor::new().context("failed to set up line editor")?;
            Ok(LineSource::Terminal(editor))
        } else {
            Ok(LineSource::Stream(Box::new(std::io::stdin().lock())))
        }
    }

    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        LineSource::Stream(Box::new(reader))
    }

    /// Next line without its line break, or `None` at end of input.
    pub fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        match self {
            LineSource::Terminal(editor) => match editor.readline(PROMPT) {
                Ok(line) => {
                    editor.add_history_entry(line.as_str())?;
                    Ok(Some(line))
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
                Err(err) => Err(err).context("failed to read expression"),
            },
            LineSource::Stream(reader) => {
                let mut line = String::new();
                if reader
                    .read_line(&mut line)
                    .context("failed to read expression")?
                    == 0
                {
                    return Ok(None);
                }
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);
                Ok(Some(line))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config(max_input: usize, oversize: OversizePolicy) -> Config {
        Config {
            max_input,
            oversize,
            ..Config::default()
        }
    }

    #[test]
    fn test_short_input_passes() {
        let cfg = config(10, OversizePolicy::Reject);
        assert_eq!(enforce_limit("1 + 2".into(), &cfg).unwrap(), "1 + 2");
        assert_eq!(enforce_limit("1234567890".into(), &cfg).unwrap(), "1234567890");
    }

    #[test]
    fn test_long_input_rejected() {
        let cfg = config(5, OversizePolicy::Reject);
        assert!(matches!(
            enforce_limit("1 + 2 + 3".into(), &cfg),
            Err(EvalError::InputTooLong { len: 9, limit: 5 })
        ));
    }

    #[test]
    fn test_long_input_truncated() {
        let cfg = config(5, OversizePolicy::Truncate);
        assert_eq!(enforce_limit("1 + 2 + 3".into(), &cfg).unwrap(), "1 + 2");
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let cfg = config(2, OversizePolicy::Truncate);
        // 'é' is two bytes, starting at byte 1
        assert_eq!(enforce_limit("1é3".into(), &cfg).unwrap(), "1");
    }

    #[test]
    fn test_stream_lines() {
        let mut source = LineSource::from_reader(Cursor::new("3 + 4\r\n42\nlast"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("3 + 4"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("42"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("last"));
        assert_eq!(source.next_line().unwrap(), None);
    }
}
