//! A module implementing lexical analysis (tokenization) for flat arithmetic expressions.
//!
//! The lexer knows nothing about the grammar: it splits the line on blanks and
//! classifies each chunk as either an integer literal or a symbol. Deciding
//! whether a symbol is a valid operator is left to the parser.

use thiserror::Error;

/// What a token is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A decimal integer literal with an optional sign, e.g. `42` or `-7`.
    Number(i64),
    /// Any other blank-delimited chunk. Operators land here, and so does garbage.
    Symbol(String),
}

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character of the token in the input line.
    pub offset: usize,
}

impl Token {
    pub fn number(value: i64, offset: usize) -> Self {
        Self {
            kind: TokenKind::Number(value),
            offset,
        }
    }

    pub fn symbol(text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: TokenKind::Symbol(text.into()),
            offset,
        }
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// The literal looks like an integer but does not fit in an `i64`.
    #[error("integer {text} at offset {offset} is out of range")]
    IntegerOutOfRange { text: String, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingToken(usize), // offset where the token began
}

struct LexingFSM<'a> {
    input: &'a str,
    state: LexingState,
}

impl<'a> LexingFSM<'a> {
    /// Creates a new instance of the lexical analysis Finite State Machine.
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line,
            state: LexingState::Start,
        }
    }

    /// Walks the input once, emitting a token every time a chunk of
    /// non-blank characters ends.
    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();
        let input = self.input;

        for (pos, ch) in input.char_indices() {
            match self.state {
                LexingState::Start => self.handle_start(pos, ch),
                LexingState::ReadingToken(start) => {
                    self.handle_token(start, pos, ch, &mut out)?
                }
            }
        }

        // Line ended in the middle of a token
        if let LexingState::ReadingToken(start) = self.state {
            out.push(classify(&input[start..], start)?);
            self.state = LexingState::Start;
        }

        Ok(out)
    }

    fn handle_start(&mut self, pos: usize, ch: char) {
        if !is_blank(ch) {
            self.state = LexingState::ReadingToken(pos);
        }
    }

    fn handle_token(
        &mut self,
        start: usize,
        pos: usize,
        ch: char,
        out: &mut Vec<Token>,
    ) -> Result<(), LexingError> {
        if is_blank(ch) {
            out.push(classify(&self.input[start..pos], start)?);
            self.state = LexingState::Start;
        }
        Ok(())
    }
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

fn classify(text: &str, offset: usize) -> Result<Token, LexingError> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(Token::symbol(text, offset));
    }
    text.parse::<i64>()
        .map(|value| Token::number(value, offset))
        .map_err(|_| LexingError::IntegerOutOfRange {
            text: text.to_string(),
            offset,
        })
}

/// The main entry point function to perform lexical analysis.
///
/// Tokens are separated by any run of spaces or tabs; a trailing line break
/// is treated as a separator too.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_tokens()
}
