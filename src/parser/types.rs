//! Parser Types and Constants
//!
//! Shared types, keyword tables, and error definitions used across the
//! parser modules.

use std::collections::HashMap;

use thiserror::Error;

/// Reserved words recognized at the head of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    While,
    If,
    Do,
    Then,
    Else,
    Fi,
    Done,
}

lazy_static::lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, Keyword> = {
        let mut m = HashMap::new();
        m.insert("while", Keyword::While);
        m.insert("if", Keyword::If);
        m.insert("do", Keyword::Do);
        m.insert("then", Keyword::Then);
        m.insert("else", Keyword::Else);
        m.insert("fi", Keyword::Fi);
        m.insert("done", Keyword::Done);
        m
    };
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Keyword> {
        KEYWORDS.get(word).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::While => "while",
            Self::If => "if",
            Self::Do => "do",
            Self::Then => "then",
            Self::Else => "else",
            Self::Fi => "fi",
            Self::Done => "done",
        }
    }

    /// Keywords that close or segment a block, as opposed to opening one.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Self::Do | Self::Then | Self::Else | Self::Fi | Self::Done
        )
    }
}

/// Errors from the lexical scanner. Each carries the offset (in characters,
/// relative to the statement being scanned) where the problem begins, so
/// callers can place a caret under the offending column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated quoted string")]
    IncompleteQuote { offset: usize },
    #[error("unterminated `$' expansion")]
    IncompleteExpansion { offset: usize },
    #[error("redirection is missing its target")]
    BadRedirection { offset: usize },
    /// Backslash escaping anything other than a space or another backslash.
    #[error("stray backslash escape")]
    BadEscape { offset: usize },
}

impl TokenizeError {
    pub fn offset(&self) -> usize {
        match *self {
            Self::IncompleteQuote { offset }
            | Self::IncompleteExpansion { offset }
            | Self::BadRedirection { offset }
            | Self::BadEscape { offset } => offset,
        }
    }

    /// Re-base this error's offset into a caller's coordinates.
    pub fn shifted(self, base: usize) -> TokenizeError {
        match self {
            Self::IncompleteQuote { offset } => Self::IncompleteQuote { offset: offset + base },
            Self::IncompleteExpansion { offset } => {
                Self::IncompleteExpansion { offset: offset + base }
            }
            Self::BadRedirection { offset } => Self::BadRedirection { offset: offset + base },
            Self::BadEscape { offset } => Self::BadEscape { offset: offset + base },
        }
    }
}

/// Errors from statement and control-flow parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    /// A token that cannot begin or continue a statement here.
    #[error("unexpected token near `{found}'")]
    UnexpectedToken { found: String, offset: usize },
    /// A block terminator keyword in a position where a plain statement was
    /// required, or inside the wrong block type.
    #[error("unexpected `{keyword}'")]
    UnexpectedTerminator { keyword: &'static str },
    #[error("duplicate `else'")]
    DuplicateElse,
    /// End of input arrived while a block terminator was still expected.
    ///
    /// Distinguished from the hard syntax errors so an interactive front
    /// end can keep prompting for continuation lines instead of rejecting
    /// the statement outright.
    #[error("unexpected end of input while looking for `{expected}'")]
    MissingTerminator { expected: &'static str },
}

impl ParseError {
    /// Caret position for diagnostics, when one is known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Tokenize(e) => Some(e.offset()),
            Self::UnexpectedToken { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Supplies raw input lines (without trailing newlines) while a statement
/// or block is incomplete. `None` means end of input.
pub trait LineReader {
    fn next_line(&mut self) -> Option<String>;
}

/// A fixed sequence of lines; used for `-c` scripts, alias bodies, and
/// tests. Yields `None` once exhausted.
#[derive(Debug, Default)]
pub struct MemoryLines {
    lines: std::collections::VecDeque<String>,
}

impl MemoryLines {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// A reader with no input at all.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl LineReader for MemoryLines {
    fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}
