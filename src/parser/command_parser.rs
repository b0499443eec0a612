//! Statement Tokenizing
//!
//! Consumes one `;`-separated statement at a time from the front of a
//! mutable line buffer, leaving the rest untouched for the next call. A
//! trailing `|` is reported to the caller, which continues the pipeline by
//! tokenizing the following statement (reading further lines if needed).

use crate::ast::types::{Argument, RedirectSpec};
use crate::parser::lexer::{scan_double_quoted, scan_dollar, scan_single_quoted, scan_unquoted};
use crate::parser::types::{LineReader, ParseError, TokenizeError};
use crate::parser::word_parser::{dollar_fragment, double_quoted_fragments, ArgBuilder};

/// A mutable line buffer the statement parser consumes from the front.
///
/// Offsets in parse errors are relative to the buffer content at the time
/// of the failed call, which is also what [`LineBuffer::remainder`]
/// returns, so a caret can be printed under the offending column.
#[derive(Debug, Default)]
pub struct LineBuffer {
    chars: Vec<char>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Replace the contents with a fresh input line.
    pub fn fill(&mut self, line: &str) {
        self.chars = line.chars().collect();
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    /// The unconsumed text.
    pub fn remainder(&self) -> String {
        self.chars.iter().collect()
    }

    fn consume(&mut self, n: usize) {
        self.chars.drain(..n.min(self.chars.len()));
    }
}

/// One tokenized statement, before keyword promotion and block assembly.
#[derive(Debug)]
pub(crate) struct RawStatement {
    pub args: Vec<Argument>,
    pub io: RedirectSpec,
    /// The statement ended at a `|`; the pipeline continues.
    pub has_pipe: bool,
}

impl RawStatement {
    /// Drop the leading keyword, keeping redirections and pipe state for
    /// the remainder.
    pub fn strip_keyword(mut self) -> RawStatement {
        self.args.remove(0);
        self
    }
}

/// Tokenize the next statement, reading a fresh line when the buffer is
/// empty. `Ok(None)` means the reader is exhausted.
pub(crate) fn next_raw(
    buf: &mut LineBuffer,
    reader: &mut dyn LineReader,
) -> Result<Option<RawStatement>, ParseError> {
    if buf.is_empty() {
        match reader.next_line() {
            None => return Ok(None),
            Some(line) => buf.fill(&line),
        }
    }

    // A comment covers the whole rest of the line, but only from column 0.
    if buf.chars.first() == Some(&'#') {
        buf.clear();
        return Ok(Some(RawStatement {
            args: Vec::new(),
            io: RedirectSpec::default(),
            has_pipe: false,
        }));
    }

    let (consumed, raw) = tokenize_statement(&buf.chars)?;
    buf.consume(consumed);
    Ok(Some(raw))
}

/// Tokenize one statement from `chars`, returning how many characters it
/// occupies (including a trailing `;` or `|`).
fn tokenize_statement(chars: &[char]) -> Result<(usize, RawStatement), ParseError> {
    let mut b = ArgBuilder::new();
    let mut has_pipe = false;
    let mut i = 0;

    let end = loop {
        match chars.get(i) {
            None => {
                b.end_word();
                if b.pending_redirect() {
                    return Err(TokenizeError::BadRedirection { offset: i }.into());
                }
                break i;
            }
            Some(&(c @ (';' | '|'))) => {
                if i == 0 {
                    return Err(ParseError::UnexpectedToken {
                        found: c.to_string(),
                        offset: 0,
                    });
                }
                b.end_word();
                if b.pending_redirect() {
                    return Err(TokenizeError::BadRedirection { offset: i }.into());
                }
                has_pipe = c == '|';
                break i + 1;
            }
            Some(' ' | '\t' | '\n') => {
                b.end_word();
                i += 1;
            }
            Some(&(c @ ('<' | '>'))) => {
                b.begin_redirect(c == '<', i).map_err(ParseError::from)?;
                match chars.get(i + 1) {
                    None | Some('\n' | ';' | '<' | '>' | '|') => {
                        return Err(TokenizeError::BadRedirection { offset: i }.into());
                    }
                    Some(_) => i += 1,
                }
            }
            Some('\'') => {
                let n = scan_single_quoted(&chars[i..]).map_err(|e| e.shifted(i))?;
                let text: String = chars[i + 1..i + n - 1].iter().collect();
                b.push_fragment(Argument::QuotedLiteral(text));
                i += n;
            }
            Some('"') => {
                let n = scan_double_quoted(&chars[i..]).map_err(|e| e.shifted(i))?;
                let fragments =
                    double_quoted_fragments(&chars[i + 1..i + n - 1]).map_err(|e| e.shifted(i + 1))?;
                if fragments.is_empty() && b.word_is_empty() {
                    // "" is an empty word, not nothing.
                    b.push_fragment(Argument::QuotedLiteral(String::new()));
                } else {
                    for fragment in fragments {
                        b.push_fragment(fragment);
                    }
                }
                i += n;
            }
            Some('$') => {
                let n = scan_dollar(&chars[i..]).map_err(|e| e.shifted(i))?;
                b.push_fragment(dollar_fragment(&chars[i..i + n], false));
                i += n;
            }
            Some('~') if b.word_is_empty() => {
                b.push_fragment(Argument::VariableRef("HOME".to_string()));
                i += 1;
            }
            Some(_) => {
                let n = scan_unquoted(&chars[i..]);
                if n == 0 {
                    return Err(TokenizeError::BadEscape { offset: i }.into());
                }
                let text: String = chars[i..i + n].iter().collect();
                let splits_assignment = text.ends_with('=') && b.at_first_word();
                b.push_fragment(Argument::Literal(text));
                if splits_assignment {
                    b.end_word();
                }
                i += n;
            }
        }
    };

    let (args, io) = b.finish(end).map_err(ParseError::from)?;
    Ok((
        end,
        RawStatement {
            args,
            io,
            has_pipe,
        },
    ))
}
