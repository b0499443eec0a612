//! Lexical Scanner
//!
//! Per-class scan functions over a character buffer. Each function is
//! handed a slice starting at the first character of its token class and
//! returns how many characters the token occupies, or a `TokenizeError`
//! whose offset is relative to the slice start (callers add their base
//! offset when propagating).
//!
//! Token classes:
//! - unquoted runs
//! - single-quoted strings
//! - double-quoted strings (alternating literal runs and `$` expansions)
//! - `$` expansions (`$$`, `$?`, `$#`, `$NAME`, `$(...)`, `$((...))`)
//!
//! The historical implementation measured every token twice (once to size
//! storage, once to extract); with growable containers a single pass
//! suffices, so these functions serve both scanning and extraction.

use crate::parser::types::TokenizeError;

/// Length of an unquoted run starting at `buf[0]`.
///
/// The run ends at whitespace, `;`, `<`, `>`, `|`, a quote, `$`, or a
/// backslash escaping anything other than a space or backslash (the run
/// ends just before such a backslash; the caller reports it). A `=` ends
/// the run but is included in it, which is what makes `NAME=value` split
/// into an assignment candidate and its value.
pub fn scan_unquoted(buf: &[char]) -> usize {
    let mut l = 0;
    while let Some(&c) = buf.get(l) {
        match c {
            '=' => return l + 1,
            '\'' | '"' | '$' | ' ' | '\t' | '\n' | ';' | '<' | '>' | '|' => return l,
            '\\' => match buf.get(l + 1) {
                Some(' ') | Some('\\') => l += 2,
                _ => return l,
            },
            _ => l += 1,
        }
    }
    l
}

/// Length of a single-quoted string (including both quotes).
pub fn scan_single_quoted(buf: &[char]) -> Result<usize, TokenizeError> {
    debug_assert_eq!(buf.first(), Some(&'\''));
    for (i, &c) in buf.iter().enumerate().skip(1) {
        if c == '\'' {
            return Ok(i + 1);
        }
    }
    Err(TokenizeError::IncompleteQuote { offset: 0 })
}

/// Length of a literal run inside double quotes.
///
/// Ends at the closing `"` or at a nested `$` expansion. A backslash
/// carries the following character (so `\"` does not close the string);
/// both characters stay in the run verbatim.
pub fn scan_in_double(buf: &[char]) -> usize {
    let mut l = 0;
    while let Some(&c) = buf.get(l) {
        match c {
            '"' | '$' => return l,
            '\\' => l += if buf.get(l + 1).is_some() { 2 } else { 1 },
            _ => l += 1,
        }
    }
    l
}

/// Length of a double-quoted string (including both quotes).
///
/// Alternates literal runs and nested `$` expansions until the matching
/// `"`. A missing terminator is `IncompleteQuote` at the opening quote.
pub fn scan_double_quoted(buf: &[char]) -> Result<usize, TokenizeError> {
    debug_assert_eq!(buf.first(), Some(&'"'));
    let mut l = 1;
    loop {
        match buf.get(l) {
            None => return Err(TokenizeError::IncompleteQuote { offset: 0 }),
            Some('"') => return Ok(l + 1),
            Some('$') => l += scan_dollar(&buf[l..]).map_err(|e| e.shifted(l))?,
            Some(_) => l += scan_in_double(&buf[l..]),
        }
    }
}

/// Length of an identifier or positional reference.
///
/// A leading digit makes it a digits-only run (a positional parameter);
/// a leading letter or `_` makes it an identifier run. Anything else is
/// zero length.
pub fn scan_name(buf: &[char]) -> usize {
    match buf.first() {
        Some(c) if c.is_ascii_digit() => {
            buf.iter().take_while(|c| c.is_ascii_digit()).count()
        }
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => buf
            .iter()
            .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
            .count(),
        _ => 0,
    }
}

/// Length of a `$` expansion starting at the `$`.
///
/// `$$`, `$?`, and `$#` are fixed two-character tokens. `$NAME` and `$0`..
/// are name runs. `$(...)` is command substitution with balanced parens
/// (quotes inside are tracked, so an embedded `)` in a string does not
/// close it early). `$((...))` is an arithmetic expression. A lone `$` is
/// one character and becomes literal text.
pub fn scan_dollar(buf: &[char]) -> Result<usize, TokenizeError> {
    debug_assert_eq!(buf.first(), Some(&'$'));
    match buf.get(1) {
        None => Ok(1),
        Some('$') | Some('?') | Some('#') => Ok(2),
        Some('(') => {
            if buf.get(2) == Some(&'(') {
                // $((expr)) - validate the expression, then both closers.
                let expr = scan_arithmetic(&buf[3..]).map_err(|e| e.shifted(3))?;
                // scan_arithmetic stopped at the first ')'.
                if buf.get(3 + expr + 1) != Some(&')') {
                    return Err(TokenizeError::IncompleteExpansion { offset: 0 });
                }
                Ok(3 + expr + 2)
            } else {
                scan_substitution(buf)
            }
        }
        Some(_) => Ok(1 + scan_name(&buf[1..])),
    }
}

/// Length of `$(...)` command substitution, quotes tracked.
fn scan_substitution(buf: &[char]) -> Result<usize, TokenizeError> {
    let mut l = 2;
    loop {
        match buf.get(l) {
            None => return Err(TokenizeError::IncompleteExpansion { offset: 0 }),
            Some(')') => return Ok(l + 1),
            Some('\'') => l += scan_single_quoted(&buf[l..]).map_err(|e| e.shifted(l))?,
            Some('"') => l += scan_double_quoted(&buf[l..]).map_err(|e| e.shifted(l))?,
            Some('$') => l += scan_dollar(&buf[l..]).map_err(|e| e.shifted(l))?,
            Some(_) => l += 1,
        }
    }
}

/// Length of the interior of `$((...))`, stopping at the first `)`.
///
/// Validates operand/operator alternation: operands are numbers,
/// identifiers, or parenthesized sub-expressions; operators are the five
/// of `+ - * / %`. Spaces are allowed between elements. An expression
/// still expecting an operand when the `)` arrives is incomplete.
pub fn scan_arithmetic(buf: &[char]) -> Result<usize, TokenizeError> {
    let mut l = 0;
    let mut expect_operator = false;
    loop {
        match buf.get(l) {
            None => return Err(TokenizeError::IncompleteExpansion { offset: l }),
            Some(')') => {
                return if expect_operator {
                    Ok(l)
                } else {
                    Err(TokenizeError::IncompleteExpansion { offset: l })
                };
            }
            Some(' ') => l += 1,
            Some(&c) if expect_operator => match c {
                '+' | '-' | '*' | '/' | '%' => {
                    expect_operator = false;
                    l += 1;
                }
                _ => return Err(TokenizeError::IncompleteExpansion { offset: l }),
            },
            Some('(') => {
                l += 1;
                l += scan_arithmetic(&buf[l..]).map_err(|e| e.shifted(l))?;
                l += 1; // the sub-expression's ')'
                expect_operator = true;
            }
            Some(_) => {
                let n = scan_name(&buf[l..]);
                if n == 0 {
                    return Err(TokenizeError::IncompleteExpansion { offset: l });
                }
                l += n;
                expect_operator = true;
            }
        }
    }
}
