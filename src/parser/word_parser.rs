//! Argument Building
//!
//! Turns scanner output into typed [`Argument`] nodes: materializes each
//! token class, merges adjacent heterogeneous fragments of one word into a
//! flat concatenation, and routes completed words either into the argument
//! list or into the pending redirection slot.

use crate::ast::types::{ArithPart, Argument, RedirectSpec};
use crate::parser::lexer::{scan_arithmetic, scan_dollar, scan_in_double, scan_name};
use crate::parser::types::TokenizeError;

// =============================================================================
// FRAGMENT MATERIALIZATION
// =============================================================================

/// Build the argument fragment for a `$` expansion already measured by
/// [`scan_dollar`]. `token` is exactly the expansion's characters.
pub fn dollar_fragment(token: &[char], in_double_quotes: bool) -> Argument {
    if token.len() == 1 {
        return Argument::Literal("$".to_string());
    }
    if token[1] == '(' {
        if token.get(2) == Some(&'(') {
            // $((expr)) - strip `$((` and `))`.
            let inner = &token[3..token.len() - 2];
            return Argument::ArithmeticExpr(arithmetic_parts(inner));
        }
        // $(cmd) - strip `$(` and `)`.
        let text: String = token[2..token.len() - 1].iter().collect();
        return Argument::CommandSubstitution {
            text,
            quoted: in_double_quotes,
        };
    }
    Argument::VariableRef(token[1..].iter().collect())
}

/// Parse the interior of a validated arithmetic expression into its
/// operand/operator sequence. `buf` excludes the surrounding parens.
pub fn arithmetic_parts(buf: &[char]) -> Vec<ArithPart> {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < buf.len() {
        let c = buf[i];
        match c {
            ' ' => i += 1,
            '+' | '-' | '*' | '/' | '%' => {
                parts.push(ArithPart::Operator(c));
                i += 1;
            }
            '(' => {
                // scan_arithmetic already validated, so the matching ')'
                // is inside the slice.
                let len = scan_arithmetic(&buf[i + 1..]).unwrap_or(0);
                parts.push(ArithPart::Nested(arithmetic_parts(&buf[i + 1..i + 1 + len])));
                i += len + 2;
            }
            _ => {
                let len = scan_name(&buf[i..]).max(1);
                let text: String = buf[i..i + len].iter().collect();
                if c.is_ascii_digit() {
                    parts.push(ArithPart::Number(text));
                } else {
                    parts.push(ArithPart::Variable(text));
                }
                i += len;
            }
        }
    }
    parts
}

/// Split the interior of a double-quoted string into its fragments:
/// literal runs and nested `$` expansions, in order. `buf` excludes the
/// surrounding quotes.
pub fn double_quoted_fragments(buf: &[char]) -> Result<Vec<Argument>, TokenizeError> {
    let mut fragments = Vec::new();
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == '$' {
            let len = scan_dollar(&buf[i..]).map_err(|e| e.shifted(i))?;
            fragments.push(dollar_fragment(&buf[i..i + len], true));
            i += len;
        } else {
            let len = scan_in_double(&buf[i..]);
            let text: String = buf[i..i + len].iter().collect();
            fragments.push(Argument::Literal(text));
            i += len;
        }
    }
    Ok(fragments)
}

// =============================================================================
// WORD ACCUMULATION
// =============================================================================

/// Where the word currently being accumulated will land once complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Args,
    Input,
    Output,
}

/// Accumulates fragments into words and words into an argument list plus a
/// redirection spec.
#[derive(Debug)]
pub struct ArgBuilder {
    args: Vec<Argument>,
    io: RedirectSpec,
    current: Option<Argument>,
    slot: Slot,
}

impl ArgBuilder {
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            io: RedirectSpec::default(),
            current: None,
            slot: Slot::Args,
        }
    }

    /// Append a fragment to the word being built.
    pub fn push_fragment(&mut self, fragment: Argument) {
        self.current = Some(match self.current.take() {
            None => fragment,
            Some(word) => word.join(fragment),
        });
    }

    /// Complete the current word, routing it into the argument list or the
    /// pending redirection slot. No-op when no fragments are buffered.
    pub fn end_word(&mut self) {
        if let Some(word) = self.current.take() {
            match self.slot {
                Slot::Args => self.args.push(word),
                Slot::Input => {
                    self.io.inputs.push(word);
                    self.slot = Slot::Args;
                }
                Slot::Output => {
                    self.io.outputs.push(word);
                    self.slot = Slot::Args;
                }
            }
        }
    }

    /// Start a redirection; the next completed word becomes its target.
    /// A redirection that is already waiting for its target is an error.
    pub fn begin_redirect(&mut self, input: bool, offset: usize) -> Result<(), TokenizeError> {
        self.end_word();
        if self.slot != Slot::Args {
            return Err(TokenizeError::BadRedirection { offset });
        }
        self.slot = if input { Slot::Input } else { Slot::Output };
        Ok(())
    }

    /// A redirection operator has been seen and its target has not.
    pub fn pending_redirect(&self) -> bool {
        self.slot != Slot::Args
    }

    /// The word being built has no fragments yet.
    pub fn word_is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// The next completed word would become argument zero.
    pub fn at_first_word(&self) -> bool {
        self.args.is_empty() && self.slot == Slot::Args
    }

    /// Finish the statement. The final word is completed; a redirection
    /// still waiting for its target is an error.
    pub fn finish(mut self, offset: usize) -> Result<(Vec<Argument>, RedirectSpec), TokenizeError> {
        self.end_word();
        if self.slot != Slot::Args {
            return Err(TokenizeError::BadRedirection { offset });
        }
        Ok((self.args, self.io))
    }
}

impl Default for ArgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_dollar_fragment_kinds() {
        assert_eq!(
            dollar_fragment(&chars("$HOME"), false),
            Argument::VariableRef("HOME".into())
        );
        assert_eq!(
            dollar_fragment(&chars("$?"), false),
            Argument::VariableRef("?".into())
        );
        assert_eq!(dollar_fragment(&chars("$"), false), Argument::Literal("$".into()));
        assert_eq!(
            dollar_fragment(&chars("$(ls -l)"), false),
            Argument::CommandSubstitution {
                text: "ls -l".into(),
                quoted: false
            }
        );
        assert_eq!(
            dollar_fragment(&chars("$(x)"), true),
            Argument::CommandSubstitution {
                text: "x".into(),
                quoted: true
            }
        );
    }

    #[test]
    fn test_arithmetic_parts() {
        assert_eq!(
            arithmetic_parts(&chars("2+3*4")),
            vec![
                ArithPart::Number("2".into()),
                ArithPart::Operator('+'),
                ArithPart::Number("3".into()),
                ArithPart::Operator('*'),
                ArithPart::Number("4".into()),
            ]
        );
        assert_eq!(
            arithmetic_parts(&chars("x % 2")),
            vec![
                ArithPart::Variable("x".into()),
                ArithPart::Operator('%'),
                ArithPart::Number("2".into()),
            ]
        );
    }

    #[test]
    fn test_arithmetic_nested() {
        assert_eq!(
            arithmetic_parts(&chars("2*(a+1)")),
            vec![
                ArithPart::Number("2".into()),
                ArithPart::Operator('*'),
                ArithPart::Nested(vec![
                    ArithPart::Variable("a".into()),
                    ArithPart::Operator('+'),
                    ArithPart::Number("1".into()),
                ]),
            ]
        );
    }

    #[test]
    fn test_double_quoted_fragments() {
        let frags = double_quoted_fragments(&chars("a $b")).unwrap();
        assert_eq!(
            frags,
            vec![
                Argument::Literal("a ".into()),
                Argument::VariableRef("b".into()),
            ]
        );

        let frags = double_quoted_fragments(&chars("x$(c)y")).unwrap();
        assert_eq!(
            frags,
            vec![
                Argument::Literal("x".into()),
                Argument::CommandSubstitution {
                    text: "c".into(),
                    quoted: true
                },
                Argument::Literal("y".into()),
            ]
        );
    }

    #[test]
    fn test_builder_routes_redirect_targets() {
        let mut b = ArgBuilder::new();
        b.push_fragment(Argument::Literal("sort".into()));
        b.end_word();
        b.begin_redirect(true, 5).unwrap();
        b.push_fragment(Argument::Literal("data".into()));
        b.end_word();
        b.begin_redirect(false, 12).unwrap();
        b.push_fragment(Argument::Literal("out".into()));
        let (args, io) = b.finish(16).unwrap();

        assert_eq!(args, vec![Argument::Literal("sort".into())]);
        assert_eq!(io.inputs, vec![Argument::Literal("data".into())]);
        assert_eq!(io.outputs, vec![Argument::Literal("out".into())]);
    }

    #[test]
    fn test_builder_double_redirect_is_error() {
        let mut b = ArgBuilder::new();
        b.begin_redirect(true, 0).unwrap();
        assert!(matches!(
            b.begin_redirect(false, 1),
            Err(TokenizeError::BadRedirection { offset: 1 })
        ));
    }

    #[test]
    fn test_builder_missing_target_is_error() {
        let mut b = ArgBuilder::new();
        b.push_fragment(Argument::Literal("cat".into()));
        b.end_word();
        b.begin_redirect(true, 4).unwrap();
        assert!(matches!(
            b.finish(6),
            Err(TokenizeError::BadRedirection { offset: 6 })
        ));
    }

    #[test]
    fn test_builder_merges_fragments() {
        let mut b = ArgBuilder::new();
        b.push_fragment(Argument::Literal("a".into()));
        b.push_fragment(Argument::VariableRef("b".into()));
        b.push_fragment(Argument::QuotedLiteral("c".into()));
        let (args, _) = b.finish(0).unwrap();
        assert_eq!(
            args,
            vec![Argument::Concatenation(vec![
                Argument::Literal("a".into()),
                Argument::VariableRef("b".into()),
                Argument::QuotedLiteral("c".into()),
            ])]
        );
    }
}
