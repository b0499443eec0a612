//! Control-Flow Parsing
//!
//! Recursive-descent assembly of `while`/`if` blocks over repeated
//! single-statement parses. A leading `while`/`if` with trailing text
//! re-parses the remainder as the first statement of its test chain; a
//! bare keyword awaits following statements instead. Block terminators
//! (`do`, `then`, `else`, `fi`, `done`) exist only here; the finished tree
//! never contains them.
//!
//! Redirections written on a block's closing keyword (`done < file`,
//! `fi > log`) become the block's own redirection scope.

use crate::ast::types::{Command, CommandKind, RedirectSpec};
use crate::parser::command_parser::{next_raw, LineBuffer, RawStatement};
use crate::parser::types::{Keyword, LineReader, ParseError};

/// Outcome of parsing and promoting one statement.
pub(crate) enum Parsed {
    /// End of input before any statement.
    Eof,
    /// A complete statement (possibly empty, possibly a whole block).
    Statement(Command),
    /// A block terminator keyword, with any statement that followed it on
    /// the same line and any redirections attached to the keyword itself.
    Terminator {
        keyword: Keyword,
        attached: Option<Box<Command>>,
        io: RedirectSpec,
    },
}

/// Parse one complete statement from the buffer, reading continuation
/// lines through `reader` as needed. `Ok(None)` means end of input.
///
/// On error the buffer is left as it was when the error was found, so the
/// caller can print a caret against [`LineBuffer::remainder`] before
/// clearing it; recovery is at the statement boundary.
pub fn parse_command(
    buf: &mut LineBuffer,
    reader: &mut dyn LineReader,
) -> Result<Option<Command>, ParseError> {
    match parse_next(buf, reader)? {
        Parsed::Eof => Ok(None),
        Parsed::Statement(cmd) => Ok(Some(cmd)),
        Parsed::Terminator { keyword, .. } => Err(ParseError::UnexpectedTerminator {
            keyword: keyword.as_str(),
        }),
    }
}

/// Tokenize and promote the next statement.
pub(crate) fn parse_next(
    buf: &mut LineBuffer,
    reader: &mut dyn LineReader,
) -> Result<Parsed, ParseError> {
    match next_raw(buf, reader)? {
        None => Ok(Parsed::Eof),
        Some(raw) => promote(raw, buf, reader),
    }
}

/// Recognize keywords at the head of a tokenized statement and assemble
/// pipelines and control-flow blocks.
fn promote(
    raw: RawStatement,
    buf: &mut LineBuffer,
    reader: &mut dyn LineReader,
) -> Result<Parsed, ParseError> {
    let keyword = raw
        .args
        .first()
        .and_then(|a| a.as_unquoted())
        .and_then(Keyword::from_word);

    let Some(keyword) = keyword else {
        return plain_statement(raw, buf, reader);
    };

    match keyword {
        Keyword::While | Keyword::If => {
            let rest = raw.strip_keyword();
            let initial = if rest.args.is_empty() {
                // A bare opening keyword cannot carry a pipe or
                // redirections of its own.
                if rest.has_pipe {
                    return Err(ParseError::UnexpectedToken {
                        found: "|".to_string(),
                        offset: 0,
                    });
                }
                if rest.io.has_redirections() {
                    let found = if rest.io.inputs.is_empty() { ">" } else { "<" };
                    return Err(ParseError::UnexpectedToken {
                        found: found.to_string(),
                        offset: 0,
                    });
                }
                None
            } else {
                Some(rest)
            };
            let cmd = if keyword == Keyword::While {
                parse_while_block(initial, buf, reader)?
            } else {
                parse_if_block(initial, buf, reader)?
            };
            Ok(Parsed::Statement(cmd))
        }
        Keyword::Do | Keyword::Then | Keyword::Else => {
            let io = raw.io.clone();
            let rest = raw.strip_keyword();
            if rest.args.is_empty() {
                if rest.has_pipe {
                    return Err(ParseError::UnexpectedToken {
                        found: "|".to_string(),
                        offset: 0,
                    });
                }
                return Ok(Parsed::Terminator {
                    keyword,
                    attached: None,
                    io,
                });
            }
            // The remainder is itself a full statement (it may even open a
            // nested block that spans further lines).
            match promote(rest, buf, reader)? {
                Parsed::Statement(cmd) => Ok(Parsed::Terminator {
                    keyword,
                    attached: Some(Box::new(cmd)),
                    io: RedirectSpec::default(),
                }),
                Parsed::Terminator { keyword: inner, .. } => {
                    Err(ParseError::UnexpectedTerminator {
                        keyword: inner.as_str(),
                    })
                }
                Parsed::Eof => Err(ParseError::MissingTerminator { expected: "command" }),
            }
        }
        Keyword::Done | Keyword::Fi => {
            if raw.args.len() > 1 {
                return Err(ParseError::UnexpectedToken {
                    found: keyword.as_str().to_string(),
                    offset: 0,
                });
            }
            if raw.has_pipe {
                return Err(ParseError::UnexpectedToken {
                    found: "|".to_string(),
                    offset: 0,
                });
            }
            Ok(Parsed::Terminator {
                keyword,
                attached: None,
                io: raw.io,
            })
        }
    }
}

/// Build a plain command, eagerly continuing the pipeline when the
/// statement ended at `|`.
fn plain_statement(
    raw: RawStatement,
    buf: &mut LineBuffer,
    reader: &mut dyn LineReader,
) -> Result<Parsed, ParseError> {
    let mut io = raw.io;
    let mut next = None;

    if raw.has_pipe {
        io.feeds_pipe = true;
        // Keep reading until a real stage appears; blank lines and
        // comments between `|` and the next command are allowed.
        let mut stage = loop {
            match parse_next(buf, reader)? {
                Parsed::Eof => {
                    return Err(ParseError::MissingTerminator { expected: "command" })
                }
                Parsed::Statement(cmd) if cmd.is_empty() => continue,
                Parsed::Statement(cmd) => break cmd,
                Parsed::Terminator { keyword, .. } => {
                    return Err(ParseError::UnexpectedTerminator {
                        keyword: keyword.as_str(),
                    })
                }
            }
        };
        stage.io.takes_pipe = true;
        next = Some(Box::new(stage));
    }

    if raw.args.is_empty() {
        return Ok(Parsed::Statement(Command::empty()));
    }
    Ok(Parsed::Statement(Command {
        kind: CommandKind::Simple {
            args: raw.args,
            next,
        },
        io,
    }))
}

/// Collect `while <test...> do <body...> done`.
fn parse_while_block(
    initial: Option<RawStatement>,
    buf: &mut LineBuffer,
    reader: &mut dyn LineReader,
) -> Result<Command, ParseError> {
    let mut test = Vec::new();
    let mut body = Vec::new();

    // Test chain, until a `do`.
    let mut pending = match initial {
        Some(raw) => Some(promote(raw, buf, reader)?),
        None => None,
    };
    loop {
        let parsed = match pending.take() {
            Some(p) => p,
            None => parse_next(buf, reader)?,
        };
        match parsed {
            Parsed::Eof => return Err(ParseError::MissingTerminator { expected: "do" }),
            Parsed::Statement(cmd) => {
                if !cmd.is_empty() {
                    test.push(cmd);
                }
            }
            Parsed::Terminator {
                keyword: Keyword::Do,
                attached,
                ..
            } => {
                if let Some(cmd) = attached {
                    body.push(*cmd);
                }
                break;
            }
            Parsed::Terminator { keyword, .. } => {
                return Err(ParseError::UnexpectedTerminator {
                    keyword: keyword.as_str(),
                });
            }
        }
    }

    // Body chain, until the matching `done`.
    loop {
        match parse_next(buf, reader)? {
            Parsed::Eof => return Err(ParseError::MissingTerminator { expected: "done" }),
            Parsed::Statement(cmd) => {
                if !cmd.is_empty() {
                    body.push(cmd);
                }
            }
            Parsed::Terminator {
                keyword: Keyword::Done,
                io,
                ..
            } => {
                return Ok(Command {
                    kind: CommandKind::While { test, body },
                    io,
                });
            }
            Parsed::Terminator { keyword, .. } => {
                return Err(ParseError::UnexpectedTerminator {
                    keyword: keyword.as_str(),
                });
            }
        }
    }
}

/// Collect `if <test...> then <then...> [else <else...>] fi`.
fn parse_if_block(
    initial: Option<RawStatement>,
    buf: &mut LineBuffer,
    reader: &mut dyn LineReader,
) -> Result<Command, ParseError> {
    let mut test = Vec::new();
    let mut then_branch = Vec::new();
    let mut else_branch: Option<Vec<Command>> = None;

    // Test chain, until a `then`.
    let mut pending = match initial {
        Some(raw) => Some(promote(raw, buf, reader)?),
        None => None,
    };
    loop {
        let parsed = match pending.take() {
            Some(p) => p,
            None => parse_next(buf, reader)?,
        };
        match parsed {
            Parsed::Eof => return Err(ParseError::MissingTerminator { expected: "then" }),
            Parsed::Statement(cmd) => {
                if !cmd.is_empty() {
                    test.push(cmd);
                }
            }
            Parsed::Terminator {
                keyword: Keyword::Then,
                attached,
                ..
            } => {
                if let Some(cmd) = attached {
                    then_branch.push(*cmd);
                }
                break;
            }
            Parsed::Terminator { keyword, .. } => {
                return Err(ParseError::UnexpectedTerminator {
                    keyword: keyword.as_str(),
                });
            }
        }
    }

    // Branches, until the matching `fi`. At most one `else`.
    loop {
        match parse_next(buf, reader)? {
            Parsed::Eof => return Err(ParseError::MissingTerminator { expected: "fi" }),
            Parsed::Statement(cmd) => {
                if !cmd.is_empty() {
                    match else_branch.as_mut() {
                        Some(chain) => chain.push(cmd),
                        None => then_branch.push(cmd),
                    }
                }
            }
            Parsed::Terminator {
                keyword: Keyword::Else,
                attached,
                ..
            } => {
                if else_branch.is_some() {
                    return Err(ParseError::DuplicateElse);
                }
                let mut chain = Vec::new();
                if let Some(cmd) = attached {
                    chain.push(*cmd);
                }
                else_branch = Some(chain);
            }
            Parsed::Terminator {
                keyword: Keyword::Fi,
                io,
                ..
            } => {
                return Ok(Command {
                    kind: CommandKind::If {
                        test,
                        then_branch,
                        else_branch,
                    },
                    io,
                });
            }
            Parsed::Terminator { keyword, .. } => {
                return Err(ParseError::UnexpectedTerminator {
                    keyword: keyword.as_str(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Argument;
    use crate::parser::types::MemoryLines;

    fn parse_all(text: &str) -> Vec<Command> {
        let mut buf = LineBuffer::new();
        let mut reader = MemoryLines::new(text);
        let mut out = Vec::new();
        loop {
            match parse_command(&mut buf, &mut reader).expect("parse failed") {
                None => return out,
                Some(cmd) if cmd.is_empty() => continue,
                Some(cmd) => out.push(cmd),
            }
        }
    }

    fn parse_err(text: &str) -> ParseError {
        let mut buf = LineBuffer::new();
        let mut reader = MemoryLines::new(text);
        loop {
            match parse_command(&mut buf, &mut reader) {
                Ok(None) => panic!("no error for {:?}", text),
                Ok(Some(_)) => continue,
                Err(e) => return e,
            }
        }
    }

    fn arg_names(cmd: &Command) -> Vec<String> {
        match &cmd.kind {
            CommandKind::Simple { args, .. } => args
                .iter()
                .map(|a| match a {
                    Argument::Literal(s) => s.clone(),
                    other => format!("{:?}", other),
                })
                .collect(),
            other => panic!("expected simple command, got {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_links_stages() {
        let cmds = parse_all("echo hi | wc -l");
        assert_eq!(cmds.len(), 1);
        match &cmds[0].kind {
            CommandKind::Simple { args, next } => {
                assert_eq!(args.len(), 2);
                assert!(cmds[0].io.feeds_pipe);
                let next = next.as_ref().expect("missing stage");
                assert!(next.io.takes_pipe);
                assert_eq!(arg_names(next), vec!["wc", "-l"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_continues_across_lines() {
        let cmds = parse_all("echo hi |\ncat");
        match &cmds[0].kind {
            CommandKind::Simple { next, .. } => {
                assert_eq!(arg_names(next.as_ref().unwrap()), vec!["cat"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_if_single_line() {
        let cmds = parse_all("if false; then echo a; else echo b; fi");
        match &cmds[0].kind {
            CommandKind::If {
                test,
                then_branch,
                else_branch,
            } => {
                assert_eq!(test.len(), 1);
                assert_eq!(arg_names(&test[0]), vec!["false"]);
                assert_eq!(then_branch.len(), 1);
                assert_eq!(arg_names(&then_branch[0]), vec!["echo", "a"]);
                let else_branch = else_branch.as_ref().unwrap();
                assert_eq!(arg_names(&else_branch[0]), vec!["echo", "b"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_if_multi_line() {
        let cmds = parse_all("if true\nthen\necho yes\nfi");
        match &cmds[0].kind {
            CommandKind::If {
                test,
                then_branch,
                else_branch,
            } => {
                assert_eq!(test.len(), 1);
                assert_eq!(then_branch.len(), 1);
                assert!(else_branch.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_while_collects_test_and_body() {
        let cmds = parse_all("while read x; do echo $x; echo again; done");
        match &cmds[0].kind {
            CommandKind::While { test, body } => {
                assert_eq!(test.len(), 1);
                assert_eq!(arg_names(&test[0]), vec!["read", "x"]);
                assert_eq!(body.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let cmds = parse_all("while true; do if a; then b; fi; done");
        match &cmds[0].kind {
            CommandKind::While { body, .. } => {
                assert_eq!(body.len(), 1);
                assert!(matches!(body[0].kind, CommandKind::If { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_block_redirection_comes_from_closer() {
        let cmds = parse_all("while read x; do echo $x; done < input.txt");
        assert_eq!(
            cmds[0].io.inputs,
            vec![Argument::Literal("input.txt".into())]
        );
        let cmds = parse_all("if true; then echo a; fi > log.txt");
        assert_eq!(cmds[0].io.outputs, vec![Argument::Literal("log.txt".into())]);
    }

    #[test]
    fn test_duplicate_else_is_error() {
        assert_eq!(
            parse_err("if a; then b; else c; else d; fi"),
            ParseError::DuplicateElse
        );
    }

    #[test]
    fn test_wrong_terminator_is_error() {
        assert_eq!(
            parse_err("while a; then b; done"),
            ParseError::UnexpectedTerminator { keyword: "then" }
        );
        assert_eq!(
            parse_err("if a; do b; fi"),
            ParseError::UnexpectedTerminator { keyword: "do" }
        );
        assert_eq!(
            parse_err("if a; then b; done; fi"),
            ParseError::UnexpectedTerminator { keyword: "done" }
        );
    }

    #[test]
    fn test_unterminated_block_reports_missing_terminator() {
        assert_eq!(
            parse_err("while true; do echo x"),
            ParseError::MissingTerminator { expected: "done" }
        );
        assert_eq!(
            parse_err("if true; then echo x"),
            ParseError::MissingTerminator { expected: "fi" }
        );
        assert_eq!(
            parse_err("while true"),
            ParseError::MissingTerminator { expected: "do" }
        );
    }

    #[test]
    fn test_terminator_after_pipe_is_error() {
        assert_eq!(
            parse_err("echo a | done"),
            ParseError::UnexpectedTerminator { keyword: "done" }
        );
    }

    #[test]
    fn test_stray_terminator_at_top_level_is_error() {
        assert_eq!(
            parse_err("fi"),
            ParseError::UnexpectedTerminator { keyword: "fi" }
        );
    }

    #[test]
    fn test_bare_keyword_with_pipe_or_redirection_is_error() {
        assert!(matches!(
            parse_err("while | echo"),
            ParseError::UnexpectedToken { .. }
        ));
        assert!(matches!(
            parse_err("if < file"),
            ParseError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_quoted_keyword_is_not_a_keyword() {
        let cmds = parse_all("'while'");
        assert!(matches!(&cmds[0].kind, CommandKind::Simple { .. }));
    }

    #[test]
    fn test_statements_after_block_on_same_buffer() {
        let cmds = parse_all("if a; then b; fi; echo after");
        assert_eq!(cmds.len(), 2);
        assert_eq!(arg_names(&cmds[1]), vec!["echo", "after"]);
    }
}
