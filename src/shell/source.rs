//! Input Source Stack
//!
//! Where the shell's statements come from: the terminal, a script file, or
//! a `-c` command string. `.` pushes a new frame onto the stack; end of
//! input on a pushed frame closes it and resumes the one below. Each frame
//! carries its own positional parameters (`$0`, `$1`, ...), which `shift`
//! rotates.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};

/// Where one frame's lines come from.
pub enum FrameInput {
    /// The interactive terminal; the front end reads these lines itself.
    Terminal,
    Script(BufReader<File>),
    /// A fixed command string (`-c`).
    Text(VecDeque<String>),
}

impl std::fmt::Debug for FrameInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal => write!(f, "Terminal"),
            Self::Script(_) => write!(f, "Script"),
            Self::Text(lines) => write!(f, "Text({} lines)", lines.len()),
        }
    }
}

#[derive(Debug)]
pub struct Frame {
    pub input: FrameInput,
    /// Positional parameters; `args[0]` is the frame's `$0`.
    pub args: Vec<String>,
}

#[derive(Debug)]
pub struct SourceStack {
    frames: Vec<Frame>,
}

impl SourceStack {
    pub fn new(input: FrameInput, args: Vec<String>) -> Self {
        Self {
            frames: vec![Frame { input, args }],
        }
    }

    /// Source text from a command string.
    pub fn from_text(text: &str, args: Vec<String>) -> Self {
        Self::new(
            FrameInput::Text(text.lines().map(str::to_string).collect()),
            args,
        )
    }

    /// Push a script file frame (the `.` command).
    pub fn push_file(&mut self, path: &str, args: Vec<String>) -> io::Result<()> {
        let file = File::open(path)?;
        self.frames.push(Frame {
            input: FrameInput::Script(BufReader::new(file)),
            args,
        });
        Ok(())
    }

    /// Close the top frame. Returns `false` (and does nothing) when only
    /// the base frame is left.
    pub fn pop(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }

    pub fn top_is_terminal(&self) -> bool {
        matches!(self.top().input, FrameInput::Terminal)
    }

    fn top(&self) -> &Frame {
        self.frames.last().expect("source stack is never empty")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("source stack is never empty")
    }

    /// Next line from the top frame, without its trailing newline.
    /// `None` for terminal frames (the front end reads those) and for
    /// exhausted script/text frames.
    pub fn next_line(&mut self) -> Option<String> {
        match &mut self.top_mut().input {
            FrameInput::Terminal => None,
            FrameInput::Script(reader) => {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => {
                        if line.ends_with('\n') {
                            line.pop();
                        }
                        Some(line)
                    }
                }
            }
            FrameInput::Text(lines) => lines.pop_front(),
        }
    }

    /// Exhaust the top frame's input without closing it; used by `exit`
    /// inside a sourced file so the rest of the file is skipped.
    pub fn drain_top(&mut self) {
        match &mut self.top_mut().input {
            FrameInput::Terminal => {}
            FrameInput::Script(reader) => {
                let mut sink = Vec::new();
                let _ = reader.read_to_end(&mut sink);
            }
            FrameInput::Text(lines) => lines.clear(),
        }
    }

    /// The top frame's positional parameters.
    pub fn args(&self) -> &[String] {
        &self.top().args
    }

    /// `$N`, or `None` past the end.
    pub fn positional(&self, n: usize) -> Option<&str> {
        self.top().args.get(n).map(String::as_str)
    }

    /// `$#`: the number of positional parameters, not counting `$0`.
    pub fn param_count(&self) -> usize {
        self.top().args.len().saturating_sub(1)
    }

    /// `shift [n]`: drop the first `n` positional parameters, keeping
    /// `$0`.
    pub fn shift(&mut self, amount: i64) -> Result<(), String> {
        if amount < 0 {
            return Err("shift: amount cannot be negative".to_string());
        }
        let amount = amount as usize;
        if amount > self.param_count() {
            return Err("shift: amount must be <= $#".to_string());
        }
        self.top_mut().args.drain(1..1 + amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stack_with_args(args: &[&str]) -> SourceStack {
        SourceStack::new(
            FrameInput::Terminal,
            args.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_positionals_and_count() {
        let src = stack_with_args(&["msh", "a", "b"]);
        assert_eq!(src.param_count(), 2);
        assert_eq!(src.positional(0), Some("msh"));
        assert_eq!(src.positional(2), Some("b"));
        assert_eq!(src.positional(3), None);
    }

    #[test]
    fn test_shift() {
        let mut src = stack_with_args(&["msh", "a", "b", "c"]);
        src.shift(2).unwrap();
        assert_eq!(src.args(), &["msh", "c"]);

        assert!(src.shift(-1).is_err());
        assert!(src.shift(5).is_err());
        src.shift(1).unwrap();
        assert_eq!(src.param_count(), 0);
        // Shifting nothing is allowed.
        src.shift(0).unwrap();
    }

    #[test]
    fn test_text_frame_lines() {
        let mut src = SourceStack::from_text("one\ntwo", vec!["msh".into()]);
        assert_eq!(src.next_line().as_deref(), Some("one"));
        assert_eq!(src.next_line().as_deref(), Some("two"));
        assert_eq!(src.next_line(), None);
    }

    #[test]
    fn test_push_pop_file_frames() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "echo sourced").unwrap();

        let mut src = stack_with_args(&["msh"]);
        src.push_file(
            script.path().to_str().unwrap(),
            vec!["lib.msh".into(), "x".into()],
        )
        .unwrap();

        assert!(!src.top_is_terminal());
        assert_eq!(src.positional(1), Some("x"));
        assert_eq!(src.next_line().as_deref(), Some("echo sourced"));
        assert_eq!(src.next_line(), None);

        assert!(src.pop());
        assert!(src.top_is_terminal());
        assert!(!src.pop());
    }

    #[test]
    fn test_drain_top() {
        let mut src = SourceStack::from_text("a\nb\nc", vec!["msh".into()]);
        assert_eq!(src.next_line().as_deref(), Some("a"));
        src.drain_top();
        assert_eq!(src.next_line(), None);
    }
}
