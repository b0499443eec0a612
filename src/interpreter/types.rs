//! Interpreter State Types
//!
//! The execution context threaded through the engine's calls: variable and
//! alias tables, the input-source stack, the last exit status, and the RNG
//! backing `$RANDOM`. Keeping this in one explicit struct (rather than
//! process globals) lets nested invocations stay reentrant.

use rand::rngs::ThreadRng;
use rand::Rng;

use crate::shell::{Aliases, SourceStack, Variables};

/// What executing one node tells the caller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Statement finished; carry on.
    Done,
    /// `exit` at the terminal: the interpreter loop must stop.
    Exit(i32),
    /// `continue`: restart the innermost loop.
    Continue,
    /// `break`: leave the innermost loop.
    Break,
    /// `exec` ran: the interpreter is being replaced and must not resume.
    Replace,
}

/// Mutable session state owned by the driving loop and threaded through
/// the engine.
pub struct ShellState {
    pub vars: Variables,
    pub aliases: Aliases,
    pub source: SourceStack,
    pub last_status: i32,
    rng: ThreadRng,
}

impl ShellState {
    pub fn new(source: SourceStack) -> Self {
        Self {
            vars: Variables::new(),
            aliases: Aliases::new(),
            source,
            last_status: 0,
            rng: rand::thread_rng(),
        }
    }

    pub fn set_status(&mut self, code: i32) {
        self.last_status = code;
    }

    /// `$0` of the current frame, for diagnostics.
    pub fn program_name(&self) -> String {
        self.source
            .positional(0)
            .unwrap_or("msh")
            .to_string()
    }

    /// A fresh `$RANDOM` value.
    pub fn random_value(&mut self) -> i64 {
        self.rng.gen_range(0..=i32::MAX as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{FrameInput, SourceStack};

    fn test_state() -> ShellState {
        ShellState::new(SourceStack::new(
            FrameInput::Terminal,
            vec!["msh".to_string()],
        ))
    }

    #[test]
    fn test_status_tracking() {
        let mut state = test_state();
        assert_eq!(state.last_status, 0);
        state.set_status(42);
        assert_eq!(state.last_status, 42);
    }

    #[test]
    fn test_random_is_non_negative() {
        let mut state = test_state();
        for _ in 0..32 {
            assert!(state.random_value() >= 0);
        }
    }
}
