//! Command tree produced by the parser and consumed by the interpreter.

pub mod types;

pub use types::{ArithPart, Argument, Command, CommandKind, RedirectSpec};
