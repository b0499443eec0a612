//! Execution engine and its supporting pieces.

pub mod alias_expansion;
pub mod arithmetic;
pub mod builtin_dispatch;
pub mod errors;
pub mod execution_engine;
pub mod expansion;
pub mod pipeline_execution;
pub mod redirections;
pub mod types;

pub use errors::ExecutionError;
pub use execution_engine::execute;
pub use types::{ControlSignal, ShellState};
