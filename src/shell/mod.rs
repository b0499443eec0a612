//! Session state: input sources, variables, and aliases.

pub mod aliases;
pub mod source;
pub mod variables;

pub use aliases::{Alias, Aliases};
pub use source::{Frame, FrameInput, SourceStack};
pub use variables::Variables;
