//! Alias Table
//!
//! Aliases are parsed once at definition time into an argument list, so
//! invoking one splices pre-built nodes instead of re-tokenizing the text
//! on every use.

use std::collections::HashMap;

use crate::ast::types::Argument;
use crate::parser::command_parser::{next_raw, LineBuffer};
use crate::parser::types::{MemoryLines, ParseError};

/// One alias: the original text (for `alias` listings) plus its
/// pre-parsed argument list.
#[derive(Debug, Clone)]
pub struct Alias {
    pub text: String,
    pub args: Vec<Argument>,
}

#[derive(Debug, Default)]
pub struct Aliases {
    map: HashMap<String, Alias>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) an alias. The replacement text must tokenize
    /// as a single statement; pipes and redirections are rejected since
    /// only the argument list is spliced at use sites.
    pub fn define(&mut self, name: &str, text: &str) -> Result<(), ParseError> {
        let mut buf = LineBuffer::new();
        buf.fill(text);
        let mut reader = MemoryLines::empty();
        let raw = next_raw(&mut buf, &mut reader)?.ok_or(ParseError::MissingTerminator {
            expected: "command",
        })?;
        if raw.has_pipe {
            return Err(ParseError::UnexpectedToken {
                found: "|".to_string(),
                offset: 0,
            });
        }
        if raw.io.has_redirections() {
            return Err(ParseError::UnexpectedToken {
                found: ">".to_string(),
                offset: 0,
            });
        }
        self.map.insert(
            name.to_string(),
            Alias {
                text: text.to_string(),
                args: raw.args,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Alias> {
        self.map.get(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.map.remove(name).is_some()
    }

    /// All aliases, sorted by name for stable listings.
    pub fn iter_sorted(&self) -> Vec<(&str, &Alias)> {
        let mut entries: Vec<_> = self.map.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }
}
