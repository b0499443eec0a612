//! Shell Variables
//!
//! Shell-local variables layered under the process environment. Lookups
//! consult the environment first, so once a name has been exported the
//! environment is authoritative; setting an already-exported name writes
//! through to the environment instead of shadowing it locally.

use std::collections::HashMap;

/// Shell-local variable table.
#[derive(Debug, Default)]
pub struct Variables {
    local: HashMap<String, String>,
}

/// `true` when `name` is a valid variable name: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable, environment first.
    pub fn get(&self, name: &str) -> Option<String> {
        match std::env::var(name) {
            Ok(value) => Some(value),
            Err(_) => self.local.get(name).cloned(),
        }
    }

    /// Plain `NAME=value` assignment: writes through to the environment
    /// when the name is already exported, otherwise stays shell-local.
    pub fn set(&mut self, name: &str, value: &str) {
        if std::env::var_os(name).is_some() {
            std::env::set_var(name, value);
        } else {
            self.local.insert(name.to_string(), value.to_string());
        }
    }

    /// `export NAME[=value]`. Without a value, promotes the shell-local
    /// value (or an empty string) into the environment; the local entry is
    /// dropped either way so the environment owns the name from here on.
    pub fn export(&mut self, name: &str, value: Option<&str>) {
        let value = match value {
            Some(v) => v.to_string(),
            None => self.local.get(name).cloned().unwrap_or_default(),
        };
        self.local.remove(name);
        std::env::set_var(name, value);
    }

    /// `unset NAME`: removes the exported name from the environment, or
    /// else the shell-local entry.
    pub fn unset(&mut self, name: &str) {
        if std::env::var_os(name).is_some() {
            std::env::remove_var(name);
        } else {
            self.local.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("FOO"));
        assert!(is_valid_name("_x1"));
        assert!(!is_valid_name("1x"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a-b"));
    }

    #[test]
    fn test_local_set_get_unset() {
        let mut vars = Variables::new();
        assert_eq!(vars.get("MSH_TEST_LOCAL_ONLY"), None);
        vars.set("MSH_TEST_LOCAL_ONLY", "1");
        assert_eq!(vars.get("MSH_TEST_LOCAL_ONLY").as_deref(), Some("1"));
        assert!(std::env::var("MSH_TEST_LOCAL_ONLY").is_err());
        vars.unset("MSH_TEST_LOCAL_ONLY");
        assert_eq!(vars.get("MSH_TEST_LOCAL_ONLY"), None);
    }

    #[test]
    fn test_export_promotes_local_value() {
        let mut vars = Variables::new();
        vars.set("MSH_TEST_PROMOTED", "v");
        vars.export("MSH_TEST_PROMOTED", None);
        assert_eq!(std::env::var("MSH_TEST_PROMOTED").as_deref(), Ok("v"));

        // Once exported, plain assignment writes through.
        vars.set("MSH_TEST_PROMOTED", "w");
        assert_eq!(std::env::var("MSH_TEST_PROMOTED").as_deref(), Ok("w"));

        vars.unset("MSH_TEST_PROMOTED");
        assert!(std::env::var("MSH_TEST_PROMOTED").is_err());
    }
}
