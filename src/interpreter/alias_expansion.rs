//! Alias Resolution
//!
//! Replaces argument zero with an alias's pre-parsed argument list before
//! expansion. Resolution repeats for the new argument zero, but a name is
//! never expanded twice in one command, so `alias ls='ls --color'`
//! substitutes exactly once and mutually recursive aliases terminate.

use std::collections::HashSet;

use crate::ast::types::Argument;
use crate::shell::Aliases;

/// Splice alias substitutions into the front of `args`.
pub fn resolve_aliases(args: &mut Vec<Argument>, aliases: &Aliases) {
    let mut expanded: HashSet<String> = HashSet::new();
    loop {
        let name = match args.first().and_then(Argument::as_unquoted) {
            Some(name) => name.to_string(),
            None => return,
        };
        if expanded.contains(&name) {
            return;
        }
        let alias = match aliases.get(&name) {
            Some(alias) => alias,
            None => return,
        };
        args.splice(0..1, alias.args.iter().cloned());
        expanded.insert(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Argument {
        Argument::Literal(s.into())
    }

    #[test]
    fn test_splices_preserving_remaining_args() {
        let mut aliases = Aliases::new();
        aliases.define("ll", "ls -la").unwrap();

        let mut args = vec![lit("ll"), lit("-1")];
        resolve_aliases(&mut args, &aliases);
        assert_eq!(args, vec![lit("ls"), lit("-la"), lit("-1")]);
    }

    #[test]
    fn test_self_reference_substitutes_once() {
        let mut aliases = Aliases::new();
        aliases.define("ls", "ls --color").unwrap();

        let mut args = vec![lit("ls"), lit("/tmp")];
        resolve_aliases(&mut args, &aliases);
        assert_eq!(args, vec![lit("ls"), lit("--color"), lit("/tmp")]);
    }

    #[test]
    fn test_chained_aliases_resolve_through() {
        let mut aliases = Aliases::new();
        aliases.define("a", "b -x").unwrap();
        aliases.define("b", "real").unwrap();

        let mut args = vec![lit("a")];
        resolve_aliases(&mut args, &aliases);
        assert_eq!(args, vec![lit("real"), lit("-x")]);
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let mut aliases = Aliases::new();
        aliases.define("x", "y").unwrap();
        aliases.define("y", "x").unwrap();

        let mut args = vec![lit("x")];
        resolve_aliases(&mut args, &aliases);
        // x -> y -> x, then x has already been expanded.
        assert_eq!(args, vec![lit("x")]);
    }

    #[test]
    fn test_quoted_word_is_not_resolved() {
        let mut aliases = Aliases::new();
        aliases.define("ll", "ls -la").unwrap();

        let mut args = vec![Argument::QuotedLiteral("ll".into())];
        resolve_aliases(&mut args, &aliases);
        assert_eq!(args, vec![Argument::QuotedLiteral("ll".into())]);
    }
}
