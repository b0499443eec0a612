//! Builtin Dispatch
//!
//! Name-to-handler lookup for builtins that are not special-cased by the
//! engine itself. These run in the shell process because they must mutate
//! shell state (the working directory cannot change from a child).

use std::collections::HashMap;

use crate::interpreter::types::ShellState;

/// A builtin command: expanded argv in, exit status out.
pub type Builtin = fn(&[String], &mut ShellState) -> i32;

lazy_static::lazy_static! {
    static ref BUILTINS: HashMap<&'static str, Builtin> = {
        let mut m: HashMap<&'static str, Builtin> = HashMap::new();
        m.insert("cd", builtin_cd);
        m.insert("help", builtin_help);
        m
    };
}

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS.get(name).copied()
}

fn builtin_cd(argv: &[String], state: &mut ShellState) -> i32 {
    let target = match argv.get(1) {
        Some(dir) => dir.clone(),
        None => match state.vars.get("HOME") {
            Some(home) => home,
            None => {
                eprintln!("{}: cd: HOME not set", state.program_name());
                return 1;
            }
        },
    };
    match std::env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}: cd: {}: {}", state.program_name(), target, e);
            1
        }
    }
}

fn builtin_help(_argv: &[String], _state: &mut ShellState) -> i32 {
    println!(
        "msh, a small POSIX-style shell\n\
         \n\
         Control flow:  if/then/else/fi, while/do/done, break, continue\n\
         Pipelines:     cmd | cmd, with < and > redirection\n\
         Expansion:     $VAR, $N, $?, $#, $$, $RANDOM, $(cmd), $((expr))\n\
         Shell:         alias, unalias, NAME=value, export, unset, read,\n\
                        shift, cd, . file, exec, exit [code]"
    );
    0
}
