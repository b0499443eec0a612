//! Execution Engine
//!
//! Tree-walking interpreter for the command tree. Each node yields a
//! [`ControlSignal`] telling the caller whether to carry on, restart or
//! leave a loop, stop the shell, or never resume (`exec`).
//!
//! A simple command goes through: alias resolution, assignment detection,
//! argument expansion, the special commands, builtin dispatch, and finally
//! an external spawn. Redirections open before any of that and close (with
//! output fan-out) when the statement's I/O scope ends; blocks open theirs
//! once and pass them down the walk as the enclosing scope.

use std::fs::File;
use std::os::fd::OwnedFd;

use crate::ast::types::{Argument, Command, CommandKind};
use crate::interpreter::alias_expansion::resolve_aliases;
use crate::interpreter::builtin_dispatch;
use crate::interpreter::errors::ExecutionError;
use crate::interpreter::expansion::{expand_all, expand_argument};
use crate::interpreter::pipeline_execution::{os_pipe, spawn_stage};
use crate::interpreter::redirections::{open_io, read_line_bytes, IoScope, OpenedIo};
use crate::interpreter::types::{ControlSignal, ShellState};
use crate::shell::variables::is_valid_name;

/// Execute one statement.
pub fn execute(cmd: &Command, state: &mut ShellState, scope: Option<&IoScope>) -> ControlSignal {
    match &cmd.kind {
        CommandKind::Empty => ControlSignal::Done,
        CommandKind::While { test, body } => run_while(cmd, test, body, state, scope),
        CommandKind::If {
            test,
            then_branch,
            else_branch,
        } => run_if(cmd, test, then_branch, else_branch.as_deref(), state, scope),
        CommandKind::Simple { args, next } => {
            run_simple(cmd, args, next.as_deref(), state, scope, None)
        }
    }
}

fn report(err: &ExecutionError, state: &ShellState) {
    eprintln!("{}: {}", state.program_name(), err);
}

/// Run statements in sequence, stopping at the first signal that is not
/// `Done`.
fn run_chain(cmds: &[Command], state: &mut ShellState, scope: Option<&IoScope>) -> ControlSignal {
    for cmd in cmds {
        match execute(cmd, state, scope) {
            ControlSignal::Done => {}
            signal => return signal,
        }
    }
    ControlSignal::Done
}

fn run_while(
    cmd: &Command,
    test: &[Command],
    body: &[Command],
    state: &mut ShellState,
    scope: Option<&IoScope>,
) -> ControlSignal {
    // Loop-scoped redirections open once and are shared by every
    // iteration; `while read x; ... done < file` advances through the file.
    let mut opened = match open_io(&cmd.io, state) {
        Ok(opened) => opened,
        Err(e) => {
            report(&e, state);
            state.set_status(1);
            return ControlSignal::Done;
        }
    };

    let signal = {
        let scope_here = IoScope::new(&opened, scope);
        'outer: loop {
            // Test chain. Break or Continue raised by the test itself
            // still control the loop.
            let mut continued = false;
            let mut broke = false;
            for t in test {
                match execute(t, state, Some(&scope_here)) {
                    ControlSignal::Done => {}
                    ControlSignal::Continue => {
                        continued = true;
                        break;
                    }
                    ControlSignal::Break => {
                        broke = true;
                        break;
                    }
                    signal => break 'outer signal,
                }
            }
            if broke {
                state.set_status(0);
                break ControlSignal::Done;
            }
            if continued {
                continue;
            }
            if state.last_status != 0 {
                break ControlSignal::Done;
            }

            // Body, once per iteration.
            let mut broke = false;
            for b in body {
                match execute(b, state, Some(&scope_here)) {
                    ControlSignal::Done => {}
                    ControlSignal::Continue => break,
                    ControlSignal::Break => {
                        broke = true;
                        break;
                    }
                    signal => break 'outer signal,
                }
            }
            if broke {
                state.set_status(0);
                break ControlSignal::Done;
            }
        }
    };

    opened.close(state);
    signal
}

fn run_if(
    cmd: &Command,
    test: &[Command],
    then_branch: &[Command],
    else_branch: Option<&[Command]>,
    state: &mut ShellState,
    scope: Option<&IoScope>,
) -> ControlSignal {
    let mut opened = match open_io(&cmd.io, state) {
        Ok(opened) => opened,
        Err(e) => {
            report(&e, state);
            state.set_status(1);
            return ControlSignal::Done;
        }
    };

    let signal = {
        let scope_here = IoScope::new(&opened, scope);
        let test_signal = if test.is_empty() {
            // An empty test is trivially true.
            state.set_status(0);
            ControlSignal::Done
        } else {
            run_chain(test, state, Some(&scope_here))
        };
        match test_signal {
            ControlSignal::Done => {
                let chain = if state.last_status == 0 {
                    then_branch
                } else {
                    else_branch.unwrap_or(&[])
                };
                run_chain(chain, state, Some(&scope_here))
            }
            signal => signal,
        }
    };

    opened.close(state);
    signal
}

fn run_simple(
    cmd: &Command,
    args: &[Argument],
    next: Option<&Command>,
    state: &mut ShellState,
    scope: Option<&IoScope>,
    upstream: Option<OwnedFd>,
) -> ControlSignal {
    // Aliases splice in before anything is expanded.
    let mut args = args.to_vec();
    resolve_aliases(&mut args, &state.aliases);
    if args.is_empty() {
        return ControlSignal::Done;
    }

    let mut opened = match open_io(&cmd.io, state) {
        Ok(opened) => opened,
        Err(e) => {
            report(&e, state);
            state.set_status(1);
            return ControlSignal::Done;
        }
    };

    // NAME=value stores a variable; no process is spawned and anything
    // after the value is ignored.
    if let Some(first) = args[0].as_unquoted() {
        if let Some(name) = first.strip_suffix('=') {
            if is_valid_name(name) {
                match args.get(1) {
                    None => state.vars.set(name, ""),
                    Some(value_arg) => match expand_argument(value_arg, state) {
                        Ok(value) => state.vars.set(name, &value),
                        Err(e) => {
                            report(&e, state);
                            state.set_status(1);
                        }
                    },
                }
                opened.close(state);
                return ControlSignal::Done;
            }
        }
    }

    let argv = match expand_all(&args, state) {
        Ok(argv) => argv,
        Err(e) => {
            report(&e, state);
            state.set_status(1);
            opened.close(state);
            return ControlSignal::Done;
        }
    };

    if let Some(signal) = run_special(&argv, &mut opened, state, scope) {
        opened.close(state);
        return signal;
    }

    let exec_mode = argv[0] == "exec";
    if exec_mode {
        if argv.len() == 1 {
            eprintln!(
                "{}: exec: requires at least one argument",
                state.program_name()
            );
            state.set_status(1);
            opened.close(state);
            return ControlSignal::Done;
        }
    } else if let Some(builtin) = builtin_dispatch::lookup(&argv[0]) {
        let status = builtin(&argv, state);
        state.set_status(status);
        opened.close(state);
        return ControlSignal::Done;
    }

    let external_argv = if exec_mode { &argv[1..] } else { &argv[..] };
    run_external(
        cmd,
        external_argv,
        exec_mode,
        next,
        &mut opened,
        state,
        scope,
        upstream,
    )
}

/// The special commands that never reach OS dispatch. `Some(signal)` when
/// handled.
fn run_special(
    argv: &[String],
    opened: &mut OpenedIo,
    state: &mut ShellState,
    scope: Option<&IoScope>,
) -> Option<ControlSignal> {
    let signal = match argv[0].as_str() {
        "continue" => {
            state.set_status(0);
            ControlSignal::Continue
        }
        "break" => {
            state.set_status(0);
            ControlSignal::Break
        }
        "exit" => {
            let code = argv
                .get(1)
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(0)
                .rem_euclid(256) as i32;
            if state.source.top_is_terminal() {
                ControlSignal::Exit(code)
            } else {
                // Inside a sourced file or -c string: skip the rest of the
                // frame instead of tearing down the shell below it.
                state.source.drain_top();
                state.set_status(code);
                ControlSignal::Done
            }
        }
        "alias" => {
            special_alias(argv, state);
            ControlSignal::Done
        }
        "unalias" => {
            state.set_status(0);
            for name in &argv[1..] {
                if !state.aliases.remove(name) {
                    eprintln!(
                        "{}: unalias: no such alias `{}'",
                        state.program_name(),
                        name
                    );
                    state.set_status(1);
                }
            }
            ControlSignal::Done
        }
        "export" => {
            if argv.len() < 2 {
                state.set_status(1);
            } else {
                state.set_status(0);
                for spec in &argv[1..] {
                    let (name, value) = match spec.split_once('=') {
                        Some((name, value)) => (name, Some(value)),
                        None => (spec.as_str(), None),
                    };
                    if is_valid_name(name) {
                        state.vars.export(name, value);
                    } else {
                        eprintln!(
                            "{}: export: `{}': not a valid identifier",
                            state.program_name(),
                            spec
                        );
                        state.set_status(1);
                    }
                }
            }
            ControlSignal::Done
        }
        "unset" => {
            state.set_status(0);
            for name in &argv[1..] {
                if is_valid_name(name) {
                    state.vars.unset(name);
                } else {
                    eprintln!(
                        "{}: unset: `{}': not a valid identifier",
                        state.program_name(),
                        name
                    );
                    state.set_status(1);
                }
            }
            ControlSignal::Done
        }
        "." => {
            match argv.get(1) {
                None => {
                    eprintln!("{}: .: filename argument required", state.program_name());
                    state.set_status(1);
                }
                Some(path) => match state.source.push_file(path, argv[1..].to_vec()) {
                    Ok(()) => state.set_status(0),
                    Err(e) => {
                        eprintln!("{}: .: {}: {}", state.program_name(), path, e);
                        state.set_status(1);
                    }
                },
            }
            ControlSignal::Done
        }
        "read" => special_read(argv, opened, state, scope),
        "shift" => {
            let amount = argv
                .get(1)
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(1);
            match state.source.shift(amount) {
                Ok(()) => state.set_status(0),
                Err(message) => {
                    eprintln!("{}: {}", state.program_name(), message);
                    state.set_status(1);
                }
            }
            ControlSignal::Done
        }
        _ => return None,
    };
    Some(signal)
}

fn special_alias(argv: &[String], state: &mut ShellState) {
    state.set_status(0);
    match argv.get(1) {
        None => {
            for (name, alias) in state.aliases.iter_sorted() {
                println!("{}={}", name, alias.text);
            }
        }
        Some(spec) => match spec.split_once('=') {
            None => match state.aliases.get(spec) {
                Some(alias) => println!("{}={}", spec, alias.text),
                None => state.set_status(1),
            },
            Some(("", _)) => state.set_status(1),
            Some((name, value)) => {
                if state.aliases.define(name, value).is_err() {
                    eprintln!("{}: alias: error parsing string", state.program_name());
                    state.set_status(1);
                }
            }
        },
    }
}

/// `read [NAME]` from the resolved input redirection, or the terminal.
fn special_read(
    argv: &[String],
    opened: &mut OpenedIo,
    state: &mut ShellState,
    scope: Option<&IoScope>,
) -> ControlSignal {
    let line = if let Some(file) = opened.input.as_mut() {
        read_line_bytes(file)
    } else if let Some(file) = scope.and_then(|s| s.nearest_input()) {
        match file.try_clone() {
            Ok(mut shared) => read_line_bytes(&mut shared),
            Err(e) => Err(e),
        }
    } else {
        read_line_bytes(&mut std::io::stdin())
    };

    match line {
        Ok(Some(value)) => {
            state.set_status(0);
            if let Some(name) = argv.get(1) {
                state.vars.set(name, &value);
            }
        }
        Ok(None) | Err(_) => state.set_status(1),
    }
    ControlSignal::Done
}

#[allow(clippy::too_many_arguments)]
fn run_external(
    cmd: &Command,
    argv: &[String],
    exec_mode: bool,
    next: Option<&Command>,
    opened: &mut OpenedIo,
    state: &mut ShellState,
    scope: Option<&IoScope>,
    upstream: Option<OwnedFd>,
) -> ControlSignal {
    // This command's materialized input, or the enclosing block's.
    let input: Option<File> = match opened.input.take() {
        Some(file) => Some(file),
        None => match scope.and_then(|s| s.nearest_input()) {
            Some(shared) => match shared.try_clone() {
                Ok(clone) => Some(clone),
                Err(e) => {
                    report(&ExecutionError::redirect("input", e), state);
                    state.set_status(1);
                    opened.close(state);
                    return ControlSignal::Done;
                }
            },
            None => None,
        },
    };
    // Scratch descriptor for this command's output, or the block's.
    let output_set = match opened.output.as_ref() {
        Some(set) => Some(set),
        None => scope.and_then(|s| s.nearest_output()),
    };
    let output: Option<File> = match output_set {
        Some(set) => match set.writer() {
            Ok(writer) => Some(writer),
            Err(e) => {
                report(&ExecutionError::redirect("output", e), state);
                state.set_status(1);
                opened.close(state);
                return ControlSignal::Done;
            }
        },
        None => None,
    };

    let mut stage = match spawn_stage(argv, cmd.io.feeds_pipe, upstream, input, output) {
        Ok(stage) => stage,
        Err(e) => {
            report(&e, state);
            state.set_status(127);
            // Later stages still run; an immediately-closed pipe gives
            // them end-of-input.
            let signal = match next {
                Some(stage_cmd) => {
                    let eof = os_pipe().ok().map(|(read_end, _write_end)| read_end);
                    execute_stage(stage_cmd, state, scope, eof)
                }
                None => ControlSignal::Done,
            };
            opened.close(state);
            return signal;
        }
    };

    if exec_mode {
        // Replace: the command has the shell's descriptors; nothing waits
        // and the interpreter must not resume.
        stage.forget();
        return ControlSignal::Replace;
    }

    let downstream = stage.downstream.take();
    let next_signal = match next {
        Some(stage_cmd) => execute_stage(stage_cmd, state, scope, downstream),
        None => ControlSignal::Done,
    };

    let (status, interrupted) = stage.wait();
    if interrupted {
        eprintln!();
        state.set_status(130);
    } else if !cmd.io.feeds_pipe {
        // A pipeline reports the final stage's status, which the
        // recursion above has already recorded.
        state.set_status(status);
    }

    opened.close(state);
    next_signal
}

/// Run the next pipeline stage. Control constructs are legal stages but
/// never read the pipe; dropping the descriptor gives the writer EOF.
fn execute_stage(
    cmd: &Command,
    state: &mut ShellState,
    scope: Option<&IoScope>,
    upstream: Option<OwnedFd>,
) -> ControlSignal {
    match &cmd.kind {
        CommandKind::Simple { args, next } => {
            run_simple(cmd, args, next.as_deref(), state, scope, upstream)
        }
        _ => {
            drop(upstream);
            execute(cmd, state, scope)
        }
    }
}
