use std::fs::File;
use std::io::{BufReader, IsTerminal, Read};

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use msh::interpreter::{execute, ControlSignal, ShellState};
use msh::parser::{parse_command, LineBuffer, LineReader, ParseError};
use msh::shell::{FrameInput, SourceStack};

const PRIMARY_PROMPT: &str = "msh$ ";
const CONTINUATION_PROMPT: &str = "> ";

#[derive(Parser)]
#[command(name = "msh")]
#[command(about = "A small POSIX-style command shell")]
#[command(version)]
struct Cli {
    /// Execute commands from this string
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,

    /// Script file to run
    #[arg()]
    script_file: Option<String>,

    /// Positional parameters for the script
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let mut interactive = false;
    let source = if let Some(text) = cli.command {
        SourceStack::from_text(&text, vec!["msh".to_string()])
    } else if let Some(file) = cli.script_file {
        let script = match File::open(&file) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("msh: {}: {}", file, e);
                std::process::exit(1);
            }
        };
        let mut args = vec![file];
        args.extend(cli.args);
        SourceStack::new(FrameInput::Script(BufReader::new(script)), args)
    } else if std::io::stdin().is_terminal() {
        interactive = true;
        SourceStack::new(FrameInput::Terminal, vec!["msh".to_string()])
    } else {
        // Piped input: treat the whole of stdin as the script.
        let mut text = String::new();
        let _ = std::io::stdin().read_to_string(&mut text);
        SourceStack::from_text(&text, vec!["msh".to_string()])
    };

    let mut state = ShellState::new(source);
    let status = interpreter_loop(&mut state, interactive);
    std::process::exit(status);
}

/// Reads statements from the current source frame and runs them until the
/// input ends or the engine says to stop.
fn interpreter_loop(state: &mut ShellState, interactive: bool) -> i32 {
    let mut editor = if interactive {
        DefaultEditor::new().ok()
    } else {
        None
    };
    let mut buf = LineBuffer::new();

    loop {
        let parsed = {
            let mut reader = ShellReader {
                source: &mut state.source,
                editor: editor.as_mut(),
                primary: buf.is_empty(),
            };
            parse_command(&mut buf, &mut reader)
        };

        match parsed {
            Ok(None) => {
                // End of input on the top frame: a sourced file finished,
                // or the session is over.
                if state.source.pop() {
                    continue;
                }
                if interactive {
                    eprintln!();
                }
                return state.last_status;
            }
            Ok(Some(cmd)) => match execute(&cmd, state, None) {
                ControlSignal::Exit(code) => return code,
                ControlSignal::Replace => return state.last_status,
                ControlSignal::Done | ControlSignal::Continue | ControlSignal::Break => {}
            },
            Err(err) => {
                print_parse_error(&err, state);
                buf.clear();
            }
        }
    }
}

fn print_parse_error(err: &ParseError, state: &ShellState) {
    if let Some(offset) = err.offset() {
        eprintln!("   {}^", " ".repeat(offset));
    }
    eprintln!("{}: parse error: {}", state.program_name(), err);
}

/// Line supply for the parser: the interactive editor for terminal
/// frames, the source stack for script and `-c` frames.
struct ShellReader<'a> {
    source: &'a mut SourceStack,
    editor: Option<&'a mut DefaultEditor>,
    /// The next line starts a fresh statement (primary prompt) rather
    /// than continuing one (continuation prompt).
    primary: bool,
}

impl LineReader for ShellReader<'_> {
    fn next_line(&mut self) -> Option<String> {
        if !self.source.top_is_terminal() {
            self.primary = false;
            return self.source.next_line();
        }

        let prompt = if self.primary {
            PRIMARY_PROMPT
        } else {
            CONTINUATION_PROMPT
        };
        self.primary = false;

        match self.editor.as_mut() {
            Some(editor) => match editor.readline(prompt) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    Some(line)
                }
                // Ctrl-C abandons the current line, not the shell.
                Err(ReadlineError::Interrupted) => Some(String::new()),
                Err(_) => None,
            },
            None => {
                let mut line = String::new();
                match std::io::stdin().read_line(&mut line) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => {
                        if line.ends_with('\n') {
                            line.pop();
                        }
                        Some(line)
                    }
                }
            }
        }
    }
}
