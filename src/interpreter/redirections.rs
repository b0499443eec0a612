//! Redirection Handling
//!
//! Multiple input sources are opened and concatenated, in order, into one
//! materialized temporary file. Output goes to a scratch file while the
//! command runs; when the command's I/O scope closes, the scratch contents
//! are copied to every sink. A command with no redirections of its own
//! inherits the nearest enclosing block's files through the scope chain
//! the engine passes down the walk.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::ast::types::RedirectSpec;
use crate::interpreter::errors::ExecutionError;
use crate::interpreter::expansion::expand_argument;
use crate::interpreter::types::ShellState;

/// A command's output side: the scratch file the command writes while it
/// runs, and the sinks that each get a full copy afterwards.
#[derive(Debug)]
pub struct OutputSet {
    scratch: File,
    sinks: Vec<File>,
}

impl OutputSet {
    /// A descriptor for the command (or a child process) to write to.
    /// Clones share one file offset, so sequential writers append.
    pub fn writer(&self) -> io::Result<File> {
        self.scratch.try_clone()
    }

    /// Copy everything written so far to every sink. Called when the
    /// owning I/O scope closes.
    pub fn flush_to_sinks(&mut self) -> io::Result<()> {
        self.scratch.seek(SeekFrom::Start(0))?;
        let mut contents = Vec::new();
        self.scratch.read_to_end(&mut contents)?;
        for sink in &mut self.sinks {
            sink.write_all(&contents)?;
        }
        Ok(())
    }
}

/// Opened redirection files for one command or block.
#[derive(Debug, Default)]
pub struct OpenedIo {
    /// Concatenated input, rewound and ready to read.
    pub input: Option<File>,
    pub output: Option<OutputSet>,
}

impl OpenedIo {
    /// Flush outputs to their sinks, reporting (not propagating) failure.
    pub fn close(&mut self, state: &ShellState) {
        if let Some(output) = self.output.as_mut() {
            if let Err(e) = output.flush_to_sinks() {
                eprintln!("{}: {}", state.program_name(), e);
            }
        }
        self.input = None;
        self.output = None;
    }
}

/// The redirection scope chain: a block's opened files plus a link to the
/// enclosing block's scope.
pub struct IoScope<'a> {
    io: &'a OpenedIo,
    parent: Option<&'a IoScope<'a>>,
}

impl<'a> IoScope<'a> {
    pub fn new(io: &'a OpenedIo, parent: Option<&'a IoScope<'a>>) -> Self {
        Self { io, parent }
    }

    /// The nearest enclosing input binding, innermost first.
    pub fn nearest_input(&self) -> Option<&File> {
        match self.io.input.as_ref() {
            Some(file) => Some(file),
            None => self.parent.and_then(|p| p.nearest_input()),
        }
    }

    /// The nearest enclosing output binding, innermost first.
    pub fn nearest_output(&self) -> Option<&OutputSet> {
        match self.io.output.as_ref() {
            Some(set) => Some(set),
            None => self.parent.and_then(|p| p.nearest_output()),
        }
    }
}

/// Open a command's redirections: expand each target, concatenate the
/// inputs into a rewound temporary, create every output sink, and set up
/// the scratch file.
pub fn open_io(spec: &RedirectSpec, state: &mut ShellState) -> Result<OpenedIo, ExecutionError> {
    let mut opened = OpenedIo::default();

    if !spec.inputs.is_empty() {
        let mut combined =
            tempfile::tempfile().map_err(|e| ExecutionError::redirect("input", e))?;
        for arg in &spec.inputs {
            let path = expand_argument(arg, state)?;
            let mut source =
                File::open(&path).map_err(|e| ExecutionError::redirect(&path, e))?;
            io::copy(&mut source, &mut combined)
                .map_err(|e| ExecutionError::redirect(&path, e))?;
        }
        combined
            .seek(SeekFrom::Start(0))
            .map_err(|e| ExecutionError::redirect("input", e))?;
        opened.input = Some(combined);
    }

    if !spec.outputs.is_empty() {
        let mut sinks = Vec::with_capacity(spec.outputs.len());
        for arg in &spec.outputs {
            let path = expand_argument(arg, state)?;
            let sink = File::create(&path).map_err(|e| ExecutionError::redirect(&path, e))?;
            sinks.push(sink);
        }
        let scratch = tempfile::tempfile().map_err(|e| ExecutionError::redirect("output", e))?;
        opened.output = Some(OutputSet { scratch, sinks });
    }

    Ok(opened)
}

/// Read one newline-terminated line, a byte at a time so the shared file
/// offset stays exact for whoever reads next. `None` at end of input.
pub fn read_line_bytes(file: &mut impl Read) -> io::Result<Option<String>> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match file.read(&mut byte)? {
            0 => break,
            _ => {
                if byte[0] == b'\n' {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
                }
                bytes.push(byte[0]);
            }
        }
    }
    if bytes.is_empty() {
        Ok(None)
    } else {
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}
