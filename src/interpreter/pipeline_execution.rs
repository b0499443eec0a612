//! Pipeline Execution
//!
//! OS-level plumbing for external commands: pipes between stages, relay
//! threads for stages that must feed both a pipe and a file, SIGINT
//! forwarding to the foreground child, and exit-status collection.
//!
//! Relay ordering is deterministic: a stage writing to both the downstream
//! pipe and a file sends each chunk to the pipe first, then the file; a
//! stage reading from both a pipe and files sees all piped bytes first and
//! the file contents appended after pipe EOF, never interleaved.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{FromRawFd, OwnedFd};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::thread::JoinHandle;

use crate::interpreter::errors::ExecutionError;

const RELAY_BUF_SIZE: usize = 4096;

/// Create an OS pipe as a (read, write) pair of owned descriptors.
pub fn os_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    // Just created, not shared with anyone else yet.
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

/// Relay for a stage that takes a pipe and also reads files: forward the
/// pipe until EOF, then append the file contents. Returns the read end the
/// stage's stdin should use.
fn input_relay(upstream: OwnedFd, file: File) -> io::Result<(OwnedFd, JoinHandle<()>)> {
    let (read_end, write_end) = os_pipe()?;
    let handle = std::thread::spawn(move || {
        let mut sink = File::from(write_end);
        let mut pipe = File::from(upstream);
        let _ = io::copy(&mut pipe, &mut sink);
        let mut file = file;
        let _ = io::copy(&mut file, &mut sink);
    });
    Ok((read_end, handle))
}

/// Relay for a stage that feeds a pipe and also writes files: duplicate
/// every chunk to the downstream pipe first, then the scratch file.
/// Returns the read end the next stage's stdin should use.
fn output_relay(stage_out: OwnedFd, mut file: File) -> io::Result<(OwnedFd, JoinHandle<()>)> {
    let (read_end, write_end) = os_pipe()?;
    let handle = std::thread::spawn(move || {
        let mut source = File::from(stage_out);
        let mut downstream = File::from(write_end);
        let mut buf = [0u8; RELAY_BUF_SIZE];
        loop {
            match source.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    // Downstream may be gone already; the file copy still
                    // has to happen.
                    let _ = downstream.write_all(&buf[..n]);
                    let _ = file.write_all(&buf[..n]);
                }
            }
        }
    });
    Ok((read_end, handle))
}

// SIGINT forwarding: while a foreground child runs, interrupts kill only
// the child. The handler reads the registered pid from an atomic.
static FOREGROUND_PID: AtomicI32 = AtomicI32::new(0);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn forward_sigint(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
    let pid = FOREGROUND_PID.load(Ordering::SeqCst);
    if pid > 0 {
        unsafe {
            libc::kill(pid, libc::SIGINT);
        }
    }
}

/// Installs the forwarding SIGINT handler for one foreground wait and
/// restores the prior disposition when dropped.
struct SigintGuard {
    previous: libc::sigaction,
}

impl SigintGuard {
    fn install(child_pid: i32) -> SigintGuard {
        FOREGROUND_PID.store(child_pid, Ordering::SeqCst);
        INTERRUPTED.store(false, Ordering::SeqCst);
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = forward_sigint as usize;
            libc::sigemptyset(&mut action.sa_mask);
            let mut previous: libc::sigaction = std::mem::zeroed();
            libc::sigaction(libc::SIGINT, &action, &mut previous);
            SigintGuard { previous }
        }
    }

    fn interrupted(&self) -> bool {
        INTERRUPTED.load(Ordering::SeqCst)
    }
}

impl Drop for SigintGuard {
    fn drop(&mut self) {
        unsafe {
            libc::sigaction(libc::SIGINT, &self.previous, std::ptr::null_mut());
        }
        FOREGROUND_PID.store(0, Ordering::SeqCst);
    }
}

/// A spawned external stage, not yet waited on.
pub struct RunningStage {
    child: Child,
    /// Read end for the next pipeline stage's stdin.
    pub downstream: Option<OwnedFd>,
    relay_in: Option<JoinHandle<()>>,
    relay_out: Option<JoinHandle<()>>,
}

impl RunningStage {
    /// Wait for the stage with SIGINT redirected to it. Returns the exit
    /// status and whether an interrupt arrived during the wait.
    pub fn wait(mut self) -> (i32, bool) {
        let guard = SigintGuard::install(self.child.id() as i32);
        let status = match self.child.wait() {
            Ok(status) => status
                .code()
                .unwrap_or_else(|| 128 + status.signal().unwrap_or(0)),
            Err(_) => 1,
        };
        let interrupted = guard.interrupted();
        drop(guard);
        if let Some(handle) = self.relay_out.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.relay_in.take() {
            let _ = handle.join();
        }
        (status, interrupted)
    }

    /// Leave the stage running; used by `exec`, which never waits.
    pub fn forget(self) {}
}

/// Spawn one external pipeline stage with its plumbing connected.
///
/// `upstream` is the read end of the previous stage's pipe. `input` is the
/// stage's materialized file input (own or inherited). `output` is the
/// scratch descriptor for its file output (own or inherited). When
/// `feeds_pipe` is set the stage's stdout goes to a fresh pipe whose read
/// end ends up in [`RunningStage::downstream`], via a relay when a file
/// output also exists.
pub fn spawn_stage(
    argv: &[String],
    feeds_pipe: bool,
    upstream: Option<OwnedFd>,
    input: Option<File>,
    output: Option<File>,
) -> Result<RunningStage, ExecutionError> {
    let fail = |e: io::Error| ExecutionError::spawn(argv[0].clone(), e);

    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);

    let mut relay_in = None;
    match (upstream, input) {
        (Some(pipe), Some(file)) => {
            let (read_end, handle) = input_relay(pipe, file).map_err(fail)?;
            relay_in = Some(handle);
            command.stdin(Stdio::from(File::from(read_end)));
        }
        (Some(pipe), None) => {
            command.stdin(Stdio::from(File::from(pipe)));
        }
        (None, Some(file)) => {
            command.stdin(Stdio::from(file));
        }
        (None, None) => {}
    }

    let mut relay_out = None;
    let mut downstream = None;
    if feeds_pipe {
        let (read_end, write_end) = os_pipe().map_err(fail)?;
        command.stdout(Stdio::from(File::from(write_end)));
        match output {
            Some(file) => {
                let (relayed, handle) = output_relay(read_end, file).map_err(fail)?;
                relay_out = Some(handle);
                downstream = Some(relayed);
            }
            None => downstream = Some(read_end),
        }
    } else if let Some(file) = output {
        command.stdout(Stdio::from(file));
    }

    let child = command.spawn().map_err(fail)?;
    Ok(RunningStage {
        child,
        downstream,
        relay_in,
        relay_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read as _, Write as _};

    #[test]
    fn test_os_pipe_carries_bytes() {
        let (read_end, write_end) = os_pipe().unwrap();
        let mut writer = File::from(write_end);
        writer.write_all(b"through the pipe").unwrap();
        drop(writer);

        let mut text = String::new();
        File::from(read_end).read_to_string(&mut text).unwrap();
        assert_eq!(text, "through the pipe");
    }

    #[test]
    fn test_spawn_collects_exit_status() {
        let stage = spawn_stage(&["false".to_string()], false, None, None, None).unwrap();
        let (status, interrupted) = stage.wait();
        assert_eq!(status, 1);
        assert!(!interrupted);

        let stage = spawn_stage(&["true".to_string()], false, None, None, None).unwrap();
        assert_eq!(stage.wait().0, 0);
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let result = spawn_stage(
            &["msh-test-definitely-not-a-program".to_string()],
            false,
            None,
            None,
            None,
        );
        assert!(matches!(result, Err(ExecutionError::SpawnFailure { .. })));
    }

    #[test]
    fn test_pipe_bytes_reach_downstream_stage() {
        let first = spawn_stage(
            &["echo".to_string(), "hello".to_string()],
            true,
            None,
            None,
            None,
        )
        .unwrap();
        let downstream = first.downstream.as_ref().unwrap().try_clone().unwrap();

        let mut text = String::new();
        File::from(downstream).read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello\n");
        assert_eq!(first.wait().0, 0);
    }

    #[test]
    fn test_output_relay_duplicates_to_file() {
        let scratch = tempfile::tempfile().unwrap();
        let copy = scratch.try_clone().unwrap();
        let stage = spawn_stage(
            &["echo".to_string(), "both".to_string()],
            true,
            None,
            None,
            Some(scratch),
        )
        .unwrap();

        let mut downstream =
            File::from(stage.downstream.as_ref().unwrap().try_clone().unwrap());
        let mut piped = String::new();
        downstream.read_to_string(&mut piped).unwrap();
        assert_eq!(piped, "both\n");
        stage.wait();

        use std::io::Seek;
        let mut copy = copy;
        copy.seek(std::io::SeekFrom::Start(0)).unwrap();
        let mut filed = String::new();
        copy.read_to_string(&mut filed).unwrap();
        assert_eq!(filed, "both\n");
    }

    #[test]
    fn test_input_relay_appends_file_after_pipe() {
        use std::io::Seek;
        let (pipe_read, pipe_write) = os_pipe().unwrap();
        let mut writer = File::from(pipe_write);
        writer.write_all(b"from-pipe\n").unwrap();
        drop(writer);

        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"from-file\n").unwrap();
        file.seek(std::io::SeekFrom::Start(0)).unwrap();

        let stage = spawn_stage(
            &["cat".to_string()],
            true,
            Some(pipe_read),
            Some(file),
            None,
        )
        .unwrap();
        let mut downstream =
            File::from(stage.downstream.as_ref().unwrap().try_clone().unwrap());
        let mut text = String::new();
        downstream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "from-pipe\nfrom-file\n");
        stage.wait();
    }
}
