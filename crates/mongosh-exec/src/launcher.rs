//! Spawning and awaiting the mongosh process.
//!
//! The calling thread blocks in [`LaunchedProcess::wait`]; two helper threads
//! drain stdout and stderr so a chatty process cannot stall on a full pipe.
//! Once mongosh exits, the pipes get a bounded drain window. Anything still
//! holding them open after that is killed along with the process group.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::model::{CommandInvocation, ProcessResult};

/// Grace period applied after a timeout before the process is abandoned.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Time allowed between SIGTERM and SIGKILL when abandoning a process.
const TERMINATE_GRACE: Duration = Duration::from_millis(200);

/// Time the output pipes may stay open after mongosh itself has exited.
const PIPE_DRAIN: Duration = Duration::from_millis(500);

type PipeReader = Receiver<io::Result<Vec<u8>>>;

/// A running mongosh process.
#[derive(Debug)]
pub struct LaunchedProcess {
    child: Child,
    stdout: Option<PipeReader>,
    stderr: Option<PipeReader>,
    started: Instant,
}

/// Result of waiting on a [`LaunchedProcess`].
#[derive(Debug)]
pub enum WaitResult {
    /// The process exited within the timeout.
    Exited {
        result: ProcessResult,
        elapsed: Duration,
    },
    /// The timeout elapsed; the process is still running.
    TimedOut(LaunchedProcess),
}

/// Spawn `invocation.argv` with piped output and no stdin.
///
/// On unix the child leads its own process group so it can be signalled as a
/// whole.
pub fn spawn(invocation: &CommandInvocation) -> io::Result<LaunchedProcess> {
    let program = invocation
        .program()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;
    let mut command = Command::new(program);
    command
        .args(invocation.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn()?;
    let stdout = spawn_pipe_reader(child.stdout.take());
    let stderr = spawn_pipe_reader(child.stderr.take());
    debug!(pid = child.id(), invocation_id = %invocation.id, "spawned mongosh");
    Ok(LaunchedProcess {
        child,
        stdout,
        stderr,
        started: Instant::now(),
    })
}

impl LaunchedProcess {
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Time since spawn.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Block until the process exits or `timeout` elapses.
    pub fn wait(mut self, timeout: Duration) -> io::Result<WaitResult> {
        match self.child.wait_timeout(timeout)? {
            Some(status) => {
                let readers = [self.stdout.take(), self.stderr.take()];
                let [stdout, stderr] = self.collect_output(&readers);
                Ok(WaitResult::Exited {
                    result: ProcessResult {
                        exit_code: exit_code(status),
                        stdout,
                        stderr,
                    },
                    elapsed: self.started.elapsed(),
                })
            }
            None => Ok(WaitResult::TimedOut(self)),
        }
    }

    /// Gather both streams after the leader exited.
    ///
    /// A descendant that inherited the pipes would keep the readers blocked,
    /// so after [`PIPE_DRAIN`] the process group is killed and the readers
    /// get one more short window.
    fn collect_output(&self, readers: &[Option<PipeReader>; 2]) -> [String; 2] {
        let mut results: [Option<io::Result<Vec<u8>>>; 2] = [None, None];
        let deadline = Instant::now() + PIPE_DRAIN;
        for (slot, reader) in results.iter_mut().zip(readers) {
            *slot = match reader {
                Some(reader) => receive(reader, deadline),
                None => Some(Ok(Vec::new())),
            };
        }

        if results.iter().any(Option::is_none) {
            debug!(pid = self.child.id(), "mongosh exited with its output still open");
            self.kill_group();
            let deadline = Instant::now() + TERMINATE_GRACE;
            for (slot, reader) in results.iter_mut().zip(readers) {
                if slot.is_none() {
                    if let Some(reader) = reader {
                        *slot = receive(reader, deadline);
                    }
                }
            }
        }

        results.map(|result| match result {
            Some(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Some(Err(err)) => {
                warn!(%err, "failed to read mongosh output");
                String::new()
            }
            None => {
                warn!("mongosh output pipe still open after exit; output discarded");
                String::new()
            }
        })
    }

    fn kill_group(&self) {
        #[cfg(unix)]
        {
            if let Ok(pid) = i32::try_from(self.child.id()) {
                signal_group(
                    nix::unistd::Pid::from_raw(pid),
                    nix::sys::signal::Signal::SIGKILL,
                );
            }
        }
    }

    /// Stop the process and reap it. Captured output is discarded.
    pub fn terminate(mut self) {
        #[cfg(unix)]
        {
            if let Ok(pid) = i32::try_from(self.child.id()) {
                let pgid = nix::unistd::Pid::from_raw(pid);
                signal_group(pgid, nix::sys::signal::Signal::SIGTERM);
                if matches!(self.child.wait_timeout(TERMINATE_GRACE), Ok(Some(_))) {
                    return;
                }
                signal_group(pgid, nix::sys::signal::Signal::SIGKILL);
            }
        }
        if let Err(err) = self.child.kill() {
            if err.kind() != io::ErrorKind::InvalidInput {
                debug!(%err, "kill after timeout failed");
            }
        }
        if let Err(err) = self.child.wait() {
            warn!("failed to reap timed-out mongosh: {err}");
        }
        // Detached: an escaped grandchild may still hold a pipe open.
        drop(self.stdout.take());
        drop(self.stderr.take());
    }
}

#[cfg(unix)]
fn signal_group(pgid: nix::unistd::Pid, signal: nix::sys::signal::Signal) {
    match nix::sys::signal::killpg(pgid, signal) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(err) => debug!(%err, ?signal, "failed to signal mongosh process group"),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> Option<PipeReader>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut reader| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let result = reader.read_to_end(&mut buf).map(|_| buf);
            tx.send(result).ok();
        });
        rx
    })
}

/// Wait for a reader until `deadline`; `None` if it is still blocked.
fn receive(reader: &PipeReader, deadline: Instant) -> Option<io::Result<Vec<u8>>> {
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => Some(result),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "mongosh output reader stopped",
        ))),
    }
}
