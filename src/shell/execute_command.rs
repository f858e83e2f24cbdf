//! Process Launcher
//!
//! Forks one child per command, wires its descriptors (pipe ends first, file
//! redirections after, so a file always wins over the pipe) and replaces the
//! child's image with the program. The parent either waits for every child or
//! hands the consumer's pid to the job table.
//!
//! Everything the child needs is converted to C strings before forking; after
//! the fork the child only makes system calls and never returns into the
//! shell.

use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::Write;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::process::ExitStatus;

use log::{debug, info, warn};
use nix::{
    errno::Errno,
    fcntl::{self, OFlag},
    libc,
    sys::{
        signal::{self, SigHandler, Signal},
        stat::Mode,
        wait::{self, WaitStatus},
    },
    unistd::{self, ForkResult, Pid},
};

use crate::core::pipeline::{CommandSpec, Pipeline, Stages};
use crate::errors::{Error, ErrorKind, Result, ResultExt};
use crate::shell::job_control::{JobTable, INTERACTIVE_SIGNALS};
use crate::util::{ShellExitStatusExt, SIGNAL_EXIT_STATUS_BASE};

pub const COMMAND_NOT_FOUND_EXIT_STATUS: i32 = 127;
pub const COMMAND_NOT_EXECUTABLE_EXIT_STATUS: i32 = 126;
pub const REDIRECT_FAILED_EXIT_STATUS: i32 = 1;

const OUTPUT_FILE_MODE: libc::mode_t = 0o644;

/// What the caller gets back once a pipeline is running (or finished).
#[derive(Debug, PartialEq)]
pub enum Launch {
    /// Status of the last command in the pipeline.
    Foreground(ExitStatus),
    /// `job` is `None` when the job table was full.
    Background { job: Option<usize>, pid: Pid },
}

/// Runs `pipeline`.
///
/// Foreground pipelines block until every child has terminated. Background
/// pipelines are registered in `jobs` under the consumer's pid and an
/// acknowledgement `[job] pid` is written to `stdout`.
pub fn launch(pipeline: &Pipeline, jobs: &mut JobTable, stdout: &mut dyn Write) -> Result<Launch> {
    // anything still buffered would otherwise land after the children's output
    stdout.flush()?;

    let background = pipeline.background;
    let spawned = match pipeline.stages {
        Stages::Single(ref command) => spawn_single(command, background)?,
        Stages::Piped(ref producer, ref consumer) => spawn_piped(producer, consumer, background)?,
    };

    if background {
        let command = pipeline.to_string();
        let job = match jobs.insert(spawned.tracked, &command) {
            Ok(number) => {
                writeln!(stdout, "[{}] {}", number, spawned.tracked)?;
                stdout.flush()?;
                Some(number)
            }
            Err(e) => {
                warn!("{} keeps running untracked: {}", spawned.tracked, e);
                eprintln!("fcsh: {}", e);
                None
            }
        };

        return Ok(Launch::Background {
            job,
            pid: spawned.tracked,
        });
    }

    wait_for_all(&spawned.pids).map(Launch::Foreground)
}

struct Spawned {
    /// Every child, in fork order.
    pids: Vec<Pid>,
    /// The child whose termination ends the job.
    tracked: Pid,
}

/// A command converted for `execvp` and `open`.
#[derive(Debug)]
struct PreparedCommand {
    argv: Vec<CString>,
    input: Option<CString>,
    output: Option<CString>,
    /// Leaves keyboard signals ignored in the child.
    background: bool,
}

impl PreparedCommand {
    fn new(spec: &CommandSpec, background: bool) -> Result<PreparedCommand> {
        if spec.argv.is_empty() {
            return Err(Error::syntax("no command to execute"));
        }

        Ok(PreparedCommand {
            argv: spec
                .argv
                .iter()
                .map(|arg| to_cstring(arg))
                .collect::<Result<_>>()?,
            input: spec.input.as_ref().map(|p| to_cstring(p)).transpose()?,
            output: spec.output.as_ref().map(|p| to_cstring(p)).transpose()?,
            background,
        })
    }
}

fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::syntax(format!("{:?} contains a NUL byte", s)))
}

#[derive(Clone, Copy, Debug)]
enum PipeEnd {
    Read,
    Write,
}

/// The pipe a child connects to, and which end it keeps.
#[derive(Clone, Copy, Debug)]
struct PipeConnection {
    read: RawFd,
    write: RawFd,
    end: PipeEnd,
}

fn spawn_single(command: &CommandSpec, background: bool) -> Result<Spawned> {
    let prepared = PreparedCommand::new(command, background)?;
    let pid = fork_exec(&prepared, None)?;
    info!("started {} as {}", command, pid);
    Ok(Spawned {
        pids: vec![pid],
        tracked: pid,
    })
}

fn spawn_piped(producer: &CommandSpec, consumer: &CommandSpec, background: bool) -> Result<Spawned> {
    let prepared_producer = PreparedCommand::new(producer, background)?;
    let prepared_consumer = PreparedCommand::new(consumer, background)?;

    // Both children inherit the pipe, so it must exist before either fork.
    // The files close the parent's copies on every return path below.
    let (read_end, write_end) = create_pipe()?;
    let connect = |end| PipeConnection {
        read: read_end.as_raw_fd(),
        write: write_end.as_raw_fd(),
        end,
    };

    let left = fork_exec(&prepared_producer, Some(connect(PipeEnd::Write)))?;
    let right = fork_exec(&prepared_consumer, Some(connect(PipeEnd::Read)));

    // The consumer only sees end-of-input once the parent's write end is gone.
    drop(read_end);
    drop(write_end);

    let right = match right {
        Ok(pid) => pid,
        Err(e) => {
            warn!("producer {} left to the reaper after failed fork", left);
            return Err(e);
        }
    };

    info!("started {} as {} | {} as {}", producer, left, consumer, right);
    Ok(Spawned {
        pids: vec![left, right],
        tracked: right,
    })
}

/// Wraps `unistd::pipe()` to return RAII structs instead of raw, owning file descriptors
/// Returns (`read_end_pipe`, `write_end_pipe`)
fn create_pipe() -> Result<(File, File)> {
    // IMPORTANT: immediately pass the RawFds returned by unistd::pipe()
    // into RAII structs (File) so an early return cannot leak them.
    let (read_end_pipe, write_end_pipe) =
        unistd::pipe().chain_err(|| ErrorKind::Resource("pipe".to_string()))?;
    unsafe {
        Ok((
            File::from_raw_fd(read_end_pipe),
            File::from_raw_fd(write_end_pipe),
        ))
    }
}

fn fork_exec(command: &PreparedCommand, pipe: Option<PipeConnection>) -> Result<Pid> {
    // Safety: the child branch only performs async-signal-safe system calls
    // on data prepared before the fork, then execs or exits.
    let fork_result =
        unsafe { unistd::fork() }.chain_err(|| ErrorKind::Resource("fork".to_string()))?;
    match fork_result {
        ForkResult::Parent { child } => {
            debug!("forked {} with pipe {:?}", child, pipe);
            Ok(child)
        }
        ForkResult::Child => exec_child(command, pipe),
    }
}

fn exec_child(command: &PreparedCommand, pipe: Option<PipeConnection>) -> ! {
    // The Rust runtime ignores SIGPIPE; a producer must die when its consumer exits.
    let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };
    if !command.background {
        for &sig in &INTERACTIVE_SIGNALS {
            let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
        }
    }

    if let Some(pipe) = pipe {
        let (fd, target) = match pipe.end {
            PipeEnd::Write => (pipe.write, libc::STDOUT_FILENO),
            PipeEnd::Read => (pipe.read, libc::STDIN_FILENO),
        };
        if let Err(e) = unistd::dup2(fd, target) {
            child_fail(&[&b"dup2 pipe"[..]], Some(e), REDIRECT_FAILED_EXIT_STATUS);
        }
        let _ = unistd::close(pipe.read);
        let _ = unistd::close(pipe.write);
    }

    if let Some(ref path) = command.input {
        redirect(path, OFlag::O_RDONLY, Mode::empty(), libc::STDIN_FILENO);
    }
    if let Some(ref path) = command.output {
        redirect(
            path,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::from_bits_truncate(OUTPUT_FILE_MODE),
            libc::STDOUT_FILENO,
        );
    }

    let program = command.argv[0].to_bytes();
    match unistd::execvp(&command.argv[0], &command.argv) {
        Ok(never) => match never {},
        Err(Errno::ENOENT) => child_fail(
            &[program, &b": command not found"[..]],
            None,
            COMMAND_NOT_FOUND_EXIT_STATUS,
        ),
        Err(e) => child_fail(&[program], Some(e), COMMAND_NOT_EXECUTABLE_EXIT_STATUS),
    }
}

/// Opens `path` and moves it onto `target`. Runs in the child only.
fn redirect(path: &CStr, flags: OFlag, mode: Mode, target: RawFd) {
    let fd = match fcntl::open(path, flags, mode) {
        Ok(fd) => fd,
        Err(e) => child_fail(&[path.to_bytes()], Some(e), REDIRECT_FAILED_EXIT_STATUS),
    };

    if fd != target {
        if let Err(e) = unistd::dup2(fd, target) {
            let _ = unistd::close(fd);
            child_fail(&[&b"dup2 "[..], path.to_bytes()], Some(e), REDIRECT_FAILED_EXIT_STATUS);
        }
        let _ = unistd::close(fd);
    }
}

/// Reports `fcsh: <parts>[: <errno>]` on stderr and exits the child.
fn child_fail(parts: &[&[u8]], errno: Option<Errno>, code: i32) -> ! {
    let _ = unistd::write(libc::STDERR_FILENO, b"fcsh: ");
    for part in parts {
        let _ = unistd::write(libc::STDERR_FILENO, part);
    }
    if let Some(errno) = errno {
        let _ = unistd::write(libc::STDERR_FILENO, b": ");
        let _ = unistd::write(libc::STDERR_FILENO, errno.desc().as_bytes());
    }
    let _ = unistd::write(libc::STDERR_FILENO, b"\n");
    // Safety: skips atexit handlers and stdio buffers that belong to the parent.
    unsafe { libc::_exit(code) }
}

/// Waits for every pid in turn, even after a failed wait, and returns the
/// status of the last one or the first error.
fn wait_for_all(pids: &[Pid]) -> Result<ExitStatus> {
    let mut status = Ok(ExitStatus::from_success());
    for &pid in pids {
        let result = wait_for_process(pid);
        if status.is_ok() {
            status = result;
        }
    }
    status
}

fn wait_for_process(pid: Pid) -> Result<ExitStatus> {
    loop {
        match wait::waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, status)) => return Ok(ExitStatus::from_status(status)),
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                return Ok(ExitStatus::from_status(
                    SIGNAL_EXIT_STATUS_BASE + signal as i32,
                ))
            }
            Ok(status) => debug!("still waiting for {}: {:?}", pid, status),
            Err(Errno::EINTR) => continue,
            Err(e) => {
                return Err(Error::with_chain(
                    e,
                    ErrorKind::Resource(format!("waitpid {}", pid)),
                ))
            }
        }
    }
}
