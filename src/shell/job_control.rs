//! Background job bookkeeping.
//!
//! The `JobTable` remembers which background process belongs to which command
//! line. The reaper half collects terminated children without blocking and
//! turns the ones the table knows about into notifications.
//!
//! Job numbers are positions. A job is announced with the position it lands
//! in, and every listing renumbers from 1, so after a removal a previously
//! announced number can refer to a different job.

use std::fmt;

use log::{debug, error, info};
use nix::{
    errno::Errno,
    sys::{
        signal::{self, SigHandler, Signal},
        wait::{self, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};

use crate::errors::{ErrorKind, Result, ResultExt};

/// Default maximum number of tracked background jobs.
pub const MAX_JOBS: usize = 64;

/// Longest command text kept for display, in characters.
pub const JOB_TEXT_LEN: usize = 255;

/// Keyboard signals the interactive shell ignores. Foreground children get
/// the default handlers back; background children keep ignoring them.
pub(crate) const INTERACTIVE_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

/// Makes ^C and ^\ reach only the foreground children, not the shell.
pub fn ignore_interactive_signals() -> Result<()> {
    for &sig in &INTERACTIVE_SIGNALS {
        // Safety: installs SIG_IGN, no handler code runs.
        unsafe { signal::signal(sig, SigHandler::SigIgn) }
            .chain_err(|| ErrorKind::Resource(format!("ignoring {:?}", sig)))?;
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pid: Pid,
    command: String,
}

impl Job {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    capacity: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        JobTable::with_capacity(MAX_JOBS)
    }
}

impl JobTable {
    pub fn with_capacity(capacity: usize) -> JobTable {
        JobTable {
            jobs: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Tracks `pid` and returns its 1-based job number.
    ///
    /// Fails when the table is full; the process keeps running untracked.
    pub fn insert(&mut self, pid: Pid, command: &str) -> Result<usize> {
        if self.jobs.len() >= self.capacity {
            return Err(ErrorKind::JobTableFull(pid.as_raw()).into());
        }

        self.jobs.push(Job {
            pid,
            command: command.chars().take(JOB_TEXT_LEN).collect(),
        });
        let number = self.jobs.len();
        debug!("tracking job [{}] {} {}", number, pid, command);
        Ok(number)
    }

    /// Stops tracking `pid`. Later jobs move down one position.
    pub fn remove(&mut self, pid: Pid) -> Option<Job> {
        let index = self.jobs.iter().position(|job| job.pid == pid)?;
        Some(self.jobs.remove(index))
    }

    /// Current 1-based position and record of the job tracking `pid`.
    pub fn find(&self, pid: Pid) -> Option<(usize, &Job)> {
        self.jobs
            .iter()
            .position(|job| job.pid == pid)
            .map(|i| (i + 1, &self.jobs[i]))
    }

    /// Jobs in insertion order, numbered by their current position.
    pub fn list(&self) -> impl Iterator<Item = (usize, &Job)> {
        self.jobs.iter().enumerate().map(|(i, job)| (i + 1, job))
    }

    /// Collects every terminated child without blocking.
    ///
    /// Safe to call when nothing has terminated or there are no children at
    /// all. Children the table does not track are reaped silently.
    pub fn reap(&mut self) -> Vec<JobNotification> {
        self.reap_with(|| wait::waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)))
    }

    /// `reap` with the wait call supplied by the caller.
    pub fn reap_with<F>(&mut self, mut poll: F) -> Vec<JobNotification>
    where
        F: FnMut() -> nix::Result<WaitStatus>,
    {
        let mut notifications = Vec::new();
        loop {
            let status = match poll() {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    error!("waitpid failed while reaping: {}", e);
                    eprintln!("fcsh: waitpid: {}", e);
                    break;
                }
                Ok(status) => status,
            };

            let pid = match status.pid() {
                Some(pid) => pid,
                None => break,
            };

            let number = match self.find(pid) {
                Some((number, _)) => number,
                None => {
                    debug!("reaped untracked child {}: {:?}", pid, status);
                    continue;
                }
            };

            if let Some(job) = self.remove(pid) {
                info!("job [{}] {} finished: {:?}", number, pid, status);
                notifications.push(JobNotification {
                    number,
                    pid,
                    command: job.command,
                    outcome: JobOutcome::from(status),
                });
            }
        }

        notifications
    }
}

/// How a background job ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Exited(i32),
    Signaled(i32),
    Other,
}

impl From<WaitStatus> for JobOutcome {
    fn from(status: WaitStatus) -> Self {
        match status {
            WaitStatus::Exited(_, code) => JobOutcome::Exited(code),
            WaitStatus::Signaled(_, signal, _) => JobOutcome::Signaled(signal as i32),
            _ => JobOutcome::Other,
        }
    }
}

/// Announcement that a tracked job has terminated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobNotification {
    /// Position the job held when it was reaped.
    pub number: usize,
    pub pid: Pid,
    pub command: String,
    pub outcome: JobOutcome,
}

impl fmt::Display for JobNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            JobOutcome::Exited(code) => {
                write!(f, "[{}] Done    {} (exit {})", self.number, self.command, code)
            }
            JobOutcome::Signaled(signal) => write!(
                f,
                "[{}] Killed  {} (signal {})",
                self.number, self.command, signal
            ),
            JobOutcome::Other => write!(f, "[{}] Finished {}", self.number, self.command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    fn table_with(pids: &[i32]) -> JobTable {
        let mut table = JobTable::default();
        for p in pids {
            table.insert(pid(*p), &format!("sleep {}", p)).unwrap();
        }
        table
    }

    /// Feeds `events` to the reaper, then reports that no children are left.
    fn scripted(events: Vec<nix::Result<WaitStatus>>) -> impl FnMut() -> nix::Result<WaitStatus> {
        let mut events = events.into_iter();
        move || events.next().unwrap_or(Err(Errno::ECHILD))
    }

    #[test]
    fn test_insert_returns_position() {
        let mut table = JobTable::default();
        assert_eq!(table.insert(pid(100), "sleep 5").unwrap(), 1);
        assert_eq!(table.insert(pid(101), "sleep 6").unwrap(), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_remove_renumbers_listing() {
        let mut table = table_with(&[100, 200, 300]);
        let removed = table.remove(pid(200)).unwrap();
        assert_eq!(removed.command(), "sleep 200");

        let listing: Vec<(usize, Pid, &str)> = table
            .list()
            .map(|(n, job)| (n, job.pid(), job.command()))
            .collect();
        assert_eq!(
            listing,
            vec![(1, pid(100), "sleep 100"), (2, pid(300), "sleep 300")]
        );
    }

    #[test]
    fn test_numbers_are_reused_after_removal() {
        let mut table = table_with(&[100, 200]);
        table.remove(pid(100));
        assert_eq!(table.insert(pid(300), "sleep 300").unwrap(), 2);
        // announced as [2], now listed as [1]
        assert_eq!(table.find(pid(200)).unwrap().0, 1);
        assert_eq!(table.find(pid(300)).unwrap().0, 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut table = table_with(&[100]);
        assert_eq!(table.remove(pid(999)), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_capacity() {
        let mut table = JobTable::with_capacity(2);
        table.insert(pid(1), "a").unwrap();
        table.insert(pid(2), "b").unwrap();
        match *table.insert(pid(3), "c").unwrap_err().kind() {
            ErrorKind::JobTableFull(3) => {}
            ref other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_command_text_is_capped() {
        let mut table = JobTable::default();
        let long = "x".repeat(JOB_TEXT_LEN + 50);
        table.insert(pid(1), &long).unwrap();
        assert_eq!(table.list().next().unwrap().1.command().len(), JOB_TEXT_LEN);
    }

    #[test]
    fn test_reap_exited_and_signaled() {
        let mut table = table_with(&[100, 200, 300]);
        let notifications = table.reap_with(scripted(vec![
            Ok(WaitStatus::Exited(pid(200), 0)),
            Ok(WaitStatus::Signaled(pid(300), Signal::SIGKILL, false)),
            Ok(WaitStatus::StillAlive),
        ]));

        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].to_string(), "[2] Done    sleep 200 (exit 0)");
        assert_eq!(notifications[1].to_string(), "[2] Killed  sleep 300 (signal 9)");
        assert_eq!(table.len(), 1);
        assert!(table.find(pid(100)).is_some());
    }

    #[test]
    fn test_reap_ignores_untracked_children() {
        let mut table = table_with(&[100]);
        let notifications = table.reap_with(scripted(vec![
            Ok(WaitStatus::Exited(pid(555), 1)),
            Ok(WaitStatus::Exited(pid(100), 3)),
        ]));
        assert_eq!(
            notifications,
            vec![JobNotification {
                number: 1,
                pid: pid(100),
                command: "sleep 100".into(),
                outcome: JobOutcome::Exited(3),
            }]
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_reap_is_idempotent() {
        let mut table = table_with(&[100]);
        let first = table.reap_with(scripted(vec![Ok(WaitStatus::Exited(pid(100), 0))]));
        assert_eq!(first.len(), 1);

        let second = table.reap_with(scripted(vec![Ok(WaitStatus::StillAlive)]));
        assert!(second.is_empty());
        let third = table.reap_with(scripted(vec![]));
        assert!(third.is_empty());
    }

    #[test]
    fn test_reap_stops_on_os_error() {
        let mut table = table_with(&[100]);
        let notifications = table.reap_with(scripted(vec![
            Err(Errno::EINVAL),
            Ok(WaitStatus::Exited(pid(100), 0)),
        ]));
        assert!(notifications.is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reap_retries_on_interrupt() {
        let mut table = table_with(&[100]);
        let notifications = table.reap_with(scripted(vec![
            Err(Errno::EINTR),
            Ok(WaitStatus::Exited(pid(100), 0)),
        ]));
        assert_eq!(notifications.len(), 1);
    }

    #[test]
    fn test_other_outcome() {
        let notification = JobNotification {
            number: 4,
            pid: pid(1),
            command: "top".into(),
            outcome: JobOutcome::from(WaitStatus::Continued(pid(1))),
        };
        assert_eq!(notification.to_string(), "[4] Finished top");
    }
}
