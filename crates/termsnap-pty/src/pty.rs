//! Low-level PTY allocation and management
//!
//! Provides PTY handling for Unix-like systems

use crate::PtyError;
use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::pty::{openpty, OpenptyResult, Winsize};
use nix::sys::signal::{kill, Signal};
use nix::unistd::{setsid, Pid};
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::io::unix::AsyncFd;
use tracing::{debug, warn};

/// Default terminal size handed to children
pub const DEFAULT_ROWS: u16 = 24;
pub const DEFAULT_COLS: u16 = 80;

/// How long a child gets between SIGTERM and SIGKILL when dropped
const DROP_GRACE: Duration = Duration::from_millis(500);

/// A pseudo-terminal pair
pub struct Pty {
    /// Leader side, kept by the parent
    master: PtyMaster,

    /// Follower side, handed to the child as its stdio
    slave: OwnedFd,
}

/// Master side of a PTY, in non-blocking mode
#[derive(Debug)]
pub struct PtyMaster {
    file: File,
}

impl Pty {
    /// Allocate a new 80x24 PTY pair
    pub fn new() -> Result<Self, PtyError> {
        Self::with_size(DEFAULT_ROWS, DEFAULT_COLS)
    }

    /// Allocate a new PTY pair with the given dimensions
    pub fn with_size(rows: u16, cols: u16) -> Result<Self, PtyError> {
        let winsize = winsize(rows, cols);

        let OpenptyResult { master, slave } = openpty(Some(&winsize), None)
            .map_err(|e| PtyError::AllocationFailed(format!("openpty failed: {}", e)))?;

        let master_fd = master.as_raw_fd();
        let flags = fcntl(master_fd, FcntlArg::F_GETFL)
            .map_err(|e| PtyError::AllocationFailed(format!("Failed to read flags: {}", e)))?;
        fcntl(
            master_fd,
            FcntlArg::F_SETFL(OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK),
        )
        .map_err(|e| PtyError::AllocationFailed(format!("Failed to set non-blocking: {}", e)))?;

        // Neither side should leak into the child beyond its stdio
        for fd in [master_fd, slave.as_raw_fd()] {
            fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
                .map_err(|e| PtyError::AllocationFailed(format!("Failed to set cloexec: {}", e)))?;
        }

        Ok(Self {
            master: PtyMaster {
                file: File::from(master),
            },
            slave,
        })
    }

    /// Get the master side of the PTY
    pub fn master(&self) -> &PtyMaster {
        &self.master
    }

    /// Spawn a process in the PTY.
    ///
    /// The child gets the follower side as stdin, stdout and stderr, starts a
    /// new session and takes the PTY as its controlling terminal. The parent's
    /// copies of the follower are closed before this returns, so the leader
    /// sees end-of-stream once the child and its descendants exit.
    pub fn spawn(self, mut command: Command) -> Result<PtyProcess, PtyError> {
        let Self { master, slave } = self;

        let stdin = slave.try_clone()?;
        let stdout = slave.try_clone()?;
        command
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(slave));

        // SAFETY: only async-signal-safe calls between fork and exec
        unsafe {
            command.pre_exec(|| {
                setsid().map_err(io::Error::from)?;
                if libc::ioctl(0, libc::TIOCSCTTY as _, 0) < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = command
            .spawn()
            .map_err(|e| PtyError::SpawnFailed(format!("{:?}: {}", command.get_program(), e)))?;
        debug!("Spawned pid {} in PTY", child.id());

        // Dropping `command` here releases the parent's follower descriptors
        drop(command);

        Ok(PtyProcess { master, child })
    }
}

impl PtyMaster {
    /// Duplicate the descriptor; both handles refer to the same leader
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
        })
    }

    /// Non-blocking read; `WouldBlock` when nothing is pending
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.file).read(buf)
    }
}

impl AsRawFd for PtyMaster {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

fn winsize(rows: u16, cols: u16) -> Winsize {
    Winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    }
}

/// A process running in a PTY
///
/// Dropping it terminates the child if it is still running and reaps it.
pub struct PtyProcess {
    master: PtyMaster,
    child: Child,
}

impl PtyProcess {
    /// Get the process ID
    pub fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    /// Get the master PTY
    pub fn master(&self) -> &PtyMaster {
        &self.master
    }

    /// True until the child has exited
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Wait for the process to exit
    pub fn wait(&mut self) -> Result<i32, PtyError> {
        let status = self.child.wait()?;
        Ok(exit_code(status))
    }

    /// Send SIGTERM
    pub fn kill(&self) -> Result<(), PtyError> {
        kill(self.pid(), Signal::SIGTERM).map_err(|e| PtyError::IoError(io::Error::from(e)))
    }

    /// Stop the child if it is still running and reap it.
    ///
    /// Sends SIGTERM, waits up to `grace` for it to exit, then sends SIGKILL.
    pub fn terminate_and_wait(&mut self, grace: Duration) -> Result<i32, PtyError> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(exit_code(status));
        }

        debug!("Terminating pid {}", self.child.id());
        if let Err(e) = self.kill() {
            debug!("SIGTERM failed: {}", e);
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait()? {
                return Ok(exit_code(status));
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        warn!("pid {} ignored SIGTERM, killing", self.child.id());
        self.child.kill()?;
        self.wait()
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        if let Err(e) = self.terminate_and_wait(DROP_GRACE) {
            debug!("Failed to reap child on drop: {}", e);
        }
    }
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => -1,
    }
}

/// Async wrapper for PTY master, driven by the tokio reactor
pub struct AsyncPtyMaster {
    inner: AsyncFd<PtyMaster>,
}

impl AsyncPtyMaster {
    /// Register a PtyMaster with the current runtime
    pub fn new(master: PtyMaster) -> io::Result<Self> {
        Ok(Self {
            inner: AsyncFd::new(master)?,
        })
    }

    /// Read whatever is available, waiting until at least one byte is.
    ///
    /// Cancel-safe: bytes are only consumed once the future completes.
    pub async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.inner.readable().await?;
            match guard.try_io(|inner| inner.get_ref().read(buf)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pty_allocation() {
        let pty = Pty::new().unwrap();
        assert!(pty.master.as_raw_fd() > 0);
        assert!(pty.slave.as_raw_fd() > 0);
    }

    #[test]
    fn test_pty_spawn_echo() {
        let pty = Pty::new().unwrap();
        let mut cmd = Command::new("echo");
        cmd.arg("Hello, PTY!");

        let mut process = pty.spawn(cmd).unwrap();
        let exit_code = process.wait().unwrap();
        assert_eq!(exit_code, 0);
    }

    #[test]
    fn test_exit_code_reported() {
        let pty = Pty::new().unwrap();
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 3"]);

        let mut process = pty.spawn(cmd).unwrap();
        assert_eq!(process.wait().unwrap(), 3);
        assert!(!process.is_alive());
    }

    #[test]
    fn test_terminate_running_child() {
        let pty = Pty::new().unwrap();
        let mut cmd = Command::new("sleep");
        cmd.arg("30");

        let mut process = pty.spawn(cmd).unwrap();
        assert!(process.is_alive());

        let code = process.terminate_and_wait(Duration::from_secs(2)).unwrap();
        assert_eq!(code, 128 + libc::SIGTERM);
    }

    #[test]
    fn test_missing_binary_fails_to_spawn() {
        let pty = Pty::new().unwrap();
        let cmd = Command::new("/nonexistent/termsnap-missing-binary");

        assert!(matches!(pty.spawn(cmd), Err(PtyError::SpawnFailed(_))));
    }
}
