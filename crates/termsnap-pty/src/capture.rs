//! Timed capture of a command's terminal output
//!
//! A [`CaptureSession`] runs one command in a fresh PTY and records the full
//! output accumulated so far at a fixed sampling rate. Each [`Frame`] is a
//! complete history, so a late sample only costs temporal resolution.

use crate::{
    pty::{AsyncPtyMaster, Pty, PtyProcess, DEFAULT_COLS, DEFAULT_ROWS},
    PtyError,
};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

/// Readiness wait per sampling iteration
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Total time spent draining once sampling stops
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Time between SIGTERM and SIGKILL at the end of a capture
const KILL_GRACE: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 4096;

/// Default timeout for [`capture_output`]
pub const DEFAULT_OUTPUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a capture session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapturePhase {
    Spawning,
    Sampling,
    Draining,
    Done,
}

/// One snapshot of everything the command printed up to `elapsed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: usize,
    pub elapsed: Duration,
    pub text: String,
}

/// Builder for capture sessions
#[derive(Debug, Clone)]
pub struct CaptureBuilder {
    program: String,
    args: Vec<String>,
    fps: u32,
    duration: Duration,
    rows: u16,
    cols: u16,
    env_vars: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
}

impl CaptureBuilder {
    /// Run `program` directly with no arguments yet
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            fps: 10,
            duration: Duration::from_secs(5),
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            env_vars: Vec::new(),
            current_dir: None,
        }
    }

    /// Run a command line through `sh -c`
    pub fn shell(command_line: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(command_line)
    }

    /// Run an argv vector; an empty one spawns nothing and fails at run time
    pub fn argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().unwrap_or_default();
        let mut builder = Self::new(program);
        builder.args.extend(argv);
        builder
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Snapshots per second; zero is treated as one
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    /// Upper bound on how long the command may run
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set terminal dimensions
    pub fn dimensions(mut self, rows: u16, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Working directory for the command
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> CaptureSession {
        CaptureSession {
            config: self,
            phase: CapturePhase::Spawning,
            buffer: Vec::new(),
            frames: Vec::new(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (key, value) in &self.env_vars {
            command.env(key, value);
        }
        command.env("TERM", "xterm-256color");
        command.env("COLORTERM", "truecolor");
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// A single capture run
#[derive(Debug)]
pub struct CaptureSession {
    config: CaptureBuilder,
    phase: CapturePhase,

    /// Raw bytes read so far; decoded only when a frame is taken
    buffer: Vec<u8>,
    frames: Vec<Frame>,
}

impl CaptureSession {
    /// Run the command to completion or until the duration bound, returning
    /// every non-blank snapshot in capture order.
    pub async fn run(mut self) -> Result<Vec<Frame>, PtyError> {
        self.enter(CapturePhase::Spawning);
        if self.config.program.is_empty() {
            return Err(PtyError::SpawnFailed("empty command".to_string()));
        }

        let pty = Pty::with_size(self.config.rows, self.config.cols)?;
        let mut process = pty.spawn(self.config.command())?;
        let master = AsyncPtyMaster::new(process.master().try_clone()?)?;

        let start = Instant::now();
        self.enter(CapturePhase::Sampling);
        self.sample(&master, &mut process, start).await;

        self.enter(CapturePhase::Draining);
        self.drain(&master).await;
        self.snapshot(start);
        drop(master);

        let code = process.terminate_and_wait(KILL_GRACE)?;
        self.enter(CapturePhase::Done);

        info!(
            "Captured {} frames ({} bytes) from {:?} in {:.2?}, exit code {}",
            self.frames.len(),
            self.buffer.len(),
            self.config.program,
            start.elapsed(),
            code
        );
        Ok(self.frames)
    }

    /// Build a current-thread runtime and run on it
    pub fn run_blocking(self) -> Result<Vec<Frame>, PtyError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run())
    }

    async fn sample(&mut self, master: &AsyncPtyMaster, process: &mut PtyProcess, start: Instant) {
        let interval = Duration::from_secs_f64(1.0 / f64::from(self.config.fps));
        let mut last_snapshot = start;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if start.elapsed() >= self.config.duration {
                debug!("Duration bound of {:?} reached", self.config.duration);
                break;
            }

            match timeout(POLL_TIMEOUT, master.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    debug!("PTY closed");
                    break;
                }
                Ok(Ok(n)) => self.buffer.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => {
                    // EIO once the last follower descriptor closes
                    debug!("PTY read ended: {}", e);
                    break;
                }
                Err(_) => {}
            }

            let now = Instant::now();
            if now.duration_since(last_snapshot) >= interval {
                self.snapshot(start);
                last_snapshot = now;
            }

            if !process.is_alive() {
                debug!("Child exited");
                break;
            }
        }
    }

    /// Read what is left, stopping at `DRAIN_GRACE` even if the child
    /// keeps printing
    async fn drain(&mut self, master: &AsyncPtyMaster) {
        let deadline = Instant::now() + DRAIN_GRACE;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("Drain grace elapsed");
                break;
            }
            match timeout(remaining, master.read(&mut chunk)).await {
                Ok(Ok(n)) if n > 0 => self.buffer.extend_from_slice(&chunk[..n]),
                _ => break,
            }
        }
    }

    /// Record the buffer as a frame unless nothing visible has been printed
    fn snapshot(&mut self, start: Instant) {
        let text = String::from_utf8_lossy(&self.buffer);
        if text.trim().is_empty() {
            return;
        }

        self.frames.push(Frame {
            index: self.frames.len(),
            elapsed: start.elapsed(),
            text: text.into_owned(),
        });
    }

    fn enter(&mut self, phase: CapturePhase) {
        debug!("Capture phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

/// Run a command without a PTY and return stderr followed by stdout.
///
/// The child is killed if it outlives `limit`.
pub async fn capture_output(command: Command, limit: Duration) -> Result<String, PtyError> {
    let mut command = tokio::process::Command::from(command);
    command
        .env("TERM", "xterm-256color")
        .env("COLORTERM", "truecolor")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let program = format!("{:?}", command.as_std().get_program());
    let child = command
        .spawn()
        .map_err(|e| PtyError::SpawnFailed(format!("{}: {}", program, e)))?;

    let output = timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| PtyError::Timeout(limit))??;
    debug!(
        "{} exited with {} ({} bytes stdout, {} bytes stderr)",
        program,
        output.status,
        output.stdout.len(),
        output.stderr.len()
    );

    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_and_fps_floor() {
        let builder = CaptureBuilder::shell("true").fps(0);
        assert_eq!(builder.fps, 1);
        assert_eq!(builder.program, "sh");
        assert_eq!(builder.args, vec!["-c", "true"]);
    }

    #[test]
    fn argv_splits_program_and_args() {
        let builder = CaptureBuilder::argv(["ls", "-la", "/tmp"]);
        assert_eq!(builder.program, "ls");
        assert_eq!(builder.args, vec!["-la", "/tmp"]);
    }

    #[test]
    fn command_sets_terminal_env() {
        let command = CaptureBuilder::new("env").env("FOO", "bar").command();
        let envs: Vec<_> = command
            .get_envs()
            .map(|(k, v)| (k.to_owned(), v.map(|v| v.to_owned())))
            .collect();
        assert!(envs.contains(&("TERM".into(), Some("xterm-256color".into()))));
        assert!(envs.contains(&("COLORTERM".into(), Some("truecolor".into()))));
        assert!(envs.contains(&("FOO".into(), Some("bar".into()))));
        assert_eq!(command.get_current_dir(), None);
    }

    #[test]
    fn command_uses_working_directory() {
        let command = CaptureBuilder::new("pwd").current_dir("/tmp").command();
        assert_eq!(command.get_current_dir(), Some(std::path::Path::new("/tmp")));
    }

    #[test]
    fn blank_buffers_are_not_snapshotted() {
        let mut session = CaptureBuilder::shell("true").build();
        let start = Instant::now();

        session.buffer.extend_from_slice(b"  \r\n");
        session.snapshot(start);
        assert!(session.frames.is_empty());

        session.buffer.extend_from_slice(b"hi");
        session.snapshot(start);
        assert_eq!(session.frames.len(), 1);
        assert_eq!(session.frames[0].index, 0);
    }

    #[test]
    fn split_multibyte_character_survives_between_reads() {
        let mut session = CaptureBuilder::shell("true").build();
        let start = Instant::now();
        let bytes = "ok é".as_bytes();
        let (head, tail) = bytes.split_at(bytes.len() - 1);

        session.buffer.extend_from_slice(head);
        session.snapshot(start);
        assert_eq!(session.frames[0].text, "ok \u{fffd}");

        session.buffer.extend_from_slice(tail);
        session.snapshot(start);
        assert_eq!(session.frames[1].text, "ok é");
    }

    #[tokio::test]
    async fn empty_argv_fails_to_spawn() {
        let result = CaptureBuilder::argv(Vec::<String>::new()).build().run().await;
        assert!(matches!(result, Err(PtyError::SpawnFailed(_))));
    }
}
