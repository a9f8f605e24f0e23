//! Managed target process: launch, supervise, two-phase stop, state reset.
//!
//! The target application runs as a separate process. A supervising thread
//! owns the [`Child`] and blocks on `wait()`, reporting the exit status
//! over a channel; the exploration logic never touches the child directly.
//! Stopping is two-phase: request graceful termination, wait a bounded
//! grace period, then force-kill, and finally join the supervising thread
//! so no orphan survives a recovery cycle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

/// Errors from process lifecycle management.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to launch {path}: {source}")]
    Spawn { path: PathBuf, source: io::Error },

    #[error("process survived forced kill")]
    Unstoppable,

    #[error("reset script {path} exited with {status}")]
    ResetScript { path: PathBuf, status: ExitStatus },

    #[error("failed to run reset script {path}: {source}")]
    ResetScriptSpawn { path: PathBuf, source: io::Error },

    #[error("failed to stage executable copy: {0}")]
    Staging(#[from] io::Error),
}

/// How to return the target application's persistent state to a known
/// baseline before each relaunch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Just relaunch.
    #[default]
    None,
    /// Re-stage a pristine copy of the executable's directory into a
    /// scratch location and launch the staged copy.
    CopyReset,
    /// Run a user script to completion before relaunching.
    ExternalReset { script: PathBuf },
}

impl ResetPolicy {
    /// Parse the configuration keyword (`none`, `copy_reset`,
    /// `external_reset`).
    pub fn parse(keyword: &str, script: Option<&Path>) -> Result<Self, String> {
        match keyword {
            "none" => Ok(ResetPolicy::None),
            "copy_reset" => Ok(ResetPolicy::CopyReset),
            "external_reset" => match script {
                Some(path) => Ok(ResetPolicy::ExternalReset {
                    script: path.to_owned(),
                }),
                None => Err("external_reset requires a reset script path".to_owned()),
            },
            other => Err(format!("unknown reset policy `{other}`")),
        }
    }
}

/// Configuration of the managed process.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Path to the target executable.
    pub executable: PathBuf,
    /// How long to wait after launch before the application is assumed
    /// ready.
    pub startup_delay: Duration,
    /// Grace period between the termination request and the forced kill.
    pub stop_grace: Duration,
    /// State reset applied before every relaunch.
    pub reset_policy: ResetPolicy,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::new(),
            startup_delay: Duration::from_secs(5),
            stop_grace: Duration::from_secs(5),
            reset_policy: ResetPolicy::None,
        }
    }
}

/// Lifecycle control the explorer drives during recovery.
pub trait ProcessControl {
    /// Launch the target if it is not already running.
    fn ensure_running(&mut self) -> Result<(), ProcessError>;

    /// Stop the live instance if any, apply the reset policy, and launch a
    /// fresh instance.
    fn relaunch(&mut self) -> Result<(), ProcessError>;

    /// Stop the live instance if any.
    fn shutdown(&mut self) -> Result<(), ProcessError>;
}

struct RunningChild {
    pid: u32,
    exit_rx: Receiver<io::Result<ExitStatus>>,
    monitor: JoinHandle<()>,
}

/// A real target process managed through [`ProcessConfig`].
pub struct TargetProcess {
    config: ProcessConfig,
    running: Option<RunningChild>,
    /// Scratch directory used by [`ResetPolicy::CopyReset`].
    scratch: PathBuf,
}

impl TargetProcess {
    pub fn new(config: ProcessConfig) -> Self {
        let scratch = std::env::temp_dir().join(format!("uimap-stage-{}", std::process::id()));
        Self {
            config,
            running: None,
            scratch,
        }
    }

    /// Whether a live instance exists (and has not been observed to exit).
    pub fn is_running(&mut self) -> bool {
        let exited = match &self.running {
            None => return false,
            Some(child) => !matches!(child.exit_rx.try_recv(), Err(TryRecvError::Empty)),
        };
        if exited {
            self.reap();
        }
        !exited
    }

    fn reap(&mut self) {
        if let Some(child) = self.running.take() {
            let _ = child.monitor.join();
        }
    }

    /// Apply the reset policy and return the path to launch.
    fn prepare_launch(&self) -> Result<PathBuf, ProcessError> {
        match &self.config.reset_policy {
            ResetPolicy::None => Ok(self.config.executable.clone()),
            ResetPolicy::ExternalReset { script } => {
                info!("running reset script {}", script.display());
                let status = Command::new(script)
                    .status()
                    .map_err(|source| ProcessError::ResetScriptSpawn {
                        path: script.clone(),
                        source,
                    })?;
                if !status.success() {
                    return Err(ProcessError::ResetScript {
                        path: script.clone(),
                        status,
                    });
                }
                Ok(self.config.executable.clone())
            }
            ResetPolicy::CopyReset => {
                let source_dir = self
                    .config
                    .executable
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                info!(
                    "re-staging {} into {}",
                    source_dir.display(),
                    self.scratch.display()
                );
                if self.scratch.exists() {
                    fs::remove_dir_all(&self.scratch)?;
                }
                copy_dir_recursive(source_dir, &self.scratch)?;
                let file_name = self
                    .config
                    .executable
                    .file_name()
                    .ok_or_else(|| ProcessError::Spawn {
                        path: self.config.executable.clone(),
                        source: io::Error::new(io::ErrorKind::NotFound, "no executable file name"),
                    })?;
                Ok(self.scratch.join(file_name))
            }
        }
    }

    fn start(&mut self) -> Result<(), ProcessError> {
        let path = self.prepare_launch()?;
        info!("starting executable {}", path.display());

        let mut command = Command::new(&path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            command.current_dir(parent);
        }
        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            path: path.clone(),
            source,
        })?;

        let pid = child.id();
        let (tx, rx) = mpsc::channel();
        let monitor = thread::spawn(move || {
            let result = child.wait();
            if let Ok(status) = &result {
                debug!("target process exited with {status}");
            }
            let _ = tx.send(result);
        });

        self.running = Some(RunningChild {
            pid,
            exit_rx: rx,
            monitor,
        });
        thread::sleep(self.config.startup_delay);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ProcessError> {
        let Some(child) = self.running.take() else {
            return Ok(());
        };

        // Already exited on its own?
        if child.exit_rx.try_recv().is_ok() {
            let _ = child.monitor.join();
            return Ok(());
        }

        info!("stopping executable (pid {})", child.pid);
        request_terminate(child.pid);
        match child.exit_rx.recv_timeout(self.config.stop_grace) {
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {
                warn!("forcing the executable to stop");
                force_kill(child.pid);
                match child.exit_rx.recv_timeout(self.config.stop_grace) {
                    Ok(_) => {}
                    Err(_) => return Err(ProcessError::Unstoppable),
                }
            }
            Err(RecvTimeoutError::Disconnected) => {}
        }
        let _ = child.monitor.join();
        Ok(())
    }
}

impl ProcessControl for TargetProcess {
    fn ensure_running(&mut self) -> Result<(), ProcessError> {
        if self.is_running() {
            return Ok(());
        }
        self.start()
    }

    fn relaunch(&mut self) -> Result<(), ProcessError> {
        self.stop()?;
        self.start()
    }

    fn shutdown(&mut self) -> Result<(), ProcessError> {
        self.stop()
    }
}

impl Drop for TargetProcess {
    fn drop(&mut self) {
        if self.running.is_some() {
            let _ = self.stop();
        }
    }
}

#[cfg(unix)]
fn request_terminate(pid: u32) {
    // SAFETY: plain signal send, no memory involved.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(unix)]
fn force_kill(pid: u32) {
    // SAFETY: as above.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(windows)]
fn request_terminate(_pid: u32) {
    // No graceful signal on this platform; the grace period simply elapses
    // before the forced kill.
}

#[cfg(windows)]
fn force_kill(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .status();
}

#[cfg(not(any(unix, windows)))]
fn request_terminate(_pid: u32) {}

#[cfg(not(any(unix, windows)))]
fn force_kill(pid: u32) {
    warn!("no kill mechanism for this platform (pid {pid})");
}

fn copy_dir_recursive(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
