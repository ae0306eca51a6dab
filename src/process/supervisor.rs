// ABOUTME: Process supervisor: spawns a child, observes its exit once, and stops it in escalating steps.
// ABOUTME: ManagedProcess is a scoped handle that kills its process on drop unless detached.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cleanup::{ShutdownSignal, wait_for_shutdown_signal};
use super::error::ProcessError;
use super::signal::{Signal, Signaller, SystemSignaller};

/// How long to wait for the exit observer after SIGKILL before giving up on reaping.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

const EXIT_RACE_GRACE: Duration = Duration::from_millis(100);

/// What to launch.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    /// File receiving stdout and stderr; discarded when unset.
    pub log_file: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

/// Lifecycle of a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Starting,
    Running,
    Terminating,
    Terminated,
}

/// How a termination request concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The process had already exited; nothing was sent.
    AlreadyExited,
    /// The process exited after SIGTERM.
    Exited,
    /// The process ignored SIGTERM and was sent SIGKILL.
    Killed,
    /// The process ignored SIGTERM and forceful termination was not requested.
    MayStillBeAlive,
}

struct ProcessInner {
    pid: u32,
    program: String,
    state: Mutex<ProcessState>,
    exit_status: Mutex<Option<ExitStatus>>,
    exited: watch::Receiver<bool>,
    signals: Mutex<Vec<Signal>>,
    signaller: Arc<dyn Signaller>,
}

impl ProcessInner {
    fn state(&self) -> ProcessState {
        *self.state.lock()
    }

    /// Deliver `signal` unless the exit has already been observed.
    ///
    /// The state lock is held across delivery so the exit observer cannot
    /// mark the process terminated in between.
    fn signal_if_alive(&self, signal: Signal) -> Result<bool, ProcessError> {
        let state = self.state.lock();
        if *state == ProcessState::Terminated {
            return Ok(false);
        }
        self.signaller
            .send(self.pid, signal)
            .map_err(|source| ProcessError::Signal {
                pid: self.pid,
                signal,
                source,
            })?;
        self.signals.lock().push(signal);
        debug!(pid = self.pid, %signal, "signal delivered");
        Ok(true)
    }

    async fn wait_exited(&self) {
        let mut exited = self.exited.clone();
        // Err means the observer is gone, which only happens after it has recorded the exit.
        let _ = exited.wait_for(|done| *done).await;
    }

    async fn terminate(
        &self,
        timeout: Duration,
        forceful: bool,
    ) -> Result<TerminationOutcome, ProcessError> {
        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            if matches!(previous, ProcessState::Starting | ProcessState::Running) {
                *state = ProcessState::Terminating;
            }
            previous
        };

        match previous {
            ProcessState::Terminated => {
                debug!(pid = self.pid, "process already exited; nothing to terminate");
                return Ok(TerminationOutcome::AlreadyExited);
            }
            ProcessState::Terminating => {
                // Another caller owns the signalling; just wait alongside it.
                return match tokio::time::timeout(timeout, self.wait_exited()).await {
                    Ok(()) => Ok(TerminationOutcome::Exited),
                    Err(_) => Ok(TerminationOutcome::MayStillBeAlive),
                };
            }
            ProcessState::Starting | ProcessState::Running => {}
        }

        info!(pid = self.pid, program = %self.program, timeout_ms = timeout.as_millis() as u64, "stopping process");
        match self.signal_if_alive(Signal::Terminate) {
            Ok(true) => {}
            Ok(false) => return Ok(TerminationOutcome::AlreadyExited),
            Err(e) => {
                // The process may have been reaped a moment before the observer recorded it.
                if tokio::time::timeout(EXIT_RACE_GRACE, self.wait_exited())
                    .await
                    .is_ok()
                {
                    return Ok(TerminationOutcome::AlreadyExited);
                }
                let mut state = self.state.lock();
                if *state == ProcessState::Terminating {
                    *state = ProcessState::Running;
                }
                return Err(e);
            }
        }

        if tokio::time::timeout(timeout, self.wait_exited()).await.is_ok() {
            info!(pid = self.pid, "process exited");
            return Ok(TerminationOutcome::Exited);
        }

        if !forceful {
            warn!(
                pid = self.pid,
                timeout_ms = timeout.as_millis() as u64,
                "process did not exit after SIGTERM and may still be alive"
            );
            return Ok(TerminationOutcome::MayStillBeAlive);
        }

        warn!(pid = self.pid, "process did not exit after SIGTERM; sending SIGKILL");
        if !self.signal_if_alive(Signal::Kill)? {
            return Ok(TerminationOutcome::Exited);
        }
        if tokio::time::timeout(KILL_REAP_TIMEOUT, self.wait_exited())
            .await
            .is_err()
        {
            warn!(pid = self.pid, "exit not observed after SIGKILL");
        }
        Ok(TerminationOutcome::Killed)
    }
}

/// Handle to a process started by [`ProcessSupervisor::start`].
///
/// Dropping the handle while the process is still running kills it. Call
/// [`ManagedProcess::detach`] to let the process outlive the handle.
pub struct ManagedProcess {
    inner: Arc<ProcessInner>,
    cleanup_hook: Option<JoinHandle<()>>,
    detached: bool,
}

impl fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("pid", &self.inner.pid)
            .field("program", &self.inner.program)
            .field("state", &self.inner.state())
            .finish()
    }
}

impl ManagedProcess {
    pub fn pid(&self) -> u32 {
        self.inner.pid
    }

    pub fn state(&self) -> ProcessState {
        self.inner.state()
    }

    /// False once the exit observer has seen the process exit.
    pub fn is_alive(&self) -> bool {
        self.inner.state() != ProcessState::Terminated
    }

    /// Exit status, once observed.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.inner.exit_status.lock()
    }

    /// Signals delivered so far, in order.
    pub fn signals_sent(&self) -> Vec<Signal> {
        self.inner.signals.lock().clone()
    }

    /// Wait until the process exits on its own or otherwise.
    pub async fn wait(&self) -> Option<ExitStatus> {
        self.inner.wait_exited().await;
        self.exit_status()
    }

    /// Release ownership so the process keeps running after this handle is gone.
    ///
    /// Removes any registered signal hook. Returns the process id.
    pub fn detach(mut self) -> u32 {
        self.detached = true;
        if let Some(hook) = self.cleanup_hook.take() {
            hook.abort();
        }
        self.inner.pid
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if let Some(hook) = self.cleanup_hook.take() {
            hook.abort();
        }
        // Processes already being terminated are left to that caller's policy.
        if self.detached
            || !matches!(
                self.inner.state(),
                ProcessState::Starting | ProcessState::Running
            )
        {
            return;
        }
        warn!(pid = self.inner.pid, "managed process dropped while running; killing it");
        if let Err(e) = self.inner.signal_if_alive(Signal::Kill) {
            warn!(error = %e, "failed to kill dropped process");
        }
    }
}

/// Starts processes and stops them gracefully.
#[derive(Clone)]
pub struct ProcessSupervisor {
    signaller: Arc<dyn Signaller>,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor").finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::with_signaller(Arc::new(SystemSignaller))
    }

    pub fn with_signaller(signaller: Arc<dyn Signaller>) -> Self {
        Self { signaller }
    }

    /// Spawn the process described by `spec` and start observing its exit.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Spawn` if the program cannot be started and
    /// `ProcessError::MissingPid` if no process id is available for it.
    pub fn start(&self, spec: &ProcessSpec) -> Result<ManagedProcess, ProcessError> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args).envs(&spec.env).stdin(Stdio::null());
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        match &spec.log_file {
            Some(path) => {
                let open_err = |source| ProcessError::LogFile {
                    path: path.clone(),
                    source,
                };
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(open_err)?;
                let stderr = file.try_clone().map_err(open_err)?;
                command.stdout(Stdio::from(file)).stderr(Stdio::from(stderr));
            }
            None => {
                // An inherited pipe would keep the step's output open after we exit.
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        debug!(program = %spec.program.display(), args = ?spec.args, "spawning process");
        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let Some(pid) = child.id() else {
            return Err(ProcessError::MissingPid {
                program: spec.program.clone(),
            });
        };

        let (exited_tx, exited_rx) = watch::channel(false);
        let inner = Arc::new(ProcessInner {
            pid,
            program: spec.program.display().to_string(),
            state: Mutex::new(ProcessState::Starting),
            exit_status: Mutex::new(None),
            exited: exited_rx,
            signals: Mutex::new(Vec::new()),
            signaller: self.signaller.clone(),
        });

        let observer = inner.clone();
        tokio::spawn(async move {
            let status = match child.wait().await {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!(pid = observer.pid, error = %e, "failed to wait for process");
                    None
                }
            };
            *observer.exit_status.lock() = status;
            *observer.state.lock() = ProcessState::Terminated;
            debug!(pid = observer.pid, status = ?status, "process exit observed");
            exited_tx.send_replace(true);
        });

        {
            let mut state = inner.state.lock();
            if *state == ProcessState::Starting {
                *state = ProcessState::Running;
            }
        }
        info!(pid, program = %spec.program.display(), "process started");

        Ok(ManagedProcess {
            inner,
            cleanup_hook: None,
            detached: false,
        })
    }

    /// Stop `process`: SIGTERM, wait up to `timeout`, then SIGKILL if `forceful`.
    ///
    /// Does nothing if the process has already exited. When `forceful` is
    /// false and the process outlives the timeout, resolves with
    /// [`TerminationOutcome::MayStillBeAlive`] rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Signal` if a signal cannot be delivered.
    pub async fn terminate_gracefully(
        &self,
        process: &ManagedProcess,
        timeout: Duration,
        forceful: bool,
    ) -> Result<TerminationOutcome, ProcessError> {
        process.inner.terminate(timeout, forceful).await
    }

    /// Terminate `process` if the step receives SIGINT, SIGTERM or SIGQUIT,
    /// then exit with 128 + the signal number.
    ///
    /// Registering again replaces the previous hook.
    pub fn register_cleanup(&self, process: &mut ManagedProcess, timeout: Duration, forceful: bool) {
        self.register_cleanup_on(
            process,
            wait_for_shutdown_signal(),
            timeout,
            forceful,
            |signal| std::process::exit(signal.exit_code()),
        );
    }

    /// Like [`register_cleanup`](Self::register_cleanup), with the trigger and
    /// the final action supplied by the caller.
    ///
    /// When `trigger` resolves, the process is terminated and `on_done` runs
    /// with the received signal. If `trigger` fails, the hook is abandoned.
    /// The hook and an explicit [`terminate_gracefully`](Self::terminate_gracefully)
    /// share one state guard, so racing them never sends a signal twice.
    pub fn register_cleanup_on<T, F>(
        &self,
        process: &mut ManagedProcess,
        trigger: T,
        timeout: Duration,
        forceful: bool,
        on_done: F,
    ) where
        T: Future<Output = io::Result<ShutdownSignal>> + Send + 'static,
        F: FnOnce(ShutdownSignal) + Send + 'static,
    {
        if let Some(previous) = process.cleanup_hook.take() {
            previous.abort();
        }

        let inner = process.inner.clone();
        process.cleanup_hook = Some(tokio::spawn(async move {
            let signal = match trigger.await {
                Ok(signal) => signal,
                Err(e) => {
                    warn!(error = %e, "could not install shutdown signal handlers");
                    return;
                }
            };
            warn!(pid = inner.pid, signal = %signal, "shutdown signal received; stopping managed process");
            match inner.terminate(timeout, forceful).await {
                Ok(outcome) => debug!(pid = inner.pid, ?outcome, "cleanup finished"),
                Err(e) => warn!(pid = inner.pid, error = %e, "cleanup failed"),
            }
            on_done(signal);
        }));
    }
}
