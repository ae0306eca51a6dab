// ABOUTME: Signal delivery to child processes.
// ABOUTME: SystemSignaller uses kill(2) on Unix; the trait lets tests inject delivery failures.

use std::fmt;
use std::io;

/// The two signals a managed process can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Polite request to exit (SIGTERM).
    Terminate,
    /// Immediate kill (SIGKILL).
    Kill,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Terminate => write!(f, "SIGTERM"),
            Signal::Kill => write!(f, "SIGKILL"),
        }
    }
}

/// Delivers signals to processes by id.
pub trait Signaller: Send + Sync {
    fn send(&self, pid: u32, signal: Signal) -> io::Result<()>;
}

/// Delivers real OS signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSignaller;

#[cfg(unix)]
impl Signaller for SystemSignaller {
    fn send(&self, pid: u32, signal: Signal) -> io::Result<()> {
        // pid 0 and negative pids address whole process groups.
        let raw_pid = libc::pid_t::try_from(pid)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid process id"))?;
        let raw_signal = match signal {
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };

        // SAFETY: kill(2) has no memory-safety preconditions; the pid was checked above.
        let result = unsafe { libc::kill(raw_pid, raw_signal) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(unix))]
impl Signaller for SystemSignaller {
    fn send(&self, _pid: u32, signal: Signal) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{signal} is not supported on this platform"),
        ))
    }
}
