// ABOUTME: Supervision of a launched background process.
// ABOUTME: Start, observe exit, and terminate gracefully-then-forcefully with at most two signals.

mod cleanup;
mod error;
mod signal;
mod supervisor;

pub use cleanup::{ShutdownSignal, wait_for_shutdown_signal};
pub use error::ProcessError;
pub use signal::{Signal, Signaller, SystemSignaller};
pub use supervisor::{
    ManagedProcess, ProcessSpec, ProcessState, ProcessSupervisor, TerminationOutcome,
};
