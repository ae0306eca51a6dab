// ABOUTME: Generic "poll until ready or timeout" loop and the probes that drive it.
// ABOUTME: Used for local health checks and for remote deployment-status checks.

mod error;
mod http_probe;
mod poller;
mod probe;

pub use error::{PollError, ProbeError};
pub use http_probe::HttpProbe;
pub use poller::{PollSpec, poll_until_ready};
pub use probe::{FnProbe, Probe, Readiness, probe_fn};
