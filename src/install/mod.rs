// ABOUTME: Install action: download the tool, prepare it, and optionally run it as a server.
// ABOUTME: A server that never turns healthy is stopped before the error is returned.

mod error;
mod installer;

pub use error::InstallError;
pub use installer::{InstallReport, Installer, ServerHandle};
