// ABOUTME: Library root for stepguard - resilience primitives for CI pipeline steps.
// ABOUTME: The stepguard binary in main.rs wires these into install, wait, token and deploy commands.

pub mod auth;
pub mod clock;
pub mod config;
pub mod deploy;
pub mod error;
pub mod fetch;
pub mod http;
pub mod install;
pub mod output;
pub mod poll;
pub mod process;
pub mod store;
