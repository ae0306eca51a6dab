// ABOUTME: Remote deployment action: trigger a deployment and await its outcome.
// ABOUTME: Status polling reuses the generic readiness loop.

mod client;
mod error;
mod status;

pub use client::{DeployClient, DeployRequest};
pub use error::DeployError;
pub use status::DeploymentStatus;
