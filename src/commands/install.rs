// ABOUTME: Install command implementation.
// ABOUTME: Runs the configured install and exports the binary path and server details.

use std::sync::Arc;
use stepguard::config::Config;
use stepguard::error::Result;
use stepguard::http::ReqwestClient;
use stepguard::install::Installer;
use stepguard::output::Output;
use stepguard::process::ProcessSupervisor;
use stepguard::store::WorkflowEnvStore;

pub async fn install(config: &Config, mut output: Output) -> Result<()> {
    let settings = config.require_install()?;
    output.start_timer();
    output.progress(&format!("Installing {}", settings.binary_name));

    let installer = Installer::new(
        ReqwestClient::new()?,
        ProcessSupervisor::new(),
        Arc::new(WorkflowEnvStore::from_env()),
        config.env_prefix.as_str(),
    );
    let report = installer.install(settings, config.server.as_ref()).await?;

    for command in &report.failed_dependencies {
        output.warning(&format!("dependency installer failed: {command}"));
    }

    output.set_output("binary", &report.binary.display().to_string())?;
    match &report.server {
        Some(server) => {
            output.set_output("server-url", &server.url)?;
            output.set_output("server-pid", &server.pid.to_string())?;
            output.success(&format!(
                "Installed {} and started server (pid {}) at {}",
                report.binary.display(),
                server.pid,
                server.url
            ));
        }
        None => output.success(&format!("Installed {}", report.binary.display())),
    }
    Ok(())
}
