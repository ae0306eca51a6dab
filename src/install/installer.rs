// ABOUTME: Orchestrates download, dependency setup, server launch, and health verification.
// ABOUTME: Results are exported through the process-wide store for later workflow steps.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::InstallError;
use crate::config::{InstallConfig, ServerConfig};
use crate::fetch::RetryingFetcher;
use crate::http::{HttpClient, HttpResponse};
use crate::poll::{HttpProbe, Probe, ProbeError, Readiness, poll_until_ready};
use crate::process::{ManagedProcess, ProcessSupervisor};
use crate::store::EnvStore;

/// A server left running for later steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandle {
    pub pid: u32,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub binary: PathBuf,
    pub bytes: usize,
    pub download_attempts: u32,
    /// Dependency commands that failed; these do not fail the install.
    pub failed_dependencies: Vec<String>,
    pub server: Option<ServerHandle>,
}

pub struct Installer<C> {
    client: C,
    supervisor: ProcessSupervisor,
    store: Arc<dyn EnvStore>,
    prefix: String,
}

impl<C: HttpClient + Clone> Installer<C> {
    pub fn new(
        client: C,
        supervisor: ProcessSupervisor,
        store: Arc<dyn EnvStore>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            supervisor,
            store,
            prefix: prefix.into(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    fn export(&self, suffix: &str, value: &str) -> Result<(), InstallError> {
        let key = self.key(suffix);
        self.store
            .set(&key, value)
            .map_err(|source| InstallError::Export { key, source })
    }

    /// Run the whole install: download, dependencies, then the server if configured.
    ///
    /// Exports `<PREFIX>_BIN` after the download and `<PREFIX>_SERVER_URL` /
    /// `<PREFIX>_SERVER_PID` once the server is healthy.
    pub async fn install(
        &self,
        install: &InstallConfig,
        server: Option<&ServerConfig>,
    ) -> Result<InstallReport, InstallError> {
        install.validate()?;
        if let Some(server) = server {
            server.validate()?;
        }

        let fetched = RetryingFetcher::new(self.client.clone())
            .fetch(&install.fetch_job())
            .await?;
        make_executable(&fetched.path).await?;
        self.export("BIN", &fetched.path.display().to_string())?;
        info!(binary = %fetched.path.display(), bytes = fetched.bytes, "binary installed");

        let failed_dependencies = run_dependencies(&install.dependencies).await;

        let server = match server {
            Some(server) => Some(self.launch(&fetched.path, server).await?),
            None => None,
        };

        Ok(InstallReport {
            binary: fetched.path,
            bytes: fetched.bytes,
            download_attempts: fetched.attempts,
            failed_dependencies,
            server,
        })
    }

    /// Start `binary` as a server and wait for its health check.
    ///
    /// On failure the process is stopped (forcefully if configured) before
    /// the health error is returned. On success it is detached and keeps
    /// running after this process exits.
    pub async fn launch(
        &self,
        binary: &Path,
        server: &ServerConfig,
    ) -> Result<ServerHandle, InstallError> {
        let spec = server.process_spec(binary)?;
        let http = HttpProbe::get(self.client.clone(), server.health_url())
            .method(server.health.http_method()?)
            .body(server.health.body.clone())
            .expect_status(server.health.expect_status)
            .expect_body(server.health.expect_body.clone());

        let mut process = self.supervisor.start(&spec)?;
        self.supervisor
            .register_cleanup(&mut process, server.stop_timeout, server.forceful);

        let probe = ServerHealthProbe {
            http,
            process: &process,
        };
        if let Err(e) = poll_until_ready(&probe, &server.health.poll_spec()).await {
            warn!(pid = process.pid(), error = %e, "server failed its health check; stopping it");
            match self
                .supervisor
                .terminate_gracefully(&process, server.stop_timeout, server.forceful)
                .await
            {
                Ok(outcome) => debug!(?outcome, "unhealthy server stopped"),
                Err(stop_err) => warn!(error = %stop_err, "could not stop unhealthy server"),
            }
            return Err(InstallError::Health(e));
        }

        let pid = process.detach();
        let url = server.base_url();
        self.export("SERVER_URL", &url)?;
        self.export("SERVER_PID", &pid.to_string())?;
        info!(pid, url = %url, "server is healthy");
        Ok(ServerHandle { pid, url })
    }
}

/// Health probe that gives up as soon as the server process has exited.
struct ServerHealthProbe<'a, C> {
    http: HttpProbe<C>,
    process: &'a ManagedProcess,
}

#[async_trait]
impl<'a, C: HttpClient> Probe for ServerHealthProbe<'a, C> {
    type Output = Option<HttpResponse>;

    fn target(&self) -> String {
        self.http.target()
    }

    async fn attempt(&self) -> Result<Option<HttpResponse>, ProbeError> {
        if !self.process.is_alive() {
            return Ok(None);
        }
        self.http.attempt().await.map(Some)
    }

    fn check(&self, response: &Option<HttpResponse>) -> Readiness {
        match response {
            Some(response) => self.http.check(response),
            None => {
                let status = self
                    .process
                    .exit_status()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown status".to_string());
                Readiness::Failed(format!("server exited before becoming healthy ({status})"))
            }
        }
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|source| InstallError::Permissions {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<(), InstallError> {
    Ok(())
}

/// Run each dependency command in order, returning the ones that failed.
async fn run_dependencies(commands: &[Vec<String>]) -> Vec<String> {
    let mut failed = Vec::new();
    for argv in commands {
        let Some((program, args)) = argv.split_first() else {
            continue;
        };
        let shown = argv.join(" ");
        info!(command = %shown, "installing dependency");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                debug!(command = %shown, "dependency installed");
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(
                    command = %shown,
                    exit_code = ?output.status.code(),
                    stderr = %stderr.trim(),
                    "dependency installer failed"
                );
                failed.push(shown);
            }
            Err(e) => {
                warn!(command = %shown, error = %e, "dependency installer could not run");
                failed.push(shown);
            }
        }
    }
    failed
}
