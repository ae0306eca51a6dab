// ABOUTME: Deploy command implementation.
// ABOUTME: Authenticates, triggers the deployment, and polls it to a final status.

use super::token::obtain_token;
use stepguard::config::Config;
use stepguard::deploy::{DeployClient, DeployError};
use stepguard::error::Result;
use stepguard::http::ReqwestClient;
use stepguard::output::Output;

pub async fn deploy(config: &Config, no_wait: bool, mut output: Output) -> Result<()> {
    let settings = config.require_deploy()?;
    let request = settings.request()?;
    output.start_timer();

    let token = obtain_token(config).await?;
    let client = DeployClient::new(ReqwestClient::new()?, settings.api_url.as_str(), &token);

    output.progress(&format!(
        "Deploying {} {}",
        request.application, request.version
    ));
    let id = client.trigger(&request).await?;
    output.set_output("deployment-id", &id)?;

    if no_wait {
        output.success(&format!("Deployment {id} accepted"));
        return Ok(());
    }

    output.progress(&format!("Waiting for deployment {id}..."));
    match client.wait_for_completion(&id, &settings.poll_spec()).await {
        Ok(status) => {
            output.set_output("status", status.as_str())?;
            output.success(&format!("Deployment {id} {status}"));
            Ok(())
        }
        Err(e @ DeployError::Failed { .. }) => {
            output.set_output("status", "failed")?;
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
