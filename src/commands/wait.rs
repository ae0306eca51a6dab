// ABOUTME: Wait command implementation.
// ABOUTME: Polls a URL until it answers as expected or the timeout passes.

use stepguard::error::Result;
use stepguard::http::ReqwestClient;
use stepguard::output::Output;
use stepguard::poll::{HttpProbe, PollSpec, Probe, poll_until_ready};

pub struct WaitArgs {
    pub url: String,
    pub spec: PollSpec,
    pub expect_status: Option<u16>,
    pub expect_body: Option<String>,
}

pub async fn wait(args: WaitArgs, mut output: Output) -> Result<()> {
    let probe = HttpProbe::get(ReqwestClient::new()?, args.url)
        .expect_status(args.expect_status)
        .expect_body(args.expect_body);

    output.start_timer();
    output.progress(&format!("Waiting for {}", probe.target()));

    let response = poll_until_ready(&probe, &args.spec).await?;
    output.set_output("status", &response.status.to_string())?;
    output.success(&format!("{} is ready", probe.target()));
    Ok(())
}
