// ABOUTME: Entry point for the stepguard CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::WaitArgs;
use stepguard::error::Result;
use stepguard::fetch::FetchJob;
use stepguard::output::{Output, OutputMode};
use stepguard::poll::PollSpec;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    match cli.command {
        Commands::Fetch {
            url,
            dest,
            retries,
            backoff,
            attempt_timeout,
        } => {
            let job = FetchJob::new(url, dest)
                .max_retries(retries)
                .backoff_base(backoff)
                .attempt_timeout(attempt_timeout);
            commands::fetch(job, output).await
        }
        Commands::Install => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::install(&config, output).await
        }
        Commands::Wait {
            url,
            timeout,
            interval,
            attempt_timeout,
            expect_status,
            expect_body,
        } => {
            let spec = PollSpec {
                timeout,
                interval,
                attempt_timeout,
            };
            let args = WaitArgs {
                url,
                spec,
                expect_status,
                expect_body,
            };
            commands::wait(args, output).await
        }
        Commands::Token => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::token(&config, output).await
        }
        Commands::Deploy { no_wait } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::deploy(&config, no_wait, output).await
        }
    }
}
