// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stepguard")]
#[command(about = "Retrying downloads, readiness checks, tokens and deployments for CI steps")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to stepguard.yml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a file with bounded retries
    Fetch {
        #[arg(long)]
        url: String,

        /// Destination path
        #[arg(long)]
        dest: PathBuf,

        /// Total number of attempts
        #[arg(long, default_value_t = 3)]
        retries: u32,

        /// Base delay, doubled after every failed attempt
        #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
        backoff: Duration,

        #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
        attempt_timeout: Duration,
    },

    /// Install the configured binary and optionally start it as a server
    Install,

    /// Wait until a URL responds successfully
    Wait {
        #[arg(long)]
        url: String,

        #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
        timeout: Duration,

        #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
        interval: Duration,

        #[arg(long, value_parser = humantime::parse_duration)]
        attempt_timeout: Option<Duration>,

        /// Require this status code instead of any 2xx
        #[arg(long)]
        expect_status: Option<u16>,

        /// Require the response body to contain this text
        #[arg(long)]
        expect_body: Option<String>,
    },

    /// Obtain an access token, reusing a cached one while it is valid
    Token,

    /// Trigger a deployment and wait for it to finish
    Deploy {
        /// Return as soon as the deployment is accepted
        #[arg(long)]
        no_wait: bool,
    },
}
