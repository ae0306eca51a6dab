// ABOUTME: Command module aggregator for the stepguard CLI.
// ABOUTME: Re-exports one handler per subcommand plus shared config loading.

mod deploy;
mod fetch;
mod install;
mod token;
mod wait;

pub use deploy::deploy;
pub use fetch::fetch;
pub use install::install;
pub use token::token;
pub use wait::{WaitArgs, wait};

use std::env;
use std::path::Path;
use stepguard::config::Config;
use stepguard::error::Result;

/// Load `path`, or discover the config file in the working directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };
    Ok(config)
}
