use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dirs::home_dir;

/// Replays a script of widget actions against live stores and prints the resulting state.
#[derive(Parser)]
#[command(version, about)]
struct Arg {
    /// The directory for logs. Defaults to `~/.widget-store`.
    #[arg(short = 'p', long)]
    config_path: Option<PathBuf>,
    /// The timeout of every data request in seconds.
    #[arg(short = 't', long, default_value_t = 10)]
    timeout: u64,
    /// How long to wait for in-flight requests after each action in seconds.
    #[arg(long, default_value_t = 15)]
    wait: u64,
    /// A JSON file with an array of action envelopes.
    #[arg()]
    script: PathBuf,
}

#[derive(Debug)]
pub struct Config {
    config_path: PathBuf,
    timeout: Duration,
    wait: Duration,
    script: PathBuf,
}

impl Config {
    pub fn new() -> anyhow::Result<Self> {
        let Arg {
            config_path,
            timeout,
            wait,
            script,
        } = Arg::parse();

        let config_path = config_path
            .or_else(|| {
                let mut home = home_dir()?;
                home.push(".widget-store");
                Some(home)
            })
            .context("failed to get the config directory")?;

        std::fs::create_dir_all(&config_path).context("failed to create the config directory")?;

        Ok(Config {
            config_path,
            timeout: Duration::from_secs(timeout),
            wait: Duration::from_secs(wait),
            script,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The timeout of a single data request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The upper bound on waiting for in-flight requests.
    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}
