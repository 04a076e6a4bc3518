//! Config command - write config.yaml.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;
use thiserror::Error;
use tracing::info;

use mstdn_stack::{Config, ConfigOptions};

use super::WorkspaceArgs;

/// The user declined to overwrite an existing configuration.
#[derive(Debug, Error)]
#[error("existing configuration kept, nothing written")]
pub struct Declined;

#[derive(Args)]
pub struct ConfigArgs {
    /// AWS region
    #[arg(long)]
    region: String,

    /// Public hostname of the Mastodon instance
    #[arg(long)]
    hostname: String,

    /// Barcelona district name
    #[arg(long)]
    district: String,

    /// Barcelona heritage name
    #[arg(long)]
    heritage: String,

    /// ACM certificate ARN for the load balancer
    #[arg(long)]
    certificate_arn: String,

    /// Barcelona API endpoint
    #[arg(long)]
    endpoint: String,

    /// Overwrite an existing config.yaml without asking
    #[arg(short, long)]
    force: bool,
}

pub fn execute(args: ConfigArgs, workspace: &WorkspaceArgs) -> Result<()> {
    let path = &workspace.config;

    if path.exists() && !args.force {
        let question = format!(
            "You already have configured once, existing {} will be overwritten ok?",
            path.display()
        );
        if !confirm(&question, io::stdin().lock())? {
            return Err(Declined.into());
        }
    }

    let config = Config::from_options(ConfigOptions {
        region: args.region,
        hostname: args.hostname,
        district_name: args.district,
        heritage_name: args.heritage,
        certificate_arn: args.certificate_arn,
        endpoint: args.endpoint,
    });
    config.save(path).context("Failed to write configuration")?;
    info!("Configuration written to {:?}", path);

    println!(
        "{} is created. This file is used by later subcommands. Please check and edit it if you think you need to",
        path.display()
    );
    Ok(())
}

/// Ask a yes/no question; anything but `y`/`yes` is a no.
fn confirm(question: &str, mut input: impl BufRead) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer).context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
