//! CLI command definitions.
//!
//! Each subcommand works on the three documents in the working directory:
//! `config.yaml`, `network.yaml` and the resource registry `resources.yaml`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use mstdn_stack::{
    Config, DeploymentId, NetworkFacts, ResourceRegistry, StackInputs, StackKind, DEFAULT_CONFIG_FILE,
    DEFAULT_NETWORK_FILE, DEFAULT_REGISTRY_FILE,
};
use mstdn_template::Format;

pub mod check;
pub mod config;
pub mod register;
pub mod registry;
pub mod render;

/// mstdn - provision Mastodon on Barcelona
#[derive(Parser)]
#[command(name = "mstdn")]
#[command(version, about = "Provision Mastodon on Barcelona with CloudFormation")]
#[command(long_about = r#"
Generates the CloudFormation templates of a Mastodon deployment and keeps
track of the identifiers each deployed stack produced.

STACKS (deploy in this order):
  db          → database, its security/subnet groups, media bucket
  resources   → redis cluster, admin user and key, ECR repositories

WORKFLOW:
  config      → write config.yaml
  render db   → template for the db stack
  register db --outputs out.yaml
              → record the db stack's outputs in resources.yaml
  render resources
              → template for the resources stack

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or declined confirmation
  3 - Configuration incomplete
  4 - Missing dependency
  5 - Persistence error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create config.yaml
    Config(config::ConfigArgs),

    /// Print the template of a stack
    Render(render::RenderArgs),

    /// Record the outputs of a deployed stack in the registry
    Register(register::RegisterArgs),

    /// Show the resource registry
    Registry,

    /// Verify that every reference in a stack's template resolves
    Check(check::CheckArgs),
}

/// Locations of the persisted documents.
#[derive(Args, Clone, Debug)]
pub struct WorkspaceArgs {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Network facts file
    #[arg(long, global = true, default_value = DEFAULT_NETWORK_FILE)]
    pub network: PathBuf,

    /// Resource registry file
    #[arg(long, global = true, default_value = DEFAULT_REGISTRY_FILE)]
    pub resources: PathBuf,

    /// Deployment name (defaults to heritage_name from the config)
    #[arg(long, global = true)]
    pub name: Option<String>,
}

/// Everything a stack build needs, loaded from disk.
pub struct Workspace {
    pub identity: DeploymentId,
    pub config: Config,
    pub network: NetworkFacts,
    pub registry: ResourceRegistry,
}

impl Workspace {
    pub fn load(args: &WorkspaceArgs) -> Result<Self> {
        let config = Config::load(&args.config)
            .with_context(|| format!("can't load {:?}, run `mstdn config` first", args.config))?;
        let name = args
            .name
            .clone()
            .unwrap_or_else(|| config.heritage_name.clone());
        let identity = DeploymentId::new(name).context("Invalid deployment name")?;
        let network = NetworkFacts::load(&args.network)
            .with_context(|| format!("can't load network facts from {:?}", args.network))?;
        let registry = ResourceRegistry::load(&args.resources)
            .with_context(|| format!("can't load {:?}", args.resources))?;
        debug!("Loaded workspace for {}", identity);

        Ok(Self {
            identity,
            config,
            network,
            registry,
        })
    }

    pub fn inputs(&self) -> StackInputs<'_> {
        StackInputs::new(&self.identity, &self.config, &self.network, &self.registry)
    }
}

/// Stack selector.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StackArg {
    Db,
    Resources,
}

impl From<StackArg> for StackKind {
    fn from(arg: StackArg) -> Self {
        match arg {
            StackArg::Db => StackKind::Db,
            StackArg::Resources => StackKind::Resources,
        }
    }
}

/// Output format selector.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum FormatArg {
    #[default]
    Json,
    Yaml,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Format::Json,
            FormatArg::Yaml => Format::Yaml,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fs;

    use mstdn_stack::{Config, ConfigOptions};
    use tempfile::TempDir;

    use super::WorkspaceArgs;

    /// Config and network facts for deployment `social` under `dir`, no registry.
    pub fn workspace(dir: &TempDir) -> WorkspaceArgs {
        let config = Config::from_options(ConfigOptions {
            region: "ap-northeast-1".to_string(),
            hostname: "social.example.com".to_string(),
            district_name: "default".to_string(),
            heritage_name: "social".to_string(),
            certificate_arn: "arn:aws:acm:ap-northeast-1:123456789012:certificate/abc".to_string(),
            endpoint: "https://barcelona.example.com".to_string(),
        });
        let args = WorkspaceArgs {
            config: dir.path().join("config.yaml"),
            network: dir.path().join("network.yaml"),
            resources: dir.path().join("resources.yaml"),
            name: None,
        };
        config.save(&args.config).unwrap();
        fs::write(&args.network, "subnet_ids: [subnet-1]\nsubnet_cidrs: [10.0.1.0/24]\n").unwrap();
        args
    }
}
