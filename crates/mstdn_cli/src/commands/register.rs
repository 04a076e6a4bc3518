//! Register command - record a deployed stack's outputs in the registry.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use mstdn_stack::StackKind;

use super::{StackArg, Workspace, WorkspaceArgs};

#[derive(Args)]
pub struct RegisterArgs {
    /// Stack whose outputs are registered
    #[arg(value_enum)]
    stack: StackArg,

    /// YAML map of output name to value, as returned by the provider
    #[arg(short, long)]
    outputs: PathBuf,
}

pub fn execute(args: RegisterArgs, workspace_args: &WorkspaceArgs) -> Result<()> {
    let mut workspace = Workspace::load(workspace_args)?;
    let kind = StackKind::from(args.stack);

    let content = fs::read_to_string(&args.outputs)
        .with_context(|| format!("Failed to read outputs from {:?}", args.outputs))?;
    let outputs: BTreeMap<String, String> = serde_yaml::from_str(&content)
        .with_context(|| format!("Outputs file {:?} is not a map of names to values", args.outputs))?;

    let (stack_name, expected) = {
        let builder = kind.builder(workspace.inputs());
        let template = builder.build()?;
        let expected: Vec<String> = template
            .outputs()
            .map(|o| o.keys().map(str::to_string).collect())
            .unwrap_or_default();
        (builder.stack_name(), expected)
    };
    for key in expected.iter().filter(|k| !outputs.contains_key(k.as_str())) {
        warn!("Stack {} output {} is not in {:?}", stack_name, key, args.outputs);
    }

    let count = workspace.registry.register(&stack_name, &expected, outputs)?.len();
    workspace.registry.save(&workspace_args.resources)?;
    info!("Registered {} outputs of stack {}", count, stack_name);

    println!("Registered {} outputs of {} in {}", count, stack_name, workspace_args.resources.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::workspace;
    use mstdn_stack::{ErrorKind, ResourceRegistry, StackError};
    use tempfile::TempDir;

    fn register(args: &WorkspaceArgs, stack: StackArg, outputs: &str) -> Result<()> {
        let path = args.resources.with_file_name("out.yaml");
        fs::write(&path, outputs).unwrap();
        execute(RegisterArgs { stack, outputs: path }, args)
    }

    #[test]
    fn test_register_merges_outputs() {
        let dir = TempDir::new().unwrap();
        let args = workspace(&dir);

        register(&args, StackArg::Db, "MediaBucket: social-media\nDBEndPoint: db.example.internal\n").unwrap();

        let registry = ResourceRegistry::load(&args.resources).unwrap();
        assert_eq!(registry.get("MediaBucket"), Some("social-media"));
        assert_eq!(registry.get("DBEndPoint"), Some("db.example.internal"));
        assert!(!registry.contains("DBSecurityGroup"));
    }

    #[test]
    fn test_register_skips_undeclared_outputs() {
        let dir = TempDir::new().unwrap();
        let args = workspace(&dir);

        register(&args, StackArg::Db, "DBSecurityGroup: sg-1\nRedisEndPoint: redis.example\n").unwrap();

        let registry = ResourceRegistry::load(&args.resources).unwrap();
        assert_eq!(registry.get("DBSecurityGroup"), Some("sg-1"));
        assert!(!registry.contains("RedisEndPoint"));
    }

    #[test]
    fn test_register_refuses_to_change_db_keys() {
        let dir = TempDir::new().unwrap();
        let args = workspace(&dir);
        register(&args, StackArg::Db, "DBSecurityGroup: sg-1\nMediaBucket: media\n").unwrap();
        let before = fs::read_to_string(&args.resources).unwrap();

        let err = register(&args, StackArg::Resources, "RedisEndPoint: redis.example\nDBSecurityGroup: sg-2\n")
            .unwrap_err();

        assert_eq!(err.downcast_ref::<StackError>().map(StackError::kind), Some(ErrorKind::Persistence));
        assert_eq!(fs::read_to_string(&args.resources).unwrap(), before);
    }

    #[test]
    fn test_register_rejects_non_map_outputs() {
        let dir = TempDir::new().unwrap();
        let args = workspace(&dir);

        assert!(register(&args, StackArg::Db, "- just\n- a list\n").is_err());
        assert!(!args.resources.exists());
    }
}
