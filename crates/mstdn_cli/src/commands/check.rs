//! Check command - verify that a stack's references resolve.

use anyhow::{bail, Result};
use clap::Args;

use mstdn_stack::StackKind;
use mstdn_template::unresolved_references;

use super::{StackArg, Workspace, WorkspaceArgs};

#[derive(Args)]
pub struct CheckArgs {
    /// Stack to check
    #[arg(value_enum)]
    stack: StackArg,
}

pub fn execute(args: CheckArgs, workspace: &WorkspaceArgs) -> Result<()> {
    let workspace = Workspace::load(workspace)?;
    let kind = StackKind::from(args.stack);
    let builder = kind.builder(workspace.inputs());
    let template = builder.build()?;

    let unresolved = unresolved_references(&template, |name| workspace.registry.contains(name));
    if !unresolved.is_empty() {
        for reference in &unresolved {
            eprintln!("  {} -> {} (unresolved)", reference.location, reference.target);
        }
        bail!("{} stack has {} unresolved references", kind, unresolved.len());
    }

    println!(
        "{} stack {} OK: {} resources, {} outputs",
        kind,
        builder.stack_name(),
        template.resources().map_or(0, |r| r.len()),
        template.outputs().map_or(0, |o| o.len())
    );
    Ok(())
}
