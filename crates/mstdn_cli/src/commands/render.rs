//! Render command - print a stack's template.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use mstdn_stack::StackKind;

use super::{FormatArg, StackArg, Workspace, WorkspaceArgs};

#[derive(Args)]
pub struct RenderArgs {
    /// Stack to render
    #[arg(value_enum)]
    stack: StackArg,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn execute(args: RenderArgs, workspace: &WorkspaceArgs) -> Result<()> {
    let workspace = Workspace::load(workspace)?;
    let kind = StackKind::from(args.stack);
    let builder = kind.builder(workspace.inputs());

    let document = builder.render(args.format.into())?;

    match args.output {
        Some(path) => {
            fs::write(&path, &document).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Wrote {} stack {} to {:?}", kind, builder.stack_name(), path);
        }
        None => print!("{}", document),
    }
    Ok(())
}
