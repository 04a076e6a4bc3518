//! Registry command - show the resource registry.

use anyhow::{Context, Result};

use mstdn_stack::ResourceRegistry;

use super::WorkspaceArgs;

pub fn execute(workspace: &WorkspaceArgs) -> Result<()> {
    let registry = ResourceRegistry::load(&workspace.resources)
        .with_context(|| format!("can't load {:?}", workspace.resources))?;

    if registry.is_empty() {
        println!("{} is empty, deploy the db stack first", workspace.resources.display());
        return Ok(());
    }

    let width = registry.keys().map(str::len).max().unwrap_or(0);
    for (key, value) in registry.iter() {
        println!("{:width$}  {}", key, value, width = width);
    }
    Ok(())
}
