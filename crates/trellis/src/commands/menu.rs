//! `trellis menu` command implementation.

use clap::Args;
use trellis_engine::MenuNode;

use super::EngineArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the menu command.
#[derive(Args)]
pub(crate) struct MenuArgs {
    /// Menu name.
    name: String,

    #[command(flatten)]
    engine: EngineArgs,

    /// Print the menu as JSON.
    #[arg(long)]
    json: bool,
}

impl MenuArgs {
    /// Print the navigation tree of a menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded or no menu has the
    /// given name.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let engine = self.engine.open()?;
        let nodes = engine
            .menu_tree(&self.name)
            .ok_or_else(|| CliError::MenuNotFound(self.name.clone()))?;

        if self.json {
            output.result(&serde_json::to_string_pretty(&nodes)?);
            return Ok(());
        }

        if nodes.is_empty() {
            output.warning(&format!("Menu '{}' has no items", self.name));
            return Ok(());
        }
        for line in render(&nodes) {
            output.result(&line);
        }
        Ok(())
    }
}

/// Render menu nodes as indented lines.
fn render(nodes: &[MenuNode]) -> Vec<String> {
    fn walk(nodes: &[MenuNode], level: usize, lines: &mut Vec<String>) {
        for node in nodes {
            let indent = "  ".repeat(level);
            let href = node.href.as_deref().unwrap_or("(missing page)");
            lines.push(format!("{indent}- {} -> {href}", node.text));
            walk(&node.children, level + 1, lines);
        }
    }

    let mut lines = Vec::new();
    walk(nodes, 0, &mut lines);
    lines
}
