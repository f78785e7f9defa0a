//! `trellis regenerate` command implementation.

use clap::Args;
use trellis_engine::{Engine, Menu, MenuKind};

use super::EngineArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the regenerate command.
#[derive(Args)]
pub(crate) struct RegenerateArgs {
    /// Auto menu to rebuild.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    name: Option<String>,

    /// Rebuild every auto menu.
    #[arg(long)]
    all: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

impl RegenerateArgs {
    /// Rebuild auto menus from the current page tree and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded, the menu does not
    /// exist or is static, or the rebuilt snapshot cannot be saved.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let engine = self.engine.open()?;

        let menus = match &self.name {
            Some(name) => vec![
                engine
                    .menu_by_name(name)
                    .ok_or_else(|| CliError::MenuNotFound(name.clone()))?,
            ],
            None => auto_menus(&engine),
        };

        if menus.is_empty() {
            output.warning("No auto menus to regenerate");
            return Ok(());
        }

        for menu in menus {
            let count = engine.regenerate_menu(menu.id)?;
            tracing::debug!(menu = %menu.name, count, "Regenerated from CLI");
            output.success(&format!("Regenerated '{}' ({count} items)", menu.name));
        }
        Ok(())
    }
}

fn auto_menus(engine: &Engine) -> Vec<Menu> {
    engine
        .snapshot()
        .menus()
        .sorted()
        .into_iter()
        .filter(|menu| menu.kind == MenuKind::Auto)
        .cloned()
        .collect()
}
