//! `trellis check` command implementation.

use clap::Args;
use trellis_engine::MenuKind;

use super::EngineArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    engine: EngineArgs,
}

impl CheckArgs {
    /// Load the snapshot and verify the page tree invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded or an invariant is
    /// violated.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let engine = self.engine.open()?;
        engine.verify()?;

        let snapshot = engine.snapshot();
        let auto_menus = snapshot
            .menus()
            .sorted()
            .into_iter()
            .filter(|menu| menu.kind == MenuKind::Auto)
            .count();

        output.success("Snapshot is consistent");
        output.info(&format!("Pages: {}", snapshot.pages().len()));
        output.info(&format!(
            "Menus: {} ({auto_menus} auto)",
            snapshot.menus().len()
        ));
        output.info(&format!("Menu items: {}", snapshot.menu_items().len()));
        output.info(&format!("Redirects: {}", snapshot.redirects().len()));
        if let Some(at) = snapshot.committed_at() {
            output.info(&format!("Last commit: {}", at.to_rfc3339()));
        }
        Ok(())
    }
}
