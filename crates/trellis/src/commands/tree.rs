//! `trellis tree` command implementation.

use clap::Args;
use trellis_engine::{Page, PageStatus};

use super::EngineArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the tree command.
#[derive(Args)]
pub(crate) struct TreeArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Print nested-set markers next to each page.
    #[arg(long)]
    markers: bool,

    /// Show only active pages.
    #[arg(long)]
    active_only: bool,
}

impl TreeArgs {
    /// Print the page tree in pre-order, indented by depth.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let engine = self.engine.open()?;
        let snapshot = engine.snapshot();

        if snapshot.pages().is_empty() {
            output.warning("No pages");
            return Ok(());
        }

        for page in snapshot.pages().iter() {
            if self.active_only && page.status != PageStatus::Active {
                continue;
            }
            let line = format_page(page);
            let note = describe(page, self.markers);
            if note.is_empty() {
                output.result(&line);
            } else {
                output.result_with_note(&line, &note);
            }
        }
        Ok(())
    }
}

fn format_page(page: &Page) -> String {
    let indent = "  ".repeat(page.depth as usize);
    format!("{indent}{} {}", page.title, page.path)
}

fn describe(page: &Page, markers: bool) -> String {
    let mut parts = Vec::new();
    if page.status != PageStatus::Active {
        parts.push(page.status.to_string());
    }
    if markers {
        parts.push(format!("[{}, {}]", page.lft, page.rgt));
    }
    parts.join(" ")
}
