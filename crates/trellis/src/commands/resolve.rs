//! `trellis resolve` command implementation.

use clap::Args;

use super::EngineArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the resolve command.
#[derive(Args)]
pub(crate) struct ResolveArgs {
    /// Requested URL path, e.g. `/about`.
    path: String,

    #[command(flatten)]
    engine: EngineArgs,

    /// Maximum number of chained redirects to follow (overrides config).
    #[arg(long)]
    max_hops: Option<u32>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

impl ResolveArgs {
    /// Resolve a path against the redirect ledger.
    ///
    /// Visit counters are persisted to the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded or the path is not
    /// absolute.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        if !self.path.starts_with('/') {
            return Err(CliError::Validation(format!(
                "Path must start with `/`: {}",
                self.path
            )));
        }

        let engine = self.engine.open_with_max_hops(self.max_hops)?;
        let target = engine.resolve_redirect(&self.path);

        if self.json {
            output.result(&serde_json::to_string_pretty(&target)?);
            return Ok(());
        }

        match target {
            Some(target) => {
                output.result(&format!("{} {}", target.status_code, target.destination_path));
            }
            None => output.warning(&format!("No redirect for {}", self.path)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ResolveArgs,
    }

    #[test]
    fn test_max_hops_flag_parsed() {
        let harness = Harness::try_parse_from(["resolve", "/old", "--max-hops", "4"]).unwrap();

        assert_eq!(harness.args.path, "/old");
        assert_eq!(harness.args.max_hops, Some(4));
    }

    #[test]
    fn test_max_hops_defaults_to_config() {
        let harness = Harness::try_parse_from(["resolve", "/old"]).unwrap();

        assert_eq!(harness.args.max_hops, None);
    }
}
