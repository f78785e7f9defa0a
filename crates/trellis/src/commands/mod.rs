//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod menu;
pub(crate) mod regenerate;
pub(crate) mod resolve;
pub(crate) mod tree;

use std::path::PathBuf;

use clap::Args;
use trellis_cache::{MemoryCache, NullCache};
use trellis_config::{CliSettings, Config};
use trellis_engine::{Engine, EngineConfig};

use crate::error::CliError;

pub(crate) use check::CheckArgs;
pub(crate) use menu::MenuArgs;
pub(crate) use regenerate::RegenerateArgs;
pub(crate) use resolve::ResolveArgs;
pub(crate) use tree::TreeArgs;

/// Options shared by every command that opens a snapshot.
#[derive(Args)]
pub(crate) struct EngineArgs {
    /// Path to configuration file (default: auto-discover trellis.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file (overrides config).
    #[arg(short, long, env = "TRELLIS_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Disable menu caching.
    #[arg(long)]
    no_cache: bool,
}

impl EngineArgs {
    /// Load configuration and open the engine over the configured snapshot.
    pub(crate) fn open(&self) -> Result<Engine, CliError> {
        self.open_with_max_hops(None)
    }

    /// Like [`open`](Self::open), also overriding the redirect hop bound.
    pub(crate) fn open_with_max_hops(&self, max_hops: Option<u32>) -> Result<Engine, CliError> {
        let settings = CliSettings {
            snapshot: self.snapshot.clone(),
            cache_enabled: self.no_cache.then_some(false),
            max_hops,
        };
        let config = Config::load(self.config.as_deref(), Some(&settings))?;
        open_engine(&config)
    }
}

/// Open an engine described by `config`.
pub(crate) fn open_engine(config: &Config) -> Result<Engine, CliError> {
    let engine_config = engine_config(config);
    let engine = if config.cache.enabled {
        let cache = MemoryCache::new().with_ttl(config.cache.menu_ttl());
        Engine::new(engine_config, &cache)?
    } else {
        Engine::new(engine_config, &NullCache)?
    };
    Ok(engine)
}

/// Map loaded configuration onto engine settings.
fn engine_config(config: &Config) -> EngineConfig {
    EngineConfig {
        snapshot_path: Some(config.storage_resolved.snapshot_path.clone()),
        default_redirect_status: config.redirects.default_status,
        max_redirect_hops: config.redirects.max_hops,
    }
}
