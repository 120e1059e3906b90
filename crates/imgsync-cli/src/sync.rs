//! # Sync Subcommand
//!
//! Runs one reconciliation of the source folder tree into the destination
//! page. Settings come from `IMGSYNC_*` environment variables; flags given
//! on the command line take precedence.
//!
//! The result is printed to stdout as JSON. On failure the error and the
//! partial result are printed instead and the process exits non-zero.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use imgsync_client::{DestinationConfig, HttpDestinationHost, HttpSourceStore, SourceConfig};
use imgsync_core::{
    CacheStore, DestinationHost, JsonFileStore, MemoryStore, SessionCache, SyncConfig, SyncEngine,
    SyncRequest, TransferPolicy,
};

/// Arguments for the `imgsync sync` subcommand.
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Source root folder id (overrides IMGSYNC_SOURCE_FOLDER_ID).
    #[arg(long)]
    pub folder: Option<String>,

    /// Destination page id (overrides IMGSYNC_PAGE_ID).
    #[arg(long)]
    pub page: Option<String>,

    /// Replace the whole page body instead of splicing the generated region.
    #[arg(long)]
    pub replace_all: bool,

    /// Image order within a section: name-asc, name-desc, modified-asc, modified-desc.
    #[arg(long)]
    pub sort: Option<String>,

    /// Resolve and render without uploading or writing the page.
    #[arg(long)]
    pub dry_run: bool,

    /// Identity cache file (overrides IMGSYNC_CACHE_PATH).
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Retries per upload after the first attempt (overrides IMGSYNC_MAX_RETRIES).
    #[arg(long)]
    pub retries: Option<u32>,

    /// Keep the identity cache in memory only; nothing is read or written on disk.
    #[arg(long, conflicts_with = "cache")]
    pub no_cache_file: bool,
}

impl SyncArgs {
    /// The flag value standing in for an environment variable, if given.
    fn override_for(&self, key: &str) -> Option<String> {
        match key {
            "IMGSYNC_SOURCE_FOLDER_ID" => self.folder.clone(),
            "IMGSYNC_PAGE_ID" => self.page.clone(),
            "IMGSYNC_SORT" => self.sort.clone(),
            "IMGSYNC_CACHE_PATH" => self.cache.as_ref().map(|p| p.display().to_string()),
            "IMGSYNC_MAX_RETRIES" => self.retries.map(|r| r.to_string()),
            _ => None,
        }
    }

    /// Build the configuration, layering flags over `lookup`.
    pub fn config<F>(&self, lookup: F) -> Result<SyncConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = SyncConfig::from_lookup(|key| self.override_for(key).or_else(|| lookup(key)))
            .context("invalid sync configuration")?;
        Ok(config)
    }

    /// Backing store for the session's identity cache.
    pub fn cache_store(&self, config: &SyncConfig) -> Box<dyn CacheStore> {
        if self.no_cache_file {
            Box::new(MemoryStore::new())
        } else {
            Box::new(JsonFileStore::new(config.cache_path.clone()))
        }
    }

    /// The request for this invocation.
    pub fn request(&self, config: &SyncConfig) -> SyncRequest {
        SyncRequest {
            replace_all: self.replace_all,
            dry_run: self.dry_run,
            ..config.request()
        }
    }
}

/// Execute the sync subcommand.
pub async fn run_sync(args: &SyncArgs) -> Result<u8> {
    let config = args.config(|key| std::env::var(key).ok())?;
    tracing::debug!(?config, "loaded configuration");

    let source = HttpSourceStore::new(SourceConfig::from(&config)).context("building source client")?;
    let host =
        HttpDestinationHost::new(DestinationConfig::from(&config)).context("building destination client")?;

    let cache = SessionCache::open(args.cache_store(&config), host.endpoint(), Utc::now());

    let engine = SyncEngine::new(&source, &host, &cache)
        .with_policy(TransferPolicy::with_retries(config.max_retries))
        .with_search_page_size(config.search_page_size);

    let request = args.request(&config);
    match engine.run(&request).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(0)
        }
        Err(failure) => {
            tracing::error!(error = %failure.error, "sync failed");
            let report = serde_json::json!({
                "error": failure.error.to_string(),
                "partial": failure.partial,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if failure.error.is_authentication() { 2 } else { 1 })
        }
    }
}
