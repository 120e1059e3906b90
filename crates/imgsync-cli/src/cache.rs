//! # Cache Subcommand
//!
//! Inspects or deletes the persisted identity cache.
//!
//! - `show`: Print scope, age, and entries as JSON.
//! - `clear`: Delete the cache file. The next sync rebuilds it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};

use imgsync_core::cache::CACHE_TTL_HOURS;
use imgsync_core::{CacheStore, IdentityCache, JsonFileStore};

use crate::resolve_cache_path;

/// Arguments for the `imgsync cache` subcommand.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Print the persisted cache.
    Show {
        /// Cache file (defaults to IMGSYNC_CACHE_PATH, then .imgsync/identity-cache.json).
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Delete the persisted cache.
    Clear {
        /// Cache file (defaults to IMGSYNC_CACHE_PATH, then .imgsync/identity-cache.json).
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

/// Execute the cache subcommand.
pub fn run_cache(args: &CacheArgs) -> Result<u8> {
    match &args.command {
        CacheCommand::Show { cache } => {
            let path = resolve_cache_path(cache.clone());
            match describe(&path, Utc::now())? {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => println!("no identity cache at {}", path.display()),
            }
            Ok(0)
        }
        CacheCommand::Clear { cache } => {
            let path = resolve_cache_path(cache.clone());
            if clear(&path)? {
                tracing::info!(path = %path.display(), "identity cache removed");
            } else {
                tracing::info!(path = %path.display(), "no identity cache to remove");
            }
            Ok(0)
        }
    }
}

/// Summary of the cache at `path`, or `None` when nothing is persisted.
pub fn describe(path: &Path, now: DateTime<Utc>) -> Result<Option<serde_json::Value>> {
    let store = JsonFileStore::new(path);
    let Some(cache) = store
        .read()
        .with_context(|| format!("failed to read identity cache {}", path.display()))?
    else {
        return Ok(None);
    };
    Ok(Some(report(&cache, now)))
}

fn report(cache: &IdentityCache, now: DateTime<Utc>) -> serde_json::Value {
    let expires_at = cache.created_at + Duration::hours(CACHE_TTL_HOURS);
    serde_json::json!({
        "scopeKey": cache.scope_key,
        "createdAt": cache.created_at,
        "expiresAt": expires_at,
        "expired": now >= expires_at,
        "entryCount": cache.len(),
        "entries": cache.entries,
    })
}

/// Remove the cache file. Returns whether a file was removed.
pub fn clear(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}
