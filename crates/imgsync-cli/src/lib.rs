//! # imgsync-cli: Command-Line Interface
//!
//! Provides the `imgsync` binary. Argument parsing lives here; all
//! reconciliation logic is delegated to `imgsync-core`, and the HTTP
//! collaborators come from `imgsync-client`.
//!
//! ## Subcommands
//!
//! - `imgsync sync`: Run one folder-to-page sync and print the result.
//! - `imgsync render`: Render a fragment offline from a JSON section list.
//! - `imgsync cache`: Inspect or delete the persisted identity cache.
//!
//! ```bash
//! imgsync sync --dry-run
//! imgsync sync --folder 1AbC --page 42 --replace-all
//! imgsync sync --no-cache-file
//! imgsync render --input sections.json
//! imgsync cache show
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: success.
//! - `1`: the command failed (configuration, I/O, or a failed sync).
//! - `2`: the sync was rejected by a collaborator for bad credentials.

pub mod cache;
pub mod render;
pub mod sync;

use std::path::PathBuf;

use imgsync_core::config::DEFAULT_CACHE_PATH;

/// Environment variable naming the cache file.
pub const CACHE_PATH_VAR: &str = "IMGSYNC_CACHE_PATH";

/// Cache path from an explicit flag, then the environment, then the default.
pub fn resolve_cache_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(CACHE_PATH_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH))
}
