//! # imgsync CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber, and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use imgsync_cli::cache::{run_cache, CacheArgs};
use imgsync_cli::render::{run_render, RenderArgs};
use imgsync_cli::sync::{run_sync, SyncArgs};

/// Synchronize image folders into a CMS page without re-uploading
/// images the destination already holds.
#[derive(Parser, Debug)]
#[command(name = "imgsync", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one folder-to-page sync.
    Sync(SyncArgs),

    /// Render a fragment offline from a JSON section list.
    Render(RenderArgs),

    /// Inspect or delete the persisted identity cache.
    Cache(CacheArgs),
}

/// `RUST_LOG` wins when set; otherwise verbosity picks the level.
fn filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let result = match cli.command {
        Commands::Sync(args) => run_sync(&args).await,
        Commands::Render(args) => run_render(&args),
        Commands::Cache(args) => run_cache(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_sync_flags() {
        let cli = Cli::try_parse_from([
            "imgsync",
            "sync",
            "--folder",
            "1AbC",
            "--page",
            "42",
            "--replace-all",
            "--dry-run",
            "--sort",
            "modified-desc",
            "--retries",
            "5",
        ])
        .unwrap();
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.folder.as_deref(), Some("1AbC"));
        assert_eq!(args.page.as_deref(), Some("42"));
        assert!(args.replace_all);
        assert!(args.dry_run);
        assert_eq!(args.sort.as_deref(), Some("modified-desc"));
        assert_eq!(args.retries, Some(5));
    }

    #[test]
    fn cli_parse_sync_defaults() {
        let cli = Cli::try_parse_from(["imgsync", "sync"]).unwrap();
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert!(args.folder.is_none());
        assert!(!args.replace_all);
        assert!(!args.dry_run);
    }

    #[test]
    fn cli_parse_no_cache_file() {
        let cli = Cli::try_parse_from(["imgsync", "sync", "--no-cache-file"]).unwrap();
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert!(args.no_cache_file);
        assert!(Cli::try_parse_from(["imgsync", "sync", "--no-cache-file", "--cache", "c.json"]).is_err());
    }

    #[test]
    fn cli_parse_render_requires_input() {
        assert!(Cli::try_parse_from(["imgsync", "render"]).is_err());
        let cli = Cli::try_parse_from(["imgsync", "render", "--input", "s.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Render(_)));
    }

    #[test]
    fn cli_parse_cache_clear_with_path() {
        let cli = Cli::try_parse_from(["imgsync", "cache", "clear", "--cache", "/tmp/c.json"]).unwrap();
        let Commands::Cache(args) = cli.command else {
            panic!("expected cache");
        };
        assert!(matches!(
            args.command,
            imgsync_cli::cache::CacheCommand::Clear { cache: Some(_) }
        ));
    }

    #[test]
    fn cli_parse_global_log_json() {
        let cli = Cli::try_parse_from(["imgsync", "cache", "show", "--log-json", "-v"]).unwrap();
        assert!(cli.log_json);
        assert_eq!(cli.verbose, 1);
    }
}
