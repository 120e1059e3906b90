//! # Render Subcommand
//!
//! Renders a fragment from a JSON list of sections without contacting
//! either collaborator. Useful for previewing markup changes.
//!
//! Input shape:
//!
//! ```json
//! [{ "name": "Beach", "items": [{ "identity": { "id": "12", "url": "https://..." }, "alt_text": "Dunes" }] }]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use imgsync_core::{render, Section};

/// Arguments for the `imgsync render` subcommand.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON file holding the section list.
    #[arg(long)]
    pub input: PathBuf,

    /// Write the fragment here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Read sections from `path` and render them.
pub fn render_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let sections: Vec<Section> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse sections from {}", path.display()))?;
    Ok(render(&sections))
}

/// Execute the render subcommand.
pub fn run_render(args: &RenderArgs) -> Result<u8> {
    let fragment = render_file(&args.input)?;
    match &args.output {
        Some(out) => {
            std::fs::write(out, &fragment).with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(path = %out.display(), bytes = fragment.len(), "fragment written");
        }
        None => println!("{fragment}"),
    }
    Ok(0)
}
