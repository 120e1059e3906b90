//! # imgsync-client: HTTP Collaborators
//!
//! Typed `reqwest` implementations of the collaborator traits declared in
//! `imgsync-core`:
//!
//! - [`HttpSourceStore`]: Drive v3 style file listing and download.
//! - [`HttpDestinationHost`]: WordPress REST style media and page API.
//!
//! ## Retry
//!
//! Clients make exactly one request per call. Retries and backoff belong
//! to `imgsync_core::TransferPolicy`; every failure is reported as an
//! `imgsync_core::HostError` so the policy can classify it.

pub mod config;
pub mod drive;
pub(crate) mod http;
pub mod wordpress;

pub use config::{DestinationConfig, SourceConfig};
pub use drive::HttpSourceStore;
pub use wordpress::HttpDestinationHost;

/// Failure to construct an HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}
