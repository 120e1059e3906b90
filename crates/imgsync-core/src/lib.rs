//! # imgsync-core: Image Folder → CMS Page Reconciliation
//!
//! Synchronizes the image folders of a remote file store into a single
//! content-management page without re-uploading files that already exist
//! at the destination.
//!
//! ## Components
//!
//! - [`cache`]: TTL-bounded, scope-bound identity cache (disk + memory).
//! - [`resolver`]: cache lookup with a fallback remote search.
//! - [`retry`]: bounded-retry transfer policy with a fixed backoff schedule.
//! - [`render`]: deterministic fragment renderer (styles, navigation, galleries).
//! - [`merge`]: idempotent splice of a fresh fragment into an existing page body.
//! - [`sync`]: the orchestrator tying the above to the collaborator traits
//!   declared in [`host`].
//!
//! ## Crate Policy
//!
//! - Collaborators (file store, CMS host, cache store) are traits. HTTP
//!   implementations live in `imgsync-client`.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Persisted-cache problems are recovered locally and never abort a run.

pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod merge;
pub mod model;
pub mod render;
pub mod resolver;
pub mod retry;
pub mod sync;

pub use cache::{CacheStore, IdentityCache, JsonFileStore, MemoryStore, SessionCache};
pub use config::{ConfigError, SyncConfig};
pub use error::{CacheError, SyncError};
pub use host::{DestinationHost, FailureClass, HostError, SourceStore};
pub use merge::merge;
pub use model::{
    Document, MediaIdentity, ObjectMetadata, RemoteObject, Section, SectionItem, SourceFile,
    SourceFolder,
};
pub use render::{render, slugify};
pub use resolver::IdentityResolver;
pub use retry::TransferPolicy;
pub use sync::{SectionCount, SortOrder, SyncEngine, SyncFailure, SyncRequest, SyncResult};
