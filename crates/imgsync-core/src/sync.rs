//! # Sync Orchestrator
//!
//! Runs one synchronization of a source folder tree into a destination
//! page:
//!
//! 1. warm the identity cache from a full destination listing if needed
//! 2. list source sub-folders; for each, list and sort its images
//! 3. resolve each image (cache, then search); download and transfer misses
//! 4. drop empty sections, render the fragment, merge it into the page
//!
//! Uploaded identities are persisted to the cache as they are created, so
//! a failure in a later stage never loses them. A failed run still reports
//! how far it got through [`SyncFailure::partial`].

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{strip_extension, SessionCache};
use crate::error::SyncError;
use crate::host::{DestinationHost, HostError, SourceStore};
use crate::merge::merge;
use crate::model::{ObjectMetadata, Section, SectionItem, SourceFile, SourceFolder};
use crate::render::render;
use crate::resolver::{IdentityResolver, DEFAULT_SEARCH_PAGE_SIZE};
use crate::retry::TransferPolicy;

/// Image ordering within a section. Ties fall back to name, then id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
    ModifiedAsc,
    ModifiedDesc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name-asc" | "name" => Ok(SortOrder::NameAsc),
            "name-desc" => Ok(SortOrder::NameDesc),
            "modified-asc" | "modified" => Ok(SortOrder::ModifiedAsc),
            "modified-desc" => Ok(SortOrder::ModifiedDesc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

impl SortOrder {
    pub fn sort(self, files: &mut [SourceFile]) {
        files.sort_by(|a, b| self.compare(a, b));
    }

    fn compare(self, a: &SourceFile, b: &SourceFile) -> Ordering {
        let by_name = || {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        };
        match self {
            SortOrder::NameAsc => by_name(),
            SortOrder::NameDesc => by_name().reverse(),
            SortOrder::ModifiedAsc => a.modified_time.cmp(&b.modified_time).then_with(by_name),
            SortOrder::ModifiedDesc => b.modified_time.cmp(&a.modified_time).then_with(by_name),
        }
    }
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub source_folder_id: String,
    pub page_id: String,
    /// Discard the existing page body instead of merging into it.
    pub replace_all: bool,
    pub sort: SortOrder,
    /// Resolve only: never upload and never write the page.
    pub dry_run: bool,
}

/// Images placed for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionCount {
    pub name: String,
    pub count: usize,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// Files transferred during this run.
    pub uploaded: usize,
    /// Files found already present at the destination.
    pub reused: usize,
    /// Files left out (failed download, or unresolved in a dry run).
    pub skipped: usize,
    pub total_placed: usize,
    pub sections: Vec<SectionCount>,
    /// Whether the destination page body was rewritten.
    pub document_updated: bool,
}

/// A fatal error together with what the run had already done.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct SyncFailure {
    #[source]
    pub error: SyncError,
    pub partial: SyncResult,
}

/// Runs syncs against one source store and one destination host.
pub struct SyncEngine<'a> {
    source: &'a dyn SourceStore,
    host: &'a dyn DestinationHost,
    cache: &'a SessionCache,
    policy: TransferPolicy,
    search_page_size: u32,
}

impl<'a> SyncEngine<'a> {
    pub fn new(source: &'a dyn SourceStore, host: &'a dyn DestinationHost, cache: &'a SessionCache) -> Self {
        Self {
            source,
            host,
            cache,
            policy: TransferPolicy::default(),
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
        }
    }

    pub fn with_policy(mut self, policy: TransferPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_search_page_size(mut self, size: u32) -> Self {
        self.search_page_size = size;
        self
    }

    /// Execute one sync run.
    pub async fn run(&self, request: &SyncRequest) -> Result<SyncResult, SyncFailure> {
        let mut result = SyncResult::default();
        match self.run_inner(request, &mut result).await {
            Ok(()) => {
                tracing::info!(
                    uploaded = result.uploaded,
                    reused = result.reused,
                    skipped = result.skipped,
                    placed = result.total_placed,
                    sections = result.sections.len(),
                    document_updated = result.document_updated,
                    "sync complete"
                );
                Ok(result)
            }
            Err(error) => {
                tracing::error!(uploaded = result.uploaded, "sync aborted: {error}");
                Err(SyncFailure {
                    error,
                    partial: result,
                })
            }
        }
    }

    async fn run_inner(&self, request: &SyncRequest, result: &mut SyncResult) -> Result<(), SyncError> {
        if request.source_folder_id.trim().is_empty() {
            return Err(SyncError::Configuration("source folder id is empty".into()));
        }
        if request.page_id.trim().is_empty() {
            return Err(SyncError::Configuration("destination page id is empty".into()));
        }

        if self.cache.needs_warmup() {
            self.cache.warm_up(self.host).await?;
        }

        let folders = match self.source.list_folders(&request.source_folder_id).await {
            Ok(folders) => folders,
            Err(e @ HostError::Malformed { .. }) => {
                tracing::warn!(folder = %request.source_folder_id, "unreadable folder listing, treating as empty: {e}");
                Vec::new()
            }
            Err(e) => return Err(SyncError::from_host("list source folders", e)),
        };

        let resolver =
            IdentityResolver::new(self.cache, self.host).with_search_page_size(self.search_page_size);

        let mut sections = Vec::new();
        for folder in &folders {
            let section = self.sync_folder(folder, request, &resolver, result).await?;
            if section.items.is_empty() {
                tracing::debug!(section = %folder.name, "no images placed, dropping section");
                continue;
            }
            result.sections.push(SectionCount {
                name: section.name.clone(),
                count: section.items.len(),
            });
            result.total_placed += section.items.len();
            sections.push(section);
        }

        let fragment = render(&sections);
        let document = self
            .host
            .get_document(&request.page_id)
            .await
            .map_err(|e| SyncError::from_host("fetch destination page", e))?;
        let merged = merge(&document.body, &fragment, request.replace_all);

        if request.dry_run {
            tracing::info!(page = %request.page_id, bytes = merged.len(), "dry run, page not written");
        } else if merged == document.body {
            tracing::info!(page = %request.page_id, "page already up to date");
        } else {
            self.host
                .update_document(&request.page_id, &merged)
                .await
                .map_err(|e| SyncError::from_host("update destination page", e))?;
            result.document_updated = true;
        }
        Ok(())
    }

    async fn sync_folder(
        &self,
        folder: &SourceFolder,
        request: &SyncRequest,
        resolver: &IdentityResolver<'_>,
        result: &mut SyncResult,
    ) -> Result<Section, SyncError> {
        let mut files = match self.source.list_images(&folder.id).await {
            Ok(files) => files,
            Err(e @ HostError::Malformed { .. }) => {
                tracing::warn!(section = %folder.name, "unreadable image listing, treating as empty: {e}");
                Vec::new()
            }
            Err(e) => return Err(SyncError::from_host(format!("list images in {}", folder.name), e)),
        };
        request.sort.sort(&mut files);

        let mut items = Vec::with_capacity(files.len());
        for file in &files {
            if let Some(identity) = resolver.resolve(&file.name).await? {
                result.reused += 1;
                metrics::counter!("imgsync_reused_total").increment(1);
                items.push(SectionItem {
                    identity,
                    alt_text: file.alt_text(),
                });
                continue;
            }

            if request.dry_run {
                tracing::info!(section = %folder.name, filename = %file.name, "would upload");
                result.skipped += 1;
                continue;
            }

            let bytes = match self.source.download(&file.id).await {
                Ok(bytes) => bytes,
                Err(e) if e.is_unauthorized() => {
                    return Err(SyncError::from_host(format!("download {}", file.name), e));
                }
                Err(e) => {
                    tracing::warn!(section = %folder.name, filename = %file.name, "skipping file: {e}");
                    result.skipped += 1;
                    continue;
                }
            };

            let identity = self
                .policy
                .transfer(self.host, self.cache, &bytes, &file.name, &upload_metadata(file))
                .await?;
            result.uploaded += 1;
            items.push(SectionItem {
                identity,
                alt_text: file.alt_text(),
            });
        }

        Ok(Section {
            name: folder.name.clone(),
            items,
        })
    }
}

fn upload_metadata(file: &SourceFile) -> ObjectMetadata {
    let description = file
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    ObjectMetadata {
        title: Some(strip_extension(&file.name).to_string()),
        alt_text: Some(file.alt_text()),
        caption: None,
        description,
        mime_type: Some(file.mime_type.clone()),
    }
}
