//! # Identity Resolver
//!
//! Answers "does this file already exist at the destination?" using the
//! session cache first and a remote title search second.
//!
//! A failed search degrades to "not found" (the caller then uploads, at
//! worst creating a duplicate). Only authentication failures abort.

use std::cmp::Ordering;

use crate::cache::{normalize_key, strip_extension, SessionCache};
use crate::error::SyncError;
use crate::host::DestinationHost;
use crate::model::{MediaIdentity, RemoteObject};

/// Default number of candidates requested from the fallback search.
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 20;

/// Cache-then-search resolution of filenames to destination identities.
pub struct IdentityResolver<'a> {
    cache: &'a SessionCache,
    host: &'a dyn DestinationHost,
    search_page_size: u32,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(cache: &'a SessionCache, host: &'a dyn DestinationHost) -> Self {
        Self {
            cache,
            host,
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
        }
    }

    pub fn with_search_page_size(mut self, size: u32) -> Self {
        self.search_page_size = size.max(1);
        self
    }

    /// Resolve `filename` to an existing destination identity.
    ///
    /// A cache hit makes no network call. On a search match the identity
    /// is registered in the cache before returning.
    pub async fn resolve(&self, filename: &str) -> Result<Option<MediaIdentity>, SyncError> {
        if let Some(hit) = self.cache.lookup(filename) {
            tracing::debug!(filename, id = %hit.id, "identity cache hit");
            return Ok(Some(hit));
        }

        let query = strip_extension(filename.trim());
        metrics::counter!("imgsync_search_fallbacks_total").increment(1);
        let candidates = match self.host.search_objects(query, self.search_page_size).await {
            Ok(candidates) => candidates,
            Err(e) if e.is_unauthorized() => {
                return Err(SyncError::from_host("search destination media", e));
            }
            Err(e) => {
                tracing::warn!(filename, "fallback search failed, treating as not found: {e}");
                return Ok(None);
            }
        };

        match best_match(filename, &candidates) {
            Some(found) => {
                let identity = found.identity();
                tracing::debug!(filename, id = %identity.id, "identity found by search");
                self.cache.put(filename, identity.clone());
                Ok(Some(identity))
            }
            None => {
                tracing::debug!(filename, candidates = candidates.len(), "no existing identity");
                Ok(None)
            }
        }
    }

    /// Record a freshly created identity.
    pub fn register(&self, filename: &str, identity: MediaIdentity) {
        self.cache.put(filename, identity);
    }
}

/// Whether a search candidate refers to `filename`: same URL basename, or a
/// display title equal to the extension-stripped name.
pub fn is_match(filename: &str, candidate: &RemoteObject) -> bool {
    let full = normalize_key(filename);
    let stem = strip_extension(&full);
    candidate.basename() == full || candidate.normalized_title() == stem
}

/// Among all matching candidates pick the one with the lowest identifier,
/// so the choice does not depend on the order the host returned them in.
pub fn best_match<'c>(filename: &str, candidates: &'c [RemoteObject]) -> Option<&'c RemoteObject> {
    candidates
        .iter()
        .filter(|c| is_match(filename, c))
        .min_by(|a, b| compare_ids(&a.id, &b.id))
}

/// Numeric order when both ids are integers, lexicographic otherwise.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}
