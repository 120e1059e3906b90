//! # Identity Cache
//!
//! Maps normalized file names to destination identities so that files
//! already transferred are never uploaded twice.
//!
//! ## Validity
//!
//! A cache is bound to exactly one destination endpoint (its scope) and
//! expires [`CACHE_TTL_HOURS`] after creation. A cache that fails either
//! check is discarded and rebuilt from an empty state.
//!
//! ## Keys
//!
//! Every entry is stored under the lower-cased full filename and under the
//! lower-cased extension-stripped name. Lookups probe both forms, so
//! `sunset.jpg` and `sunset` resolve to the same identity.
//!
//! ## Persistence
//!
//! [`SessionCache`] is the single owner of the in-memory cache and of its
//! [`CacheStore`]. Each incremental write re-reads the store and merges the
//! on-disk entries before writing, inside one mutex-guarded critical
//! section. Store failures are logged and the run continues with the
//! in-memory state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, SyncError};
use crate::host::DestinationHost;
use crate::model::{MediaIdentity, RemoteObject};

/// Lifetime of a persisted cache.
pub const CACHE_TTL_HOURS: i64 = 24;

/// Page size used when listing every destination object during warm-up.
pub const WARMUP_PAGE_SIZE: u32 = 100;

/// Upper bound on listing pages fetched during warm-up.
pub const WARMUP_MAX_PAGES: u32 = 50;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Lower-cased, trimmed lookup key.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Filename without its trailing extension. Dotfiles and names without a
/// dot are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Remove markup tags from a display title.
pub fn strip_tags(text: &str) -> String {
    TAG.replace_all(text, "").into_owned()
}

/// Persisted mapping from normalized name to destination identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCache {
    /// Destination endpoint this cache belongs to.
    pub scope_key: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub entries: BTreeMap<String, MediaIdentity>,
}

impl IdentityCache {
    /// An empty cache for `scope`, created at `now`.
    pub fn new(scope: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            scope_key: scope.into(),
            created_at: now,
            entries: BTreeMap::new(),
        }
    }

    /// Same scope and younger than the TTL.
    pub fn is_valid(&self, scope: &str, now: DateTime<Utc>) -> bool {
        self.scope_key == scope && now - self.created_at < Duration::hours(CACHE_TTL_HOURS)
    }

    /// Probe the full name, then the extension-stripped name.
    pub fn lookup(&self, name: &str) -> Option<&MediaIdentity> {
        let full = normalize_key(name);
        self.entries
            .get(&full)
            .or_else(|| self.entries.get(strip_extension(&full)))
    }

    /// Register `identity` under both key forms of `name`.
    pub fn insert(&mut self, name: &str, identity: MediaIdentity) {
        let full = normalize_key(name);
        if full.is_empty() {
            return;
        }
        let stripped = strip_extension(&full).to_string();
        if stripped != full {
            self.entries.insert(stripped, identity.clone());
        }
        self.entries.insert(full, identity);
    }

    /// Register a listed destination object under its URL basename and
    /// under its display title.
    pub fn insert_object(&mut self, object: &RemoteObject) {
        let identity = object.identity();
        self.insert(&object.basename(), identity.clone());
        let title = object.normalized_title();
        if !title.is_empty() {
            self.entries.insert(title, identity);
        }
    }

    /// Fold in entries from another copy of the same cache. Keys already
    /// present here are kept.
    pub fn absorb(&mut self, other: IdentityCache) {
        for (key, identity) in other.entries {
            self.entries.entry(key).or_insert(identity);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Backing storage for a persisted [`IdentityCache`].
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn read(&self) -> Result<Option<IdentityCache>, CacheError>;

    fn write(&self, cache: &IdentityCache) -> Result<(), CacheError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

/// Read persisted state. Any failure is logged and reported as absent.
pub fn load(store: &dyn CacheStore) -> Option<IdentityCache> {
    match store.read() {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!(location = %store.location(), "ignoring unreadable identity cache: {e}");
            None
        }
    }
}

/// Best-effort write. Returns whether the write succeeded.
pub fn save(store: &dyn CacheStore, cache: &IdentityCache) -> bool {
    match store.write(cache) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                location = %store.location(),
                entries = cache.len(),
                "identity cache not persisted, continuing in memory: {e}"
            );
            false
        }
    }
}

/// JSON file on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl CacheStore for JsonFileStore {
    fn read(&self) -> Result<Option<IdentityCache>, CacheError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                path: self.path.display().to_string(),
                source,
            })
    }

    fn write(&self, cache: &IdentityCache) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_vec_pretty(cache).map_err(|source| CacheError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        // Write-then-rename so a crash never leaves a truncated cache.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Process-local store, for tests and cache-less runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<IdentityCache>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `cache`.
    pub fn with(cache: IdentityCache) -> Self {
        Self {
            slot: Mutex::new(Some(cache)),
        }
    }

    /// Current persisted contents.
    pub fn snapshot(&self) -> Option<IdentityCache> {
        self.slot.lock().clone()
    }
}

impl CacheStore for MemoryStore {
    fn read(&self) -> Result<Option<IdentityCache>, CacheError> {
        Ok(self.slot.lock().clone())
    }

    fn write(&self, cache: &IdentityCache) -> Result<(), CacheError> {
        *self.slot.lock() = Some(cache.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

impl<T: CacheStore + ?Sized> CacheStore for std::sync::Arc<T> {
    fn read(&self) -> Result<Option<IdentityCache>, CacheError> {
        (**self).read()
    }

    fn write(&self, cache: &IdentityCache) -> Result<(), CacheError> {
        (**self).write(cache)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// The session's identity cache and the sole writer of its store.
pub struct SessionCache {
    state: Mutex<IdentityCache>,
    store: Box<dyn CacheStore>,
    rebuilt: bool,
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SessionCache")
            .field("scope", &state.scope_key)
            .field("entries", &state.len())
            .field("store", &self.store.location())
            .field("rebuilt", &self.rebuilt)
            .finish()
    }
}

impl SessionCache {
    /// Load the persisted cache for `scope`, discarding it when stale,
    /// bound to another endpoint, or unreadable.
    pub fn open(store: Box<dyn CacheStore>, scope: &str, now: DateTime<Utc>) -> Self {
        let loaded = match load(store.as_ref()) {
            Some(cache) if cache.is_valid(scope, now) => {
                tracing::debug!(scope, entries = cache.len(), "reusing persisted identity cache");
                Some(cache)
            }
            Some(cache) => {
                tracing::info!(
                    scope,
                    cached_scope = %cache.scope_key,
                    created_at = %cache.created_at,
                    "discarding stale or foreign identity cache"
                );
                None
            }
            None => None,
        };

        let rebuilt = loaded.is_none();
        let state = loaded.unwrap_or_else(|| IdentityCache::new(scope, now));
        Self {
            state: Mutex::new(state),
            store,
            rebuilt,
        }
    }

    pub fn scope(&self) -> String {
        self.state.lock().scope_key.clone()
    }

    /// True when the cache was rebuilt or holds nothing, so a full listing
    /// of destination objects should seed it.
    pub fn needs_warmup(&self) -> bool {
        self.rebuilt || self.state.lock().is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<MediaIdentity> {
        self.state.lock().lookup(name).cloned()
    }

    /// Register one identity and persist, merged with the latest stored state.
    pub fn put(&self, name: &str, identity: MediaIdentity) {
        self.commit(|cache| cache.insert(name, identity));
    }

    /// Register a batch of listed destination objects and persist once.
    pub fn bulk_load(&self, objects: &[RemoteObject]) {
        self.commit(|cache| {
            for object in objects {
                cache.insert_object(object);
            }
        });
    }

    /// Persist the current in-memory state as-is.
    pub fn save(&self) -> bool {
        let state = self.state.lock();
        save(self.store.as_ref(), &state)
    }

    pub fn snapshot(&self) -> IdentityCache {
        self.state.lock().clone()
    }

    /// Page through every destination object and seed the cache.
    ///
    /// Authentication failures abort. Any other listing failure stops the
    /// warm-up early and keeps what was collected so far.
    pub async fn warm_up(&self, host: &dyn DestinationHost) -> Result<usize, SyncError> {
        let mut objects = Vec::new();
        for page in 1..=WARMUP_MAX_PAGES {
            match host.list_objects(page, WARMUP_PAGE_SIZE).await {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => {
                    let short = batch.len() < WARMUP_PAGE_SIZE as usize;
                    objects.extend(batch);
                    if short {
                        break;
                    }
                }
                Err(e) if e.is_unauthorized() => {
                    return Err(SyncError::from_host("list destination media", e));
                }
                Err(e) => {
                    tracing::warn!(page, "destination listing interrupted, keeping partial warm-up: {e}");
                    break;
                }
            }
        }

        self.bulk_load(&objects);
        tracing::info!(objects = objects.len(), "identity cache warmed from destination listing");
        Ok(objects.len())
    }

    /// Read-before-write under the state lock.
    ///
    /// The stored copy is the base, so values another writer stored since
    /// we loaded win over what this session merely read earlier. Keys only
    /// held in memory are folded back in, then `apply` writes this call's
    /// keys on top of both.
    fn commit(&self, apply: impl FnOnce(&mut IdentityCache)) {
        let mut state = self.state.lock();
        let mut next = match load(self.store.as_ref()) {
            Some(disk) if disk.is_valid(&state.scope_key, Utc::now()) => {
                let mut merged = disk;
                merged.absorb(state.clone());
                merged
            }
            _ => state.clone(),
        };
        apply(&mut next);
        save(self.store.as_ref(), &next);
        *state = next;
    }
}
