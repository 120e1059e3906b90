//! Sync configuration.
//!
//! Loaded from environment variables; the CLI overrides individual fields
//! from its flags. Credentials are zeroized on drop and redacted from
//! `Debug` output.

use std::path::PathBuf;

use url::Url;
use zeroize::Zeroizing;

use crate::resolver::DEFAULT_SEARCH_PAGE_SIZE;
use crate::retry::DEFAULT_RETRIES;
use crate::sync::{SortOrder, SyncRequest};

pub const DEFAULT_SOURCE_API: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_CACHE_PATH: &str = ".imgsync/identity-cache.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything needed to run one sync.
#[derive(Clone)]
pub struct SyncConfig {
    /// Root folder in the source store whose sub-folders become sections.
    pub source_folder_id: String,
    /// Destination page receiving the rendered fragment.
    pub page_id: String,
    /// Base URL of the destination CMS.
    pub destination_url: Url,
    pub destination_user: String,
    pub destination_password: Zeroizing<String>,
    /// Base URL of the source store API.
    pub source_api: Url,
    pub source_token: Zeroizing<String>,
    pub cache_path: PathBuf,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub sort: SortOrder,
    pub search_page_size: u32,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("source_folder_id", &self.source_folder_id)
            .field("page_id", &self.page_id)
            .field("destination_url", &self.destination_url)
            .field("destination_user", &self.destination_user)
            .field("destination_password", &"[REDACTED]")
            .field("source_api", &self.source_api)
            .field("source_token", &"[REDACTED]")
            .field("cache_path", &self.cache_path)
            .field("max_retries", &self.max_retries)
            .field("timeout_secs", &self.timeout_secs)
            .field("sort", &self.sort)
            .field("search_page_size", &self.search_page_size)
            .finish()
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `IMGSYNC_SOURCE_FOLDER_ID` (required)
    /// - `IMGSYNC_PAGE_ID` (required)
    /// - `IMGSYNC_DEST_URL` (required)
    /// - `IMGSYNC_DEST_USER` (required)
    /// - `IMGSYNC_DEST_APP_PASSWORD` (required)
    /// - `IMGSYNC_SOURCE_TOKEN` (required)
    /// - `IMGSYNC_SOURCE_API` (default: `https://www.googleapis.com/drive/v3`)
    /// - `IMGSYNC_CACHE_PATH` (default: `.imgsync/identity-cache.json`)
    /// - `IMGSYNC_MAX_RETRIES` (default: 3)
    /// - `IMGSYNC_TIMEOUT_SECS` (default: 30)
    /// - `IMGSYNC_SORT` (default: `name-asc`)
    /// - `IMGSYNC_SEARCH_PAGE_SIZE` (default: 20)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let url = |key: &'static str, raw: String| -> Result<Url, ConfigError> {
            Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(key, e.to_string()))
        };
        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key, raw)),
            }
        };

        let count = |key: &'static str, default: u32| -> Result<u32, ConfigError> {
            let n = number(key, u64::from(default))?;
            u32::try_from(n).map_err(|_| ConfigError::InvalidValue(key, n.to_string()))
        };

        let sort = match lookup("IMGSYNC_SORT") {
            None => SortOrder::default(),
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("IMGSYNC_SORT", raw))?,
        };

        Ok(Self {
            source_folder_id: required("IMGSYNC_SOURCE_FOLDER_ID")?,
            page_id: required("IMGSYNC_PAGE_ID")?,
            destination_url: url("IMGSYNC_DEST_URL", required("IMGSYNC_DEST_URL")?)?,
            destination_user: required("IMGSYNC_DEST_USER")?,
            destination_password: Zeroizing::new(required("IMGSYNC_DEST_APP_PASSWORD")?),
            source_api: url(
                "IMGSYNC_SOURCE_API",
                lookup("IMGSYNC_SOURCE_API").unwrap_or_else(|| DEFAULT_SOURCE_API.to_string()),
            )?,
            source_token: Zeroizing::new(required("IMGSYNC_SOURCE_TOKEN")?),
            cache_path: lookup("IMGSYNC_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            max_retries: count("IMGSYNC_MAX_RETRIES", DEFAULT_RETRIES)?,
            timeout_secs: number("IMGSYNC_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            sort,
            search_page_size: count("IMGSYNC_SEARCH_PAGE_SIZE", DEFAULT_SEARCH_PAGE_SIZE)?,
        })
    }

    /// The request a plain run of this configuration performs.
    pub fn request(&self) -> SyncRequest {
        SyncRequest {
            source_folder_id: self.source_folder_id.clone(),
            page_id: self.page_id.clone(),
            replace_all: false,
            sort: self.sort,
            dry_run: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(&'static str, String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
}
