//! Client configuration.
//!
//! Custom `Debug` implementations redact credentials to prevent leakage
//! into log output.

use imgsync_core::SyncConfig;
use url::Url;
use zeroize::Zeroizing;

/// Connection settings for the destination CMS.
#[derive(Clone)]
pub struct DestinationConfig {
    /// Site root, e.g. `https://cms.example`. The REST prefix is appended.
    pub base_url: Url,
    pub username: String,
    /// Application password used for HTTP Basic auth.
    pub app_password: Zeroizing<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("app_password", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl From<&SyncConfig> for DestinationConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            base_url: config.destination_url.clone(),
            username: config.destination_user.clone(),
            app_password: config.destination_password.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Connection settings for the source store.
#[derive(Clone)]
pub struct SourceConfig {
    /// API root, e.g. `https://www.googleapis.com/drive/v3`.
    pub api_base: Url,
    /// OAuth bearer token.
    pub access_token: Zeroizing<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("api_base", &self.api_base)
            .field("access_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl From<&SyncConfig> for SourceConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            api_base: config.source_api.clone(),
            access_token: config.source_token.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}
