//! # Data Model
//!
//! Value types shared by the cache, resolver, renderer and orchestrator.
//! Source-side types are read-only snapshots of the file store; destination
//! identities are immutable and only ever replaced wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A destination-side object: stable identifier plus retrievable URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaIdentity {
    /// Opaque identifier assigned by the destination host.
    pub id: String,
    /// Public URL of the stored object.
    pub url: String,
}

impl MediaIdentity {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

impl std::fmt::Display for MediaIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "media:{}", self.id)
    }
}

/// A sub-folder of the source root. One folder becomes at most one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFolder {
    pub id: String,
    pub name: String,
}

/// An image file as listed by the source store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SourceFile {
    /// Text used for `alt` attributes: the description when present,
    /// otherwise the filename without its extension.
    pub fn alt_text(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => crate::cache::strip_extension(&self.name).to_string(),
        }
    }
}

/// A candidate returned by a destination listing or search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub id: String,
    pub url: String,
    /// Display title as rendered by the host; may contain markup.
    #[serde(default)]
    pub title: String,
}

impl RemoteObject {
    /// Last path segment of the object URL, percent-decoded and
    /// lower-cased, with any query string or fragment removed.
    pub fn basename(&self) -> String {
        let path = match url::Url::parse(&self.url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => self
                .url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        let segment = path.rsplit('/').next().unwrap_or_default();
        match urlencoding::decode(segment) {
            Ok(decoded) => decoded.to_lowercase(),
            Err(_) => segment.to_lowercase(),
        }
    }

    /// Title with markup removed, trimmed and lower-cased.
    pub fn normalized_title(&self) -> String {
        crate::cache::strip_tags(&self.title).trim().to_lowercase()
    }

    pub fn identity(&self) -> MediaIdentity {
        MediaIdentity::new(self.id.clone(), self.url.clone())
    }
}

/// Descriptive fields attached to an uploaded object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the uploaded bytes.
    #[serde(skip)]
    pub mime_type: Option<String>,
}

impl ObjectMetadata {
    /// Whether any descriptive field needs a follow-up update call.
    pub fn has_descriptive_fields(&self) -> bool {
        self.alt_text.is_some() || self.caption.is_some() || self.description.is_some()
    }
}

/// A destination document (the page being synchronized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub body: String,
}

/// One placed image within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionItem {
    pub identity: MediaIdentity,
    pub alt_text: String,
}

/// A named, ordered group of images built from one source sub-folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub items: Vec<SectionItem>,
}
