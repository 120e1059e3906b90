//! Destination host client for a WordPress-style REST API.
//!
//! Base path: `{site}/wp-json/wp/v2`
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/media?page&per_page` | Full media listing |
//! | GET    | `/media?search&per_page` | Media search |
//! | POST   | `/media` | Upload (raw body + `Content-Disposition`) |
//! | POST   | `/media/{id}` | Update alt text, caption, description |
//! | GET    | `/pages/{id}?context=edit` | Fetch raw page content |
//! | POST   | `/pages/{id}` | Replace page content |
//!
//! Authentication is HTTP Basic with an application password.

use std::time::Duration;

use async_trait::async_trait;
use imgsync_core::{DestinationHost, Document, HostError, MediaIdentity, ObjectMetadata, RemoteObject};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::config::DestinationConfig;
use crate::http::{decode, send, trim_base};
use crate::ClientError;

const API_PREFIX: &str = "wp-json/wp/v2";

/// Error code returned when paging past the end of a collection.
const INVALID_PAGE_CODE: &str = "rest_post_invalid_page_number";

/// A rendered/raw text pair as returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
struct WpText {
    #[serde(default)]
    raw: Option<String>,
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WpMedia {
    id: u64,
    source_url: String,
    #[serde(default)]
    title: WpText,
}

impl From<WpMedia> for RemoteObject {
    fn from(media: WpMedia) -> Self {
        RemoteObject {
            id: media.id.to_string(),
            url: media.source_url,
            title: media.title.rendered,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WpPage {
    id: u64,
    #[serde(default)]
    content: WpText,
}

#[derive(Debug, Serialize)]
struct PageUpdate<'a> {
    content: &'a str,
}

/// HTTP client for the destination CMS.
pub struct HttpDestinationHost {
    http: reqwest::Client,
    site: String,
    api: String,
    username: String,
    app_password: Zeroizing<String>,
}

impl std::fmt::Debug for HttpDestinationHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDestinationHost")
            .field("site", &self.site)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl HttpDestinationHost {
    pub fn new(config: DestinationConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let site = trim_base(&config.base_url);
        Ok(Self {
            http,
            api: format!("{site}/{API_PREFIX}"),
            site,
            username: config.username,
            app_password: config.app_password,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}/{path}", self.api))
            .basic_auth(&self.username, Some(self.app_password.as_str()))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/{path}", self.api))
            .basic_auth(&self.username, Some(self.app_password.as_str()))
    }
}

#[async_trait]
impl DestinationHost for HttpDestinationHost {
    fn endpoint(&self) -> &str {
        &self.site
    }

    async fn list_objects(&self, page: u32, per_page: u32) -> Result<Vec<RemoteObject>, HostError> {
        let operation = "GET /media";
        let request = self.get("media").query(&[
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
            ("orderby", "id".to_string()),
            ("order", "asc".to_string()),
        ]);

        let resp = match send(request, operation).await {
            Ok(resp) => resp,
            Err(HostError::Rejected { status: 400, body, .. }) if body.contains(INVALID_PAGE_CODE) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let media: Vec<WpMedia> = decode(resp, operation).await?;
        Ok(media.into_iter().map(RemoteObject::from).collect())
    }

    async fn search_objects(&self, query: &str, per_page: u32) -> Result<Vec<RemoteObject>, HostError> {
        let operation = "GET /media?search";
        let request = self
            .get("media")
            .query(&[("search", query.to_string()), ("per_page", per_page.to_string())]);

        let resp = send(request, operation).await?;
        let media: Vec<WpMedia> = decode(resp, operation).await?;
        Ok(media.into_iter().map(RemoteObject::from).collect())
    }

    async fn create_object(
        &self,
        bytes: &[u8],
        filename: &str,
        metadata: &ObjectMetadata,
    ) -> Result<MediaIdentity, HostError> {
        let operation = "POST /media";
        let content_type = metadata
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let disposition = format!(
            "attachment; filename=\"{}\"",
            filename.replace(['"', '\\'], "_")
        );

        let request = self
            .post("media")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_DISPOSITION, disposition)
            .body(bytes.to_vec());

        let resp = send(request, operation).await?;
        let media: WpMedia = decode(resp, operation).await?;
        Ok(MediaIdentity::new(media.id.to_string(), media.source_url))
    }

    async fn update_object_metadata(&self, id: &str, metadata: &ObjectMetadata) -> Result<(), HostError> {
        let operation = format!("POST /media/{id}");
        send(self.post(&format!("media/{id}")).json(metadata), &operation).await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Document, HostError> {
        let operation = format!("GET /pages/{id}");
        let request = self.get(&format!("pages/{id}")).query(&[("context", "edit")]);

        let resp = send(request, &operation).await?;
        let page: WpPage = decode(resp, &operation).await?;
        // Rendered content has its block delimiters stripped; writing it
        // back would flatten the page.
        let body = page.content.raw.ok_or_else(|| HostError::Malformed {
            operation: operation.clone(),
            detail: "page content has no raw form (edit context unavailable)".to_string(),
        })?;
        Ok(Document {
            id: page.id.to_string(),
            body,
        })
    }

    async fn update_document(&self, id: &str, body: &str) -> Result<(), HostError> {
        let operation = format!("POST /pages/{id}");
        send(
            self.post(&format!("pages/{id}")).json(&PageUpdate { content: body }),
            &operation,
        )
        .await?;
        Ok(())
    }
}
