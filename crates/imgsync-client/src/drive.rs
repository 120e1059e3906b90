//! Source store client for a Drive v3 style file API.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/files?q=...&orderBy=name` | List children of a folder |
//! | GET    | `/files/{id}?alt=media` | Download file content |
//!
//! Listings follow `nextPageToken` until exhausted. Authentication is a
//! bearer token.

use std::time::Duration;

use async_trait::async_trait;
use imgsync_core::{HostError, SourceFile, SourceFolder, SourceStore};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::config::SourceConfig;
use crate::http::{decode, send, trim_base};
use crate::ClientError;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const PAGE_SIZE: &str = "1000";

/// Upper bound on listing pages per folder.
const MAX_PAGES: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList<T> {
    #[serde(default = "Vec::new")]
    files: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// HTTP client for the source store.
pub struct HttpSourceStore {
    http: reqwest::Client,
    api: String,
    access_token: Zeroizing<String>,
}

impl std::fmt::Debug for HttpSourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSourceStore")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl HttpSourceStore {
    pub fn new(config: SourceConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api: trim_base(&config.api_base),
            access_token: config.access_token,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}/{path}", self.api))
            .bearer_auth(self.access_token.as_str())
    }

    /// Every child matching `query`, following page tokens.
    async fn list_all<T>(&self, query: String, fields: &str, operation: &str) -> Result<Vec<T>, HostError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut params = vec![
                ("q", query.clone()),
                ("orderBy", "name".to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
                ("fields", format!("nextPageToken,files({fields})")),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let resp = send(self.get("files").query(&params), operation).await?;
            let page: FileList<T> = decode(resp, operation).await?;
            out.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(out),
            }
        }

        tracing::warn!(operation, pages = MAX_PAGES, "listing truncated at page limit");
        Ok(out)
    }
}

/// Quote an identifier for use inside a `q` expression.
fn quote(id: &str) -> String {
    format!("'{}'", id.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[async_trait]
impl SourceStore for HttpSourceStore {
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<SourceFolder>, HostError> {
        let query = format!(
            "{} in parents and mimeType = '{FOLDER_MIME}' and trashed = false",
            quote(parent_id)
        );
        let mut folders: Vec<SourceFolder> = self.list_all(query, "id,name", "GET /files (folders)").await?;
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    async fn list_images(&self, folder_id: &str) -> Result<Vec<SourceFile>, HostError> {
        let query = format!(
            "{} in parents and mimeType contains 'image/' and trashed = false",
            quote(folder_id)
        );
        let files: Vec<SourceFile> = self
            .list_all(
                query,
                "id,name,mimeType,modifiedTime,description",
                "GET /files (images)",
            )
            .await?;
        Ok(files
            .into_iter()
            .filter(|f| f.mime_type.starts_with("image/"))
            .collect())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, HostError> {
        let operation = format!("GET /files/{file_id}?alt=media");
        let resp = send(self.get(&format!("files/{file_id}")).query(&[("alt", "media")]), &operation).await?;
        let bytes = resp.bytes().await.map_err(|e| HostError::Network {
            operation: operation.clone(),
            detail: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}
