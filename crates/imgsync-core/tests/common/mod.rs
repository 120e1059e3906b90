//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use imgsync_core::{
    DestinationHost, Document, HostError, MediaIdentity, ObjectMetadata, RemoteObject, SourceFile,
    SourceFolder, SourceStore,
};
use parking_lot::Mutex;

pub const ENDPOINT: &str = "https://cms.example";

/// Source store holding folders and their images in memory.
#[derive(Default)]
pub struct FakeSource {
    pub folders: Vec<SourceFolder>,
    pub images: HashMap<String, Vec<SourceFile>>,
    pub bytes: HashMap<String, Vec<u8>>,
    pub failing_downloads: HashMap<String, HostError>,
    pub failing_listings: HashMap<String, HostError>,
    pub folder_error: Option<HostError>,
}

impl FakeSource {
    pub fn folder(mut self, id: &str, name: &str, files: &[&str]) -> Self {
        self.folders.push(SourceFolder {
            id: id.into(),
            name: name.into(),
        });
        let images = files
            .iter()
            .map(|name| {
                let file_id = format!("{id}/{name}");
                self.bytes.insert(file_id.clone(), name.as_bytes().to_vec());
                SourceFile {
                    id: file_id,
                    name: (*name).into(),
                    mime_type: "image/jpeg".into(),
                    modified_time: None,
                    description: None,
                }
            })
            .collect();
        self.images.insert(id.into(), images);
        self
    }
}

#[async_trait]
impl SourceStore for FakeSource {
    async fn list_folders(&self, _parent_id: &str) -> Result<Vec<SourceFolder>, HostError> {
        if let Some(err) = &self.folder_error {
            return Err(err.clone());
        }
        let mut folders = self.folders.clone();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    async fn list_images(&self, folder_id: &str) -> Result<Vec<SourceFile>, HostError> {
        if let Some(err) = self.failing_listings.get(folder_id) {
            return Err(err.clone());
        }
        Ok(self.images.get(folder_id).cloned().unwrap_or_default())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, HostError> {
        if let Some(err) = self.failing_downloads.get(file_id) {
            return Err(err.clone());
        }
        self.bytes.get(file_id).cloned().ok_or_else(|| HostError::Rejected {
            operation: format!("GET files/{file_id}"),
            status: 404,
            body: "not found".into(),
        })
    }
}

/// Destination host keeping media objects and one page in memory.
pub struct FakeHost {
    pub objects: Mutex<Vec<RemoteObject>>,
    pub body: Mutex<String>,
    pub next_id: Mutex<u64>,
    pub searches: Mutex<Vec<String>>,
    pub creates: Mutex<Vec<String>>,
    pub listings: Mutex<u32>,
    pub document_writes: Mutex<u32>,
    pub search_error: Mutex<Option<HostError>>,
    pub list_error: Mutex<Option<HostError>>,
    pub create_errors: Mutex<Vec<HostError>>,
    pub update_document_error: Mutex<Option<HostError>>,
}

impl FakeHost {
    pub fn new(body: &str) -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            body: Mutex::new(body.to_string()),
            next_id: Mutex::new(100),
            searches: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
            listings: Mutex::new(0),
            document_writes: Mutex::new(0),
            search_error: Mutex::new(None),
            list_error: Mutex::new(None),
            create_errors: Mutex::new(Vec::new()),
            update_document_error: Mutex::new(None),
        }
    }

    /// Seed an existing object as if uploaded by someone earlier.
    pub fn with_object(self, id: &str, filename: &str, title: &str) -> Self {
        self.objects.lock().push(RemoteObject {
            id: id.into(),
            url: format!("{ENDPOINT}/uploads/{filename}"),
            title: title.into(),
        });
        self
    }

    pub fn body(&self) -> String {
        self.body.lock().clone()
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().len()
    }

    pub fn create_count(&self) -> usize {
        self.creates.lock().len()
    }
}

#[async_trait]
impl DestinationHost for FakeHost {
    fn endpoint(&self) -> &str {
        ENDPOINT
    }

    async fn list_objects(&self, page: u32, per_page: u32) -> Result<Vec<RemoteObject>, HostError> {
        *self.listings.lock() += 1;
        if let Some(err) = self.list_error.lock().clone() {
            return Err(err);
        }
        let objects = self.objects.lock();
        let start = ((page.saturating_sub(1)) * per_page) as usize;
        Ok(objects.iter().skip(start).take(per_page as usize).cloned().collect())
    }

    async fn search_objects(&self, query: &str, per_page: u32) -> Result<Vec<RemoteObject>, HostError> {
        self.searches.lock().push(query.to_string());
        if let Some(err) = self.search_error.lock().clone() {
            return Err(err);
        }
        let needle = query.to_lowercase();
        Ok(self
            .objects
            .lock()
            .iter()
            .filter(|o| o.title.to_lowercase().contains(&needle) || o.url.to_lowercase().contains(&needle))
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn create_object(
        &self,
        _bytes: &[u8],
        filename: &str,
        metadata: &ObjectMetadata,
    ) -> Result<MediaIdentity, HostError> {
        self.creates.lock().push(filename.to_string());
        {
            let mut errors = self.create_errors.lock();
            if !errors.is_empty() {
                return Err(errors.remove(0));
            }
        }
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        let object = RemoteObject {
            id: id.to_string(),
            url: format!("{ENDPOINT}/uploads/{filename}"),
            title: metadata.title.clone().unwrap_or_default(),
        };
        let identity = object.identity();
        self.objects.lock().push(object);
        Ok(identity)
    }

    async fn update_object_metadata(&self, _id: &str, _metadata: &ObjectMetadata) -> Result<(), HostError> {
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Document, HostError> {
        Ok(Document {
            id: id.into(),
            body: self.body(),
        })
    }

    async fn update_document(&self, _id: &str, body: &str) -> Result<(), HostError> {
        if let Some(err) = self.update_document_error.lock().clone() {
            return Err(err);
        }
        *self.document_writes.lock() += 1;
        *self.body.lock() = body.to_string();
        Ok(())
    }
}
