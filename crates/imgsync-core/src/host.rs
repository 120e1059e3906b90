//! # Collaborator Interfaces
//!
//! The file store that images are read from and the CMS host they are
//! written to. Both are traits so the engine can be driven by HTTP clients
//! in production and by in-memory fakes in tests.
//!
//! Implementations do not retry. Every failure is reported as a
//! [`HostError`] and classified by [`HostError::class`]; the retry
//! decision belongs to [`crate::retry::TransferPolicy`].

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Document, MediaIdentity, ObjectMetadata, RemoteObject, SourceFile, SourceFolder};

/// Failure reported by a collaborator call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// 401/403: credentials missing, wrong, or insufficient.
    #[error("{operation} was not authorized (HTTP {status})")]
    Unauthorized { operation: String, status: u16 },

    /// 429.
    #[error("{operation} was rate limited")]
    RateLimited { operation: String },

    /// 502/503/504.
    #[error("{operation} unavailable (HTTP {status})")]
    Unavailable { operation: String, status: u16 },

    /// No response at all (connect failure, timeout, reset).
    #[error("{operation} got no response: {detail}")]
    Network { operation: String, detail: String },

    /// Any other non-success status.
    #[error("{operation} returned HTTP {status}: {body}")]
    Rejected {
        operation: String,
        status: u16,
        body: String,
    },

    /// The response arrived but could not be decoded.
    #[error("{operation} returned a malformed response: {detail}")]
    Malformed { operation: String, detail: String },
}

/// How a failure affects the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Abort the run immediately.
    Authentication,
    /// Try again after the scheduled delay.
    Retryable,
    /// Give up on this call without retrying.
    Fatal,
}

impl HostError {
    pub fn class(&self) -> FailureClass {
        match self {
            HostError::Unauthorized { .. } => FailureClass::Authentication,
            HostError::RateLimited { .. }
            | HostError::Unavailable { .. }
            | HostError::Network { .. } => FailureClass::Retryable,
            HostError::Rejected { .. } | HostError::Malformed { .. } => FailureClass::Fatal,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.class() == FailureClass::Authentication
    }

    /// Map a non-success HTTP status to an error for the given operation.
    pub fn from_status(operation: &str, status: u16, body: String) -> Self {
        let operation = operation.to_string();
        match status {
            401 | 403 => HostError::Unauthorized { operation, status },
            429 => HostError::RateLimited { operation },
            502..=504 => HostError::Unavailable { operation, status },
            _ => HostError::Rejected {
                operation,
                status,
                body,
            },
        }
    }
}

/// Read side: the store whose sub-folders become page sections.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Direct sub-folders of `parent_id`, alphabetical by name.
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<SourceFolder>, HostError>;

    /// Image files (image mime-types only) directly inside `folder_id`.
    async fn list_images(&self, folder_id: &str) -> Result<Vec<SourceFile>, HostError>;

    /// Raw bytes of a file.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>, HostError>;
}

/// Write side: the CMS that stores media objects and the target page.
#[async_trait]
pub trait DestinationHost: Send + Sync {
    /// Endpoint identifier. Used as the identity cache scope.
    fn endpoint(&self) -> &str;

    /// One page of the full media listing. An empty page ends the listing.
    async fn list_objects(&self, page: u32, per_page: u32) -> Result<Vec<RemoteObject>, HostError>;

    /// Free-text media search.
    async fn search_objects(&self, query: &str, per_page: u32) -> Result<Vec<RemoteObject>, HostError>;

    /// Upload a new media object.
    async fn create_object(
        &self,
        bytes: &[u8],
        filename: &str,
        metadata: &ObjectMetadata,
    ) -> Result<MediaIdentity, HostError>;

    /// Attach descriptive fields to an existing object.
    async fn update_object_metadata(&self, id: &str, metadata: &ObjectMetadata) -> Result<(), HostError>;

    async fn get_document(&self, id: &str) -> Result<Document, HostError>;

    async fn update_document(&self, id: &str, body: &str) -> Result<(), HostError>;
}
