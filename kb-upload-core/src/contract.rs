//! # contract: the two remote operations and the data they exchange
//!
//! [`KnowledgeApi`] is the seam between the pipeline and the knowledge-base
//! service. The production implementation lives in the `kb-upload` crate;
//! tests drive the pipeline through the generated `MockKnowledgeApi`.
//!
//! Implementations report every HTTP status as an [`ApiResponse`]. Only
//! failures that produced no response at all (transport, unreadable file)
//! are returned as [`ApiError`]. Deciding what a status means is left to the
//! retry loops in [`crate::uploader`] and [`crate::associate`].

use std::path::Path;

use async_trait::async_trait;
use mockall::automock;
use serde::Deserialize;
use tracing::error;

use crate::error::ApiError;

/// Marker the service puts in the body when a file is already part of the knowledge base.
pub const DUPLICATE_CONTENT_MARKER: &str = "Duplicate content detected";

/// Raw outcome of one request: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        ApiResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_client_or_server_error(&self) -> bool {
        self.status >= 400
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    #[serde(default)]
    id: Option<String>,
}

/// Final response of the upload phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub status: u16,
    pub body: String,
    /// Identifier assigned by the service. Only set when the status is 200 or
    /// at least 400 and the body decodes to an object with a string `id`.
    pub file_id: Option<String>,
}

impl UploadResult {
    pub fn from_response(response: ApiResponse) -> Self {
        let eligible = response.status == 200 || response.status >= 400;
        let file_id = if eligible {
            match serde_json::from_str::<UploadedFile>(&response.body) {
                Ok(parsed) => parsed.id.filter(|id| !id.is_empty()),
                Err(e) => {
                    error!(status = response.status, error = %e, "Could not decode upload response body");
                    None
                }
            }
        } else {
            None
        };
        UploadResult {
            status: response.status,
            body: response.body,
            file_id,
        }
    }

    /// The service accepted the file and handed back an identifier to associate.
    pub fn accepted_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }
}

/// Final response of the association phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationResult {
    pub status: u16,
    pub body: String,
}

impl AssociationResult {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_duplicate(&self) -> bool {
        self.body.contains(DUPLICATE_CONTENT_MARKER)
    }
}

impl From<ApiResponse> for AssociationResult {
    fn from(response: ApiResponse) -> Self {
        AssociationResult {
            status: response.status,
            body: response.body,
        }
    }
}

/// Remote operations against a single knowledge base.
///
/// The implementor is bound to one service and one knowledge base at
/// construction time, and owns authentication.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    /// Upload the raw bytes of `path`. The file is read anew on every call.
    async fn upload_file(&self, path: &Path) -> Result<ApiResponse, ApiError>;

    /// Link an already uploaded file to the knowledge base.
    async fn add_file_to_knowledge(&self, file_id: &str) -> Result<ApiResponse, ApiError>;
}
