//! # HTTP client for the knowledge-base service
//!
//! [`KnowledgeClient`] implements [`KnowledgeApi`] over reqwest against one
//! service instance and one knowledge base:
//!
//! - upload: `POST {base_url}/api/v1/files/` as multipart, field `file`
//! - associate: `POST {base_url}/api/v1/knowledge/{knowledge_base}/file/add`
//!   with `{"file_id": ...}`
//!
//! Both requests carry `Authorization: Bearer <token>`. Every HTTP status is
//! handed back as an [`ApiResponse`]; retry decisions are made by the core
//! crate.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use kb_upload_core::contract::{ApiResponse, KnowledgeApi};
use kb_upload_core::error::ApiError;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Serialize;

pub struct KnowledgeClient {
    http: reqwest::Client,
    base_url: Url,
    knowledge_base: String,
    auth_token: String,
}

#[derive(Serialize)]
struct AddFileRequest<'a> {
    file_id: &'a str,
}

impl KnowledgeClient {
    /// `base_url` may carry a path prefix; trailing slashes are ignored.
    pub fn new(
        base_url: &str,
        knowledge_base: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid base URL {base_url:?}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Base URL {base_url} cannot carry a path");
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("kb-upload/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let client = KnowledgeClient {
            http,
            base_url,
            knowledge_base: knowledge_base.into(),
            auth_token: auth_token.into(),
        };
        tracing::info!(
            base_url = %client.base_url,
            knowledge_base = %client.knowledge_base,
            auth_token_set = !client.auth_token.is_empty(),
            "Initialized KnowledgeClient"
        );
        Ok(client)
    }

    /// Appends percent-encoded `segments` to the base URL's path.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`, so the path is always mutable.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn files_url(&self) -> Url {
        self.endpoint(&["api", "v1", "files", ""])
    }

    pub fn add_file_url(&self) -> Url {
        self.endpoint(&["api", "v1", "knowledge", self.knowledge_base.as_str(), "file", "add"])
    }
}

async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse, ApiError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(ApiResponse { status, body })
}

#[async_trait]
impl KnowledgeApi for KnowledgeClient {
    async fn upload_file(&self, path: &Path) -> Result<ApiResponse, ApiError> {
        let content = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::debug!(file = %path.display(), size = content.len(), "Sending file");

        let form = Form::new().part("file", Part::bytes(content).file_name(file_name));
        let response = self
            .http
            .post(self.files_url())
            .bearer_auth(&self.auth_token)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;
        into_api_response(response).await
    }

    async fn add_file_to_knowledge(&self, file_id: &str) -> Result<ApiResponse, ApiError> {
        let response = self
            .http
            .post(self.add_file_url())
            .bearer_auth(&self.auth_token)
            .json(&AddFileRequest { file_id })
            .send()
            .await?;
        into_api_response(response).await
    }
}
