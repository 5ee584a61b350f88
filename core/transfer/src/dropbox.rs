//! Dropbox HTTP API client.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use simsync_common::{Error, RemotePath, Result};

use crate::auth::AccessToken;
use crate::client::{RemoteEntry, TransferClient};

/// Dropbox RPC endpoint base.
const API_BASE: &str = "https://api.dropboxapi.com/2";
/// Dropbox content endpoint base (request bodies carry file payloads).
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

/// One entry from a folder listing.
#[derive(Debug, Clone, Deserialize)]
struct FolderEntry {
    #[serde(rename = ".tag")]
    tag: String,
    name: String,
    #[serde(default)]
    path_lower: Option<String>,
    #[serde(default)]
    path_display: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

/// Response from `files/list_folder` and its continuation endpoint.
#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<FolderEntry>,
    cursor: String,
    has_more: bool,
}

/// Response from `files/upload`.
#[derive(Debug, Deserialize)]
struct FileMetadataResponse {
    name: String,
    #[serde(default)]
    path_display: Option<String>,
    size: u64,
}

/// Dropbox transfer client.
///
/// Holds one access token for the lifetime of the session; the token is
/// discarded with the client (no explicit revocation).
pub struct DropboxClient {
    http: Client,
    token: AccessToken,
}

impl DropboxClient {
    /// Create a new client for one session.
    pub fn new(token: AccessToken) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("simsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transfer(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, token })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token.secret())
    }

    /// Map a non-success response to the error taxonomy.
    async fn fail_status(response: reqwest::Response, what: &str) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            Error::Authentication(format!("{}: invalid or expired access token", what))
        } else {
            Error::Transfer(format!("{}: {} - {}", what, status, body))
        }
    }
}

#[async_trait]
impl TransferClient for DropboxClient {
    async fn upload(&self, local_path: &Path, remote_folder: &RemotePath) -> Result<RemoteEntry> {
        let meta = tokio::fs::metadata(local_path).await.map_err(|_| {
            Error::Verification(format!("Local file not found: {}", local_path.display()))
        })?;
        if meta.len() == 0 {
            return Err(Error::Verification(format!(
                "Refusing to upload empty file: {}",
                local_path.display()
            )));
        }

        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Local path has no usable file name: {}",
                    local_path.display()
                ))
            })?
            .to_string();
        let remote_path = format!("{}/{}", remote_folder.to_api_path(), name);

        let data = tokio::fs::read(local_path).await?;

        let arg = serde_json::json!({
            "path": remote_path,
            "mode": "overwrite",
            "mute": true,
        })
        .to_string();

        let response = self
            .http
            .post(format!("{}/files/upload", CONTENT_BASE))
            .header(header::AUTHORIZATION, self.auth_header())
            .header("Dropbox-API-Arg", arg)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| Error::Transfer(format!("Failed to upload {}: {}", name, e)))?;

        if !response.status().is_success() {
            return Err(Self::fail_status(response, "Upload failed").await);
        }

        let uploaded: FileMetadataResponse = response
            .json()
            .await
            .map_err(|e| Error::Transfer(format!("Failed to parse upload response: {}", e)))?;

        debug!(file = %uploaded.name, bytes = uploaded.size, "uploaded");

        Ok(RemoteEntry {
            path: uploaded.path_display.unwrap_or(remote_path),
            name: uploaded.name,
            size: uploaded.size,
        })
    }

    async fn list(&self, remote_folder: &RemotePath) -> Result<Vec<RemoteEntry>> {
        let mut files = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let (url, body) = match &cursor {
                Some(c) => (
                    format!("{}/files/list_folder/continue", API_BASE),
                    serde_json::json!({ "cursor": c }),
                ),
                None => (
                    format!("{}/files/list_folder", API_BASE),
                    serde_json::json!({
                        "path": remote_folder.to_api_path(),
                        "recursive": false,
                    }),
                ),
            };

            let response = self
                .http
                .post(&url)
                .header(header::AUTHORIZATION, self.auth_header())
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Transfer(format!("Failed to list {}: {}", remote_folder, e)))?;

            if !response.status().is_success() {
                return Err(Self::fail_status(response, "List folder failed").await);
            }

            let page: ListFolderResponse = response
                .json()
                .await
                .map_err(|e| Error::Transfer(format!("Failed to parse list response: {}", e)))?;

            for entry in page.entries {
                // Folders and deleted markers carry a different tag
                if entry.tag != "file" {
                    continue;
                }
                let path = entry
                    .path_lower
                    .or(entry.path_display)
                    .unwrap_or_else(|| format!("{}/{}", remote_folder.to_api_path(), entry.name));
                files.push(RemoteEntry {
                    name: entry.name,
                    path,
                    size: entry.size.unwrap_or(0),
                });
            }

            if page.has_more {
                cursor = Some(page.cursor);
            } else {
                break;
            }
        }

        Ok(files)
    }

    async fn download(&self, remote_file: &RemoteEntry, local_path: &Path) -> Result<u64> {
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let arg = serde_json::json!({ "path": remote_file.path }).to_string();

        let response = self
            .http
            .post(format!("{}/files/download", CONTENT_BASE))
            .header(header::AUTHORIZATION, self.auth_header())
            .header("Dropbox-API-Arg", arg)
            .send()
            .await
            .map_err(|e| Error::Transfer(format!("Failed to download {}: {}", remote_file.name, e)))?;

        if !response.status().is_success() {
            return Err(Self::fail_status(response, "Download failed").await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transfer(format!("Failed to read download body: {}", e)))?;

        tokio::fs::write(local_path, &bytes).await?;

        debug!(file = %remote_file.name, bytes = bytes.len(), "downloaded");

        Ok(bytes.len() as u64)
    }
}
