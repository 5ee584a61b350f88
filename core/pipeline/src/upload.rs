//! Archive upload to the remote mailbox folder.

use std::path::Path;

use tracing::info;

use simsync_common::{RemotePath, Result};
use simsync_transfer::{RemoteEntry, TransferClient};

use crate::archive::verify_archive;

/// Pushes one archive to the fixed remote folder.
///
/// Linear sequence, every step fatal: verify the archive exists and is
/// non-empty, then upload. No partial-success path.
pub struct Uploader<'a> {
    client: &'a dyn TransferClient,
    remote_folder: RemotePath,
}

impl<'a> Uploader<'a> {
    /// Create an uploader over an already-authenticated client.
    pub fn new(client: &'a dyn TransferClient, remote_folder: RemotePath) -> Self {
        Self {
            client,
            remote_folder,
        }
    }

    /// Verify and upload the archive, returning its remote metadata.
    ///
    /// # Errors
    /// - `Verification` if the archive is missing or empty; reported before
    ///   any transfer call so a skipped archival step fails fast
    /// - `Transfer` if the upload itself fails; fatal to the run
    pub async fn run(&self, archive_path: &Path) -> Result<RemoteEntry> {
        verify_archive(archive_path)?;

        let entry = self.client.upload(archive_path, &self.remote_folder).await?;

        info!(remote = %entry.path, bytes = entry.size, "archive uploaded");

        Ok(entry)
    }
}
