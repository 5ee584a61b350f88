//! Transfer client trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use simsync_common::{RemotePath, Result};

/// Descriptor for a file stored under the remote folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// File name (no folder prefix).
    pub name: String,
    /// Full remote path, usable for a subsequent download.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

/// Authenticated facade over the storage backend.
///
/// All operations are single-attempt: retry policy belongs to the caller,
/// and this pipeline performs none. Tests substitute a recording mock.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Upload one local file into `remote_folder`, overwriting any remote
    /// file of the same name.
    ///
    /// # Preconditions
    /// - `local_path` exists and is non-empty; a zero-byte upload is
    ///   rejected as a likely sign of a broken archival step
    ///
    /// # Postconditions
    /// - Returns the uploaded file's remote metadata
    ///
    /// # Errors
    /// - `Verification` on a missing or empty local file
    /// - `Transfer` on network, quota, or permission failure
    async fn upload(&self, local_path: &Path, remote_folder: &RemotePath) -> Result<RemoteEntry>;

    /// List the files directly under `remote_folder` (not recursive).
    ///
    /// An empty folder yields an empty sequence, not an error.
    async fn list(&self, remote_folder: &RemotePath) -> Result<Vec<RemoteEntry>>;

    /// Download the remote file's full bytes to `local_path`, creating
    /// parent directories as needed. Returns the number of bytes written.
    ///
    /// # Errors
    /// - `Transfer` on network failure or if the remote file disappeared
    ///   between `list` and `download`
    async fn download(&self, remote_file: &RemoteEntry, local_path: &Path) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_entry_serialization() {
        let entry = RemoteEntry {
            name: "fluid_simulation_input.json".to_string(),
            path: "/engineering_simulations_pipeline/fluid_simulation_input.json".to_string(),
            size: 2048,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: RemoteEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.name, entry.name);
        assert_eq!(deserialized.path, entry.path);
        assert_eq!(deserialized.size, entry.size);
    }
}
