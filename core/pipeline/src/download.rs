//! Bulk download of the remote mailbox folder.

use std::path::PathBuf;

use tracing::{info, warn};

use simsync_common::{Error, RemotePath, Result};
use simsync_transfer::TransferClient;

use crate::audit::AuditLog;

/// Outcome of one file's transfer.
#[derive(Debug)]
pub enum Outcome {
    /// File landed at the given local path.
    Retrieved(PathBuf),
    /// Transfer failed; the reason is recorded in the audit log too.
    Failed(String),
}

/// One listed file paired with its transfer outcome.
#[derive(Debug)]
pub struct FileOutcome {
    pub name: String,
    pub outcome: Outcome,
}

/// Aggregated result of one downloader run, in listing order.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub outcomes: Vec<FileOutcome>,
}

impl DownloadReport {
    /// Number of files that landed locally.
    pub fn retrieved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Retrieved(_)))
            .count()
    }

    /// Number of files whose transfer failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.retrieved()
    }
}

/// Pulls every file from one remote folder into one local folder.
///
/// Best-effort per file: a single failed transfer does not halt the loop,
/// and the overall verdict derives from the aggregate. The run fails only
/// if the destination folder is empty afterwards.
pub struct Downloader<'a> {
    client: &'a dyn TransferClient,
    remote_folder: RemotePath,
    local_dir: PathBuf,
    log_path: PathBuf,
}

impl<'a> Downloader<'a> {
    /// Create a downloader over an already-authenticated client.
    pub fn new(
        client: &'a dyn TransferClient,
        remote_folder: RemotePath,
        local_dir: PathBuf,
        log_path: PathBuf,
    ) -> Self {
        Self {
            client,
            remote_folder,
            local_dir,
            log_path,
        }
    }

    /// Run the download: list, transfer each file in listing order, verify.
    ///
    /// # Postconditions
    /// - The audit log holds one line per listed file, success or failure
    ///
    /// # Errors
    /// - `Transfer` if the listing itself fails
    /// - `Verification` if the destination folder is empty after the loop
    ///   (an empty listing is deferred to this point so the log still
    ///   records that zero files were seen)
    pub async fn run(&self) -> Result<DownloadReport> {
        tokio::fs::create_dir_all(&self.local_dir).await?;
        let mut log = AuditLog::create(&self.log_path)?;

        let entries = self.client.list(&self.remote_folder).await?;
        info!(
            folder = %self.remote_folder,
            files = entries.len(),
            "listed remote folder"
        );

        let mut report = DownloadReport::default();
        for entry in &entries {
            let local_path = self.local_dir.join(&entry.name);
            let outcome = match self.client.download(entry, &local_path).await {
                Ok(bytes) => {
                    info!(file = %entry.name, bytes, "retrieved");
                    log.record_success(&entry.name, &local_path)?;
                    Outcome::Retrieved(local_path)
                }
                Err(err) => {
                    warn!(file = %entry.name, error = %err, "transfer failed");
                    let reason = err.to_string();
                    log.record_failure(&entry.name, &reason)?;
                    Outcome::Failed(reason)
                }
            };
            report.outcomes.push(FileOutcome {
                name: entry.name.clone(),
                outcome,
            });
        }

        self.verify()?;
        Ok(report)
    }

    /// Terminal check: the destination must hold at least one entry.
    fn verify(&self) -> Result<()> {
        let mut dir = std::fs::read_dir(&self.local_dir)?;
        if dir.next().is_none() {
            return Err(Error::Verification(format!(
                "No files retrieved from {} into {}",
                self.remote_folder,
                self.local_dir.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use simsync_transfer::RemoteEntry;
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;

    /// Recording mock: serves a fixed listing, fails named downloads.
    struct MockClient {
        entries: Vec<RemoteEntry>,
        fail: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockClient {
        fn with_files(names: &[&str]) -> Self {
            let entries = names
                .iter()
                .map(|name| RemoteEntry {
                    name: name.to_string(),
                    path: format!("/p/{}", name),
                    size: 7,
                })
                .collect();
            Self {
                entries,
                fail: HashSet::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, names: &[&str]) -> Self {
            self.fail = names.iter().map(|s| s.to_string()).collect();
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TransferClient for MockClient {
        async fn upload(
            &self,
            local_path: &Path,
            remote_folder: &RemotePath,
        ) -> simsync_common::Result<RemoteEntry> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upload {}", local_path.display()));
            let name = local_path.file_name().unwrap().to_string_lossy().to_string();
            let size = fs::metadata(local_path)?.len();
            Ok(RemoteEntry {
                path: format!("{}/{}", remote_folder.to_api_path(), name),
                name,
                size,
            })
        }

        async fn list(
            &self,
            _remote_folder: &RemotePath,
        ) -> simsync_common::Result<Vec<RemoteEntry>> {
            self.calls.lock().unwrap().push("list".to_string());
            Ok(self.entries.clone())
        }

        async fn download(
            &self,
            remote_file: &RemoteEntry,
            local_path: &Path,
        ) -> simsync_common::Result<u64> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("download {}", remote_file.name));
            if self.fail.contains(&remote_file.name) {
                return Err(Error::Transfer("simulated network failure".to_string()));
            }
            fs::write(local_path, b"payload")?;
            Ok(7)
        }
    }

    fn log_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_download_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out");
        let log = dir.path().join("download_log.txt");
        let client = MockClient::with_files(&["a.json", "b.json"]);

        let downloader = Downloader::new(
            &client,
            RemotePath::parse("/p").unwrap(),
            local.clone(),
            log.clone(),
        );
        let report = downloader.run().await.unwrap();

        assert_eq!(report.retrieved(), 2);
        assert_eq!(report.failed(), 0);
        assert!(local.join("a.json").exists());
        assert!(local.join("b.json").exists());

        let lines = log_lines(&log);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.starts_with("Downloaded ")));
    }

    #[tokio::test]
    async fn test_download_partial_failure_continues() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out");
        let log = dir.path().join("download_log.txt");
        let client = MockClient::with_files(&["a.json", "b.json", "c.json"]).failing(&["b.json"]);

        let downloader = Downloader::new(
            &client,
            RemotePath::parse("/p").unwrap(),
            local.clone(),
            log.clone(),
        );
        let report = downloader.run().await.unwrap();

        assert_eq!(report.retrieved(), 2);
        assert_eq!(report.failed(), 1);
        assert!(local.join("a.json").exists());
        assert!(!local.join("b.json").exists());
        assert!(local.join("c.json").exists());

        // All three outcomes are logged, in listing order
        let lines = log_lines(&log);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Failed to download b.json"));
    }

    #[tokio::test]
    async fn test_download_empty_folder_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out");
        let log = dir.path().join("download_log.txt");
        let client = MockClient::with_files(&[]);

        let downloader = Downloader::new(
            &client,
            RemotePath::parse("/p").unwrap(),
            local.clone(),
            log.clone(),
        );
        let err = downloader.run().await.unwrap_err();

        assert!(matches!(err, Error::Verification(_)));
        // The destination stays empty and the log still records the run
        assert_eq!(fs::read_dir(&local).unwrap().count(), 0);
        assert!(log.exists());
        assert_eq!(log_lines(&log).len(), 0);
    }

    #[tokio::test]
    async fn test_download_all_transfers_failing_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out");
        let log = dir.path().join("download_log.txt");
        let client = MockClient::with_files(&["a.json"]).failing(&["a.json"]);

        let downloader = Downloader::new(
            &client,
            RemotePath::parse("/p").unwrap(),
            local,
            log.clone(),
        );
        let err = downloader.run().await.unwrap_err();

        assert!(matches!(err, Error::Verification(_)));
        assert_eq!(log_lines(&log).len(), 1);
        assert_eq!(client.calls(), vec!["list", "download a.json"]);
    }
}
