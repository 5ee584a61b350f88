//! Per-run audit log of transfer outcomes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use simsync_common::Result;

/// Append-only plain-text record of per-file download outcomes.
///
/// One line per file, human-readable, not machine-parsed by the pipeline.
/// Created fresh (truncated) for every downloader run. Lines are flushed as
/// they are written so the log stays faithful if the process dies mid-run.
pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl AuditLog {
    /// Create the log file, truncating any previous run's log.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = BufWriter::new(File::create(path)?);
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    /// Record one successful transfer.
    pub fn record_success(&mut self, name: &str, local_path: &Path) -> Result<()> {
        writeln!(self.writer, "Downloaded {} to {}", name, local_path.display())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Record one failed transfer with its reason.
    pub fn record_failure(&mut self, name: &str, reason: &str) -> Result<()> {
        writeln!(self.writer, "Failed to download {}: {}", name, reason)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
