//! Pipeline stages wrapping the transfer layer: archive, download, upload.
//!
//! Each stage is single-attempt and surfaces a typed error; the CLI layer
//! translates the outcome to an exit code.

pub mod archive;
pub mod audit;
pub mod download;
pub mod upload;

pub use archive::{create_archive, verify_archive, ARCHIVE_NAME};
pub use audit::AuditLog;
pub use download::{DownloadReport, Downloader, FileOutcome, Outcome};
pub use upload::Uploader;
