//! simsync CLI - artifact transfer stages for the simulation CI pipeline.
//!
//! Each subcommand maps to one CI stage: `download` pulls the solver input
//! files from the remote mailbox folder, `archive` packages the solver output
//! directory, and `upload` pushes the archive back. Every stage prints a
//! final success or failure marker and exits 0/1 so the CI orchestrator can
//! locate a failing stage without opening transfer internals.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use simsync_common::RemotePath;
use simsync_pipeline::{create_archive, verify_archive, Downloader, Uploader, ARCHIVE_NAME};
use simsync_transfer::{CredentialProvider, Credentials, DropboxClient};

/// Remote mailbox folder shared by both transfer directions.
const DEFAULT_REMOTE_FOLDER: &str = "/engineering_simulations_pipeline";

#[derive(Parser)]
#[command(name = "simsync")]
#[command(about = "Simulation artifact sync between CI runs and cloud storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Credentials are read from the environment and treated as secrets;
/// they are never echoed to logs.
#[derive(Args)]
struct CredentialArgs {
    /// Storage app key.
    #[arg(long, env = "APP_KEY", hide_env_values = true, default_value = "")]
    app_key: String,

    /// Storage app secret.
    #[arg(long, env = "APP_SECRET", hide_env_values = true, default_value = "")]
    app_secret: String,

    /// Long-lived OAuth2 refresh token.
    #[arg(long, env = "REFRESH_TOKEN", hide_env_values = true, default_value = "")]
    refresh_token: String,
}

impl CredentialArgs {
    /// Validate into a credential object; missing values are a
    /// configuration error, reported before any network call.
    fn into_credentials(self) -> simsync_common::Result<Credentials> {
        Credentials::new(self.app_key, self.app_secret, self.refresh_token)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Pull every file from the remote folder before the compute stage.
    Download {
        /// Remote folder to pull from.
        #[arg(long, default_value = DEFAULT_REMOTE_FOLDER)]
        remote_folder: String,

        /// Local destination folder.
        #[arg(long, default_value = "data/testing-input-output")]
        local_dir: PathBuf,

        /// Audit log path; recreated on every run.
        #[arg(long, default_value = "download_log.txt")]
        log_path: PathBuf,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Package the solver output directory into the fixed-name archive.
    Archive {
        /// Directory holding the solver's output files.
        #[arg(long, default_value = "data/testing-input-output/navier_stokes_output")]
        source_dir: PathBuf,

        /// Destination archive path.
        #[arg(long, default_value = ARCHIVE_NAME)]
        dest: PathBuf,
    },

    /// Push the output archive to the remote folder after the compute stage.
    Upload {
        /// Archive file produced by the archive stage.
        #[arg(long, default_value = ARCHIVE_NAME)]
        archive: PathBuf,

        /// Remote folder to push into.
        #[arg(long, default_value = DEFAULT_REMOTE_FOLDER)]
        remote_folder: String,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
}

#[tokio::main]
async fn main() {
    // Typed errors internally; exit-code translation happens only here.
    if let Err(err) = run().await {
        eprintln!("Stage failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Download {
            remote_folder,
            local_dir,
            log_path,
            credentials,
        } => cmd_download(&remote_folder, &local_dir, &log_path, credentials).await,

        Commands::Archive { source_dir, dest } => cmd_archive(&source_dir, &dest),

        Commands::Upload {
            archive,
            remote_folder,
            credentials,
        } => cmd_upload(&archive, &remote_folder, credentials).await,
    }
}

/// Obtain an access token and open a transfer session.
async fn connect(credentials: CredentialArgs) -> Result<DropboxClient> {
    let credentials = credentials
        .into_credentials()
        .context("Credential configuration")?;

    info!("Requesting access token");
    let provider = CredentialProvider::new()?;
    let token = provider.obtain_access_token(&credentials).await?;

    Ok(DropboxClient::new(token)?)
}

/// Pull the remote folder's files into the local destination.
async fn cmd_download(
    remote_folder: &str,
    local_dir: &Path,
    log_path: &Path,
    credentials: CredentialArgs,
) -> Result<()> {
    let folder = RemotePath::parse(remote_folder).context("Invalid remote folder")?;
    let client = connect(credentials).await?;

    let downloader = Downloader::new(
        &client,
        folder,
        local_dir.to_path_buf(),
        log_path.to_path_buf(),
    );
    let report = downloader.run().await?;

    println!(
        "Download stage succeeded: {} of {} file(s) retrieved into {} (audit log: {})",
        report.retrieved(),
        report.outcomes.len(),
        local_dir.display(),
        log_path.display()
    );

    Ok(())
}

/// Package the output directory and verify the result.
fn cmd_archive(source_dir: &Path, dest: &Path) -> Result<()> {
    info!(
        "Archiving {} into {}",
        source_dir.display(),
        dest.display()
    );

    create_archive(source_dir, dest)?;
    let size = verify_archive(dest)?;

    println!(
        "Archive stage succeeded: {} ({} bytes)",
        dest.display(),
        size
    );

    Ok(())
}

/// Upload the archive to the remote folder.
async fn cmd_upload(archive: &Path, remote_folder: &str, credentials: CredentialArgs) -> Result<()> {
    // Archive check comes first: a skipped or failed archival step must
    // fail fast before any network traffic.
    verify_archive(archive)?;

    let folder = RemotePath::parse(remote_folder).context("Invalid remote folder")?;
    let client = connect(credentials).await?;

    let uploader = Uploader::new(&client, folder);
    let entry = uploader.run(archive).await?;

    println!(
        "Upload stage succeeded: {} ({} bytes)",
        entry.path, entry.size
    );

    Ok(())
}
