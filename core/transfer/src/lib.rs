//! Authenticated transfer layer for the artifact sync pipeline.
//!
//! Splits into three seams: credential handling (`auth`), the backend-neutral
//! `TransferClient` trait (`client`), and the Dropbox HTTP implementation
//! (`dropbox`).

pub mod auth;
pub mod client;
pub mod dropbox;

pub use auth::{AccessToken, CredentialProvider, Credentials};
pub use client::{RemoteEntry, TransferClient};
pub use dropbox::DropboxClient;
