//! Common types shared across the simsync crates.
//!
//! This crate provides the error taxonomy and the foundational value types
//! (remote paths, secret strings) used by the transfer and pipeline layers.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{RemotePath, Secret};
