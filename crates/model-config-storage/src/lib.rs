//! Key-Value Store Backends
//!
//! The reconciler persists one encrypted record at a fixed key in a store
//! shared with the rest of the system. This crate defines the
//! [`KeyValueStore`] capability and ships three backends:
//!
//! - [`MemoryStore`]: process-local map, used by tests and dry runs
//! - [`FileStore`]: one file per key in a directory, atomic replace on write
//! - [`SledStore`]: embedded `sled` database
//!
//! Every `set` is a whole-value replacement. Backends never expose partial
//! writes: a failed `set` leaves the previous value readable.

mod file;
mod memory;
mod sled_store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sled_store::SledStore;

use std::fmt;
use thiserror::Error;

/// Errors that can occur when talking to a store
#[derive(Error, Debug)]
pub enum StorageError {
    /// The key is not usable by this backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// I/O error (file-based backends)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedded database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Stored bytes are not valid UTF-8
    #[error("Corrupt value at {key}: {message}")]
    Corrupt { key: String, message: String },

    /// Lock poisoning or other backend failure
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Minimal shared key-value store
///
/// Values are opaque strings. Implementations must make `set` atomic with
/// respect to readers: a reader observes either the old or the new value.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Read the value at `key`, `None` when absent
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value at `key`
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}
