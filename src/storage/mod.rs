//! Datastream storage collaborators.
//!
//! The engine only requires [`DatastreamStorage::save`] and
//! [`DatastreamStorage::fetch`]; everything about the on-disk layout is the
//! collaborator's business. [`FilesystemStorage`] is the bundled
//! implementation, writing one Parquet file per standardized dataset.

mod filesystem;

use std::path::PathBuf;

pub use filesystem::{read_dataset, write_dataset, FilesystemStorage};

use crate::dataset::Dataset;
use crate::error::DefinitionError;

/// Errors from a storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parquet encode/decode failed.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// An Arrow kernel failed while assembling columns.
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    /// Embedded metadata could not be serialized or parsed.
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The dataset has no time coordinate to derive a file timestamp from.
    #[error("dataset '{0}' has no time coordinate to derive a file timestamp from")]
    NoTimeCoordinate(String),

    /// The time coordinate holds no values.
    #[error("dataset '{0}' has an empty time coordinate")]
    EmptyTimeCoordinate(String),

    /// The datastream or file name violates the naming grammar.
    #[error(transparent)]
    Name(#[from] DefinitionError),

    /// The file on disk is not a readable dataset file.
    #[error("'{path}' is not a readable dataset file: {reason}")]
    InvalidFile {
        /// The offending path.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// A storage collaborator for standardized datasets.
pub trait DatastreamStorage {
    /// Persists a standardized dataset, returning where it was written.
    fn save(&self, dataset: &Dataset) -> Result<PathBuf, StorageError>;

    /// Lists the stored files belonging to a datastream, oldest first.
    fn fetch(&self, datastream_name: &str) -> Result<Vec<PathBuf>, StorageError>;
}
