//! Contains the `StorageBackend` trait the engine reads and writes files
//! through, the `DataBlock` unit that flows over the data channel, and the
//! storage error taxonomy with its RFC 959 reply mapping.

pub mod mem;

use async_trait::async_trait;
use bytes::Bytes;
use derive_more::Display;
use std::{fmt::Debug, path::Path, result};
use thiserror::Error;

/// The error returned by [`StorageBackend`] and [`FtpFile`] operations.
#[derive(Debug, Error)]
#[error("storage error: {kind}")]
pub struct Error {
    kind: ErrorKind,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error of the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Error { kind, source: None }
    }

    /// Creates a new error of the given kind wrapping an underlying cause.
    pub fn with_source<E>(kind: ErrorKind, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Tells what went wrong, and thereby which reply the engine sends.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::new(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::with_source(ErrorKind::LocalError, err)
    }
}

/// The `ErrorKind` variants that [`StorageBackend`] implementations can
/// produce. Each one names the RFC 959 reply it renders as.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ErrorKind {
    /// 450 Requested file action not taken.
    ///     File unavailable (e.g., file busy).
    #[display("450 Transient file not available")]
    TransientFileNotAvailable,
    /// 550 Requested action not taken.
    ///     File unavailable (e.g., file not found, no access).
    #[display("550 Permanent file not available")]
    PermanentFileNotAvailable,
    /// 550 Requested action not taken. Permission denied.
    #[display("550 Permission denied")]
    PermissionDenied,
    /// 451 Requested action aborted. Local error in processing.
    #[display("451 Local error")]
    LocalError,
    /// 551 Requested action aborted. Page type unknown.
    #[display("551 Page type unknown")]
    PageTypeUnknown,
    /// 452 Requested action not taken.
    ///     Insufficient storage space in system.
    #[display("452 Insufficient storage space")]
    InsufficientStorageSpaceError,
    /// 552 Requested file action aborted.
    ///     Exceeded storage allocation.
    #[display("552 Exceeded storage allocation")]
    ExceededStorageAllocationError,
    /// 553 Requested action not taken.
    ///     File name not allowed.
    #[display("553 File name not allowed")]
    FileNameNotAllowedError,
}

/// The Result type used by the storage interfaces.
pub type Result<T> = result::Result<T, Error>;

/// A chunk of bytes travelling over the data channel, carrying the RFC 959
/// block-descriptor flags. The final block of every transfer has `eof` set;
/// an empty block with `eof` set is a legal terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// The payload bytes.
    pub data: Bytes,
    /// This block ends the transfer.
    pub eof: bool,
    /// This block ends a record (RECORD structure).
    pub eor: bool,
    /// This block is a restart marker.
    pub restart: bool,
    /// The sender suspects errors in this block.
    pub suspect: bool,
}

impl DataBlock {
    /// A plain data block without any flags set.
    pub fn new(data: Bytes) -> Self {
        DataBlock {
            data,
            eof: false,
            eor: false,
            restart: false,
            suspect: false,
        }
    }

    /// A block carrying the final bytes of a transfer.
    pub fn last(data: Bytes) -> Self {
        DataBlock { eof: true, ..DataBlock::new(data) }
    }

    /// The zero-length terminator block.
    pub fn terminator() -> Self {
        DataBlock::last(Bytes::new())
    }

    /// The number of payload bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Tells whether the block carries no payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// How `open_write` should treat existing content at the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate and replace (STOR).
    Replace,
    /// Append to the end (APPE).
    Append,
}

/// Metadata about a stored path.
pub trait Metadata {
    /// Returns the length (size) of the file.
    fn len(&self) -> u64;

    /// Returns `self.len() == 0`.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the path is a directory.
    fn is_dir(&self) -> bool;

    /// Returns true if the path is a file.
    fn is_file(&self) -> bool;
}

/// An open file on the backend, producing or consuming [`DataBlock`]s.
#[async_trait]
pub trait FtpFile: Send + Debug {
    /// Reads the next block of at most `max_len` payload bytes. The block
    /// that carries the last bytes of the file has `eof` set; calling again
    /// after that returns the zero-length terminator.
    async fn read_block(&mut self, max_len: usize) -> Result<DataBlock>;

    /// Writes one block. Returns the number of payload bytes consumed.
    async fn write_block(&mut self, block: DataBlock) -> Result<u64>;

    /// Flushes and commits. Must be called to make written data visible.
    async fn close(&mut self) -> Result<()>;
}

/// The filesystem collaborator of the engine.
///
/// All paths handed to a backend are absolute virtual paths; resolving the
/// session's working directory against a command argument happens in the
/// command handlers.
#[async_trait]
pub trait StorageBackend<User>: Send + Sync + Debug + 'static {
    /// The file type produced by `open_read` / `open_write`.
    type File: FtpFile + 'static;
    /// The metadata type returned by `metadata`.
    type Metadata: Metadata + Send + Sync;

    /// Returns metadata for the given path.
    async fn metadata(&self, user: &Option<User>, path: &Path) -> Result<Self::Metadata>;

    /// Opens a file for reading, positioned at `offset` (restart marker).
    async fn open_read(&self, user: &Option<User>, path: &Path, offset: u64) -> Result<Self::File>;

    /// Opens a file for writing, positioned at `offset` (restart marker).
    async fn open_write(&self, user: &Option<User>, path: &Path, offset: u64, mode: WriteMode) -> Result<Self::File>;

    /// Produces the human-oriented directory listing (LIST), one line per
    /// entry, without line terminators.
    async fn list(&self, user: &Option<User>, path: &Path) -> Result<Vec<String>>;

    /// Produces the bare name listing (NLST).
    async fn list_names(&self, user: &Option<User>, path: &Path) -> Result<Vec<String>>;

    /// Removes a file.
    async fn del(&self, user: &Option<User>, path: &Path) -> Result<()>;

    /// Creates a directory.
    async fn mkd(&self, user: &Option<User>, path: &Path) -> Result<()>;

    /// Removes a directory.
    async fn rmd(&self, user: &Option<User>, path: &Path) -> Result<()>;

    /// Renames a file or directory.
    async fn rename(&self, user: &Option<User>, from: &Path, to: &Path) -> Result<()>;

    /// Checks that `path` exists and is a directory (CWD validation).
    async fn cwd(&self, user: &Option<User>, path: &Path) -> Result<()>;
}
