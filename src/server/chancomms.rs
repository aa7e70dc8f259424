//! Contains the message types flowing between the control loop and the
//! data loop of a session.

use crate::server::controlchan::Reply;
use crate::server::datachan::codec::CodecConfig;
use crate::storage;

use bytes::Bytes;
use std::fmt;
use tokio::sync::oneshot;

/// What the data loop should do with the channel once it is open. The
/// control side resolves paths and opens files *before* dispatching, so a
/// permanent file error renders on the control channel before any 150.
#[derive(Debug)]
pub enum DataChanCmd<File> {
    /// Send the file to the client.
    Retr {
        /// The path as the client named it, for the completion reply.
        path: String,
        /// The file, already open and positioned at the restart offset.
        file: File,
    },
    /// Receive a file from the client.
    Stor {
        /// The path as the client named it, for the completion reply.
        path: String,
        /// The sink, already open and positioned.
        file: File,
    },
    /// Send an already-rendered directory listing (LIST/NLST).
    List {
        /// The rendered listing, one CRLF-terminated line per entry.
        text: Bytes,
    },
}

impl<File> DataChanCmd<File> {
    /// The path the command pertains to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            DataChanCmd::Retr { path, .. } | DataChanCmd::Stor { path, .. } => Some(path.as_str()),
            DataChanCmd::List { .. } => None,
        }
    }
}

/// One transfer, handed from the control loop to the data loop.
#[derive(Debug)]
pub struct DataCommand<File> {
    /// The work to do.
    pub cmd: DataChanCmd<File>,
    /// Snapshot of the session's MODE/TYPE/STRU settings at dispatch time;
    /// the data loop builds a fresh codec stack from it.
    pub codec_config: CodecConfig,
    /// Resolves once the 150 reply has been flushed to the control channel.
    /// No data byte may precede it on the wire.
    pub start: oneshot::Receiver<()>,
}

/// Messages that can be sent to the control channel loop.
#[derive(Debug)]
pub enum ControlChanMsg {
    /// Data was successfully sent to the client during a RETR.
    SentData {
        /// The path as specified by the client.
        path: String,
        /// The number of bytes transferred.
        bytes: u64,
    },
    /// Data from the client was written to the storage backend.
    WrittenData {
        /// The path as specified by the client.
        path: String,
        /// The number of bytes transferred.
        bytes: u64,
    },
    /// The listing went out successfully.
    DirectorySuccessfullyListed,
    /// The data loop finished tearing down after an ABOR.
    TransferAborted,
    /// The data connection died mid-transfer.
    ConnectionReset,
    /// The transfer made no progress within the configured window.
    TransferTimeout,
    /// An active-mode connect to the client's endpoint failed.
    CantOpenDataConnection,
    /// The storage backend failed mid-transfer.
    StorageError(storage::Error),
    /// A ready-made reply for the control channel.
    CommandChannelReply(Reply),
    /// Quit the client connection.
    ExitControlLoop,
}

impl fmt::Display for ControlChanMsg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
