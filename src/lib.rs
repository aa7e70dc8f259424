#![deny(missing_docs)]
//! The core of an FTP server, as a Rust library.
//!
//! ftpcore implements the hard parts of RFC 959: the per-session command
//! dispatch and sequencing layer on the control channel, and the data
//! transfer controller with its MODE/TYPE/STRU codec pipeline on the data
//! channel. Authentication and storage are pluggable backends.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let storage = Arc::new(ftpcore::storage::mem::Mem::new());
//!     let server = ftpcore::Server::new(storage)
//!         .greeting("Welcome to my FTP server")
//!         .passive_ports(50000..=65535);
//!
//!     server.listen("127.0.0.1:2121").await.unwrap();
//! }
//! ```

pub mod auth;
pub(crate) mod server;
pub mod storage;

pub use crate::server::ftpserver::Server;
