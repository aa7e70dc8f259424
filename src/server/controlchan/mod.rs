//! Contains the code pertaining to the FTP *control* channel: line
//! decoding, the command catalog with its sequencing rules, the dispatcher
//! middleware chain and the per-command handlers.

pub mod command;
pub use command::Command;

pub(crate) mod handler;

pub(super) mod commands;

pub(crate) mod sequence;

pub(crate) mod line_parser;

pub(crate) mod event;
pub(crate) use event::Event;

pub(crate) mod codecs;
pub(crate) use codecs::FtpCodec;

pub(crate) mod reply;
pub(crate) use reply::{Reply, ReplyCode};

mod error;
pub(crate) use error::{ControlChanError, ControlChanErrorKind};

pub(crate) mod auth;
pub(crate) mod control_loop;
pub(crate) mod log;
pub(crate) mod middleware;
