//! This module contains the implementations for the FTP commands defined in
//!
//! - [RFC 959 - FTP](https://tools.ietf.org/html/rfc959)

mod abor;
mod acct;
mod allo;
mod appe;
mod cdup;
mod cwd;
mod dele;
mod feat;
mod help;
mod list;
mod mkd;
mod mode;
mod nlst;
mod noop;
mod opts;
mod pass;
mod pasv;
mod port;
mod pwd;
mod quit;
mod rein;
mod rest;
mod retr;
mod rmd;
mod rnfr;
mod rnto;
mod site;
mod stat;
mod stor;
mod stou;
mod stru;
mod syst;
mod type_;
mod user;

pub use abor::Abor;
pub use acct::Acct;
pub use allo::Allo;
pub use appe::Appe;
pub use cdup::Cdup;
pub use cwd::Cwd;
pub use dele::Dele;
pub use feat::Feat;
pub use help::Help;
pub use list::List;
pub use mkd::Mkd;
pub use mode::{Mode, ModeParam};
pub use nlst::Nlst;
pub use noop::Noop;
pub use opts::{Opt, Opts};
pub use pass::Pass;
pub use pasv::Pasv;
pub use port::Port;
pub use pwd::Pwd;
pub use quit::Quit;
pub use rein::Rein;
pub use rest::Rest;
pub use retr::Retr;
pub use rmd::Rmd;
pub use rnfr::Rnfr;
pub use rnto::Rnto;
pub use site::Site;
pub use stat::Stat;
pub use stor::Stor;
pub use stou::Stou;
pub use stru::{Stru, StruParam};
pub use syst::Syst;
pub use type_::{Type, TypeParam};
pub use user::User;

use crate::auth::UserDetail;
use crate::server::chancomms::{DataChanCmd, DataCommand};
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::CommandContext;
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::datachan;
use crate::server::datachan::transfer::TransferState;
use crate::storage::{self, ErrorKind, StorageBackend};

use tokio::sync::oneshot;

/// Renders a storage failure as its RFC 959 reply.
pub(crate) fn storage_error_reply(error: &storage::Error) -> Reply {
    match error.kind() {
        ErrorKind::TransientFileNotAvailable => Reply::new(ReplyCode::TransientFileError, "File not available right now"),
        ErrorKind::PermanentFileNotAvailable => Reply::new(ReplyCode::FileError, "File not found"),
        ErrorKind::PermissionDenied => Reply::new(ReplyCode::FileError, "Permission denied"),
        ErrorKind::LocalError => Reply::new(ReplyCode::LocalError, "Local error"),
        ErrorKind::PageTypeUnknown => Reply::new(ReplyCode::PageTypeUnknown, "Page type unknown"),
        ErrorKind::InsufficientStorageSpaceError => Reply::new(ReplyCode::OutOfSpace, "Insufficient storage space"),
        ErrorKind::ExceededStorageAllocationError => Reply::new(ReplyCode::ExceededStorageAllocation, "Exceeded storage allocation"),
        ErrorKind::FileNameNotAllowedError => Reply::new(ReplyCode::BadFileName, "File name not allowed"),
    }
}

// Preflight shared by every transfer verb: the single-transfer rule and the
// requirement that PORT or PASV came first. Returns the restart offset the
// transfer consumes.
pub(crate) enum TransferPreflight {
    Ready { offset: u64 },
    Refused(Reply),
}

pub(crate) async fn transfer_preflight<Storage, User>(args: &CommandContext<Storage, User>) -> TransferPreflight
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let mut session = args.session.lock().await;
    if session.data_busy || session.transfer.in_progress() {
        return TransferPreflight::Refused(Reply::new(ReplyCode::CantOpenDataConnection, "Transfer already in progress"));
    }
    if !session.transfer.has_endpoint() {
        return TransferPreflight::Refused(Reply::new(ReplyCode::CantOpenDataConnection, "Use PORT or PASV first"));
    }
    TransferPreflight::Ready {
        offset: session.restart.take().unwrap_or(0),
    }
}

// Hands a prepared command to the data loop and emits the 150. The start
// latch stays with the session; the control loop fires it once the 150 is
// flushed, which is what keeps the reply ahead of the data.
pub(crate) async fn dispatch_transfer<Storage, User>(
    args: &CommandContext<Storage, User>,
    cmd: DataChanCmd<Storage::File>,
    reply_150: Reply,
) -> Result<Reply, ControlChanError>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let mut session = args.session.lock().await;
    let tx = match session.data_cmd_tx.clone() {
        Some(tx) => tx,
        None => return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "Use PORT or PASV first")),
    };
    let (start_tx, start_rx) = oneshot::channel();
    let command = DataCommand {
        cmd,
        codec_config: session.codec_config,
        start: start_rx,
    };
    if tx.try_send(command).is_err() {
        return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection"));
    }
    session.transfer.begin(start_tx);
    session.data_busy = true;

    if session.transfer.state() == TransferState::ConnectingActive {
        let logger = args.logger.clone();
        let session_arc = args.session.clone();
        tokio::spawn(async move {
            datachan::connect_active(logger, session_arc).await;
        });
    }

    Ok(reply_150)
}

// A transfer verb that failed before the 150 (e.g. the file would not
// open) must leave the data channel closed without any bytes on it.
pub(crate) async fn close_pending_data_channel<Storage, User>(args: &CommandContext<Storage, User>)
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let session = args.session.lock().await;
    if session.transfer.state() == TransferState::Open {
        if let Some(abort) = &session.data_abort_tx {
            let _ = abort.try_send(());
        }
    }
}
