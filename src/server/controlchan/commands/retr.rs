//! The RFC 959 Retrieve (`RETR`) command
//
// This command causes the server-DTP to transfer a copy of the file,
// specified in the pathname, to the other end of the data connection. The
// status and contents of the file at the server site are unaffected.

use super::{close_pending_data_channel, dispatch_transfer, storage_error_reply, transfer_preflight, TransferPreflight};
use crate::{
    auth::UserDetail,
    server::{
        chancomms::DataChanCmd,
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct Retr {
    path: String,
}

impl Retr {
    pub fn new(path: String) -> Self {
        Retr { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Retr
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let offset = match transfer_preflight(&args).await {
            TransferPreflight::Ready { offset } => offset,
            TransferPreflight::Refused(reply) => return Ok(reply),
        };

        // Open before the 150: a file that cannot be opened renders its
        // permanent error and leaves the data channel untouched by bytes.
        let (storage, user, full_path) = {
            let session = args.session.lock().await;
            (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(&self.path))
        };
        let file = match storage.open_read(&user, &full_path, offset).await {
            Ok(file) => file,
            Err(err) => {
                close_pending_data_channel(&args).await;
                return Ok(storage_error_reply(&err));
            }
        };

        dispatch_transfer(
            &args,
            DataChanCmd::Retr {
                path: self.path.clone(),
                file,
            },
            Reply::new(ReplyCode::FileStatusOkay, "File status okay; about to open data connection"),
        )
        .await
    }
}
