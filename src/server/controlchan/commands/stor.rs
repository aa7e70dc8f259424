//! The RFC 959 Store (`STOR`) command
//
// This command causes the server-DTP to accept the data transferred via
// the data connection and to store the data as a file at the server site,
// replacing an existing file of the same name.

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
    storage::{StorageBackend, WriteMode},
};

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct Stor {
    path: String,
}

impl Stor {
    pub fn new(path: String) -> Self {
        Stor { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Stor
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let offset = match transfer_preflight(&args).await {
            TransferPreflight::Ready { offset } => offset,
            TransferPreflight::Refused(reply) => return Ok(reply),
        };

        let (storage, user, full_path) = {
            let session = args.session.lock().await;
            (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(&self.path))
        };
        let file = match storage.open_write(&user, &full_path, offset, WriteMode::Replace).await {
            Ok(file) => file,
            Err(err) => {
                close_pending_data_channel(&args).await;
                return Ok(storage_error_reply(&err));
            }
        };

        dispatch_transfer(
            &args,
            DataChanCmd::Stor {
                path: self.path.clone(),
                file,
            },
            Reply::new(ReplyCode::FileStatusOkay, "Ready to receive data"),
        )
        .await
    }
}
