//! The RFC 959 Append (`APPE`) command
//
// Like STOR, except that the data is appended to an existing file at the
// server site, or a new file is created.

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
pub struct Appe {
    path: String,
}

impl Appe {
    pub fn new(path: String) -> Self {
        Appe { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Appe
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        if let TransferPreflight::Refused(reply) = transfer_preflight(&args).await {
            return Ok(reply);
        }

        let (storage, user, full_path) = {
            let session = args.session.lock().await;
            (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(&self.path))
        };
        let file = match storage.open_write(&user, &full_path, 0, WriteMode::Append).await {
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
            Reply::new(ReplyCode::FileStatusOkay, "Ready to append data"),
        )
        .await
    }
}
