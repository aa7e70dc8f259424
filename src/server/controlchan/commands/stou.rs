//! The RFC 959 Store Unique (`STOU`) command
//
// Like STOR, except that the file is stored under a name unique to the
// working directory; the chosen name travels in the replies.

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
pub struct Stou;

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Stou
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        if let TransferPreflight::Refused(reply) = transfer_preflight(&args).await {
            return Ok(reply);
        }

        let unique_name = format!("stou-{:016x}", rand::random::<u64>());
        let (storage, user, full_path) = {
            let session = args.session.lock().await;
            (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(&unique_name))
        };
        let file = match storage.open_write(&user, &full_path, 0, WriteMode::Replace).await {
            Ok(file) => file,
            Err(err) => {
                close_pending_data_channel(&args).await;
                return Ok(storage_error_reply(&err));
            }
        };

        dispatch_transfer(
            &args,
            DataChanCmd::Stor {
                path: unique_name.clone(),
                file,
            },
            Reply::new_with_string(ReplyCode::FileStatusOkay, format!("FILE: {}", unique_name)),
        )
        .await
    }
}
