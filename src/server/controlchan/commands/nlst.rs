//! The RFC 959 Name List (`NLST`) command
//
// Like LIST, but the data connection carries bare names only.

use super::{close_pending_data_channel, dispatch_transfer, list::render_lines, storage_error_reply, transfer_preflight, TransferPreflight};
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
pub struct Nlst {
    path: Option<String>,
}

impl Nlst {
    pub fn new(path: Option<String>) -> Self {
        Nlst { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Nlst
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
            let full_path = match &self.path {
                Some(path) => session.cwd.join(path),
                None => session.cwd.clone(),
            };
            (Arc::clone(&session.storage), session.user.clone(), full_path)
        };
        let names = match storage.list_names(&user, &full_path).await {
            Ok(names) => names,
            Err(err) => {
                close_pending_data_channel(&args).await;
                return Ok(storage_error_reply(&err));
            }
        };

        dispatch_transfer(
            &args,
            DataChanCmd::List { text: render_lines(names) },
            Reply::new(ReplyCode::FileStatusOkay, "Opening data connection for name list"),
        )
        .await
    }
}
