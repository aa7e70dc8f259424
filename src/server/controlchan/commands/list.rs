//! The RFC 959 List (`LIST`) command
//
// The listing travels over the data connection, one human-oriented line
// per entry.

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
use bytes::Bytes;
use std::sync::Arc;

#[derive(Debug)]
pub struct List {
    path: Option<String>,
}

impl List {
    pub fn new(path: Option<String>) -> Self {
        List { path }
    }
}

pub(super) fn render_lines(lines: Vec<String>) -> Bytes {
    let mut text = String::new();
    for line in lines {
        text.push_str(&line);
        text.push('\n');
    }
    Bytes::from(text)
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for List
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
                Some(path) if path != "." => session.cwd.join(path),
                _ => session.cwd.clone(),
            };
            (Arc::clone(&session.storage), session.user.clone(), full_path)
        };
        // Render before the 150 so a bad path fails on the control channel
        // only.
        let lines = match storage.list(&user, &full_path).await {
            Ok(lines) => lines,
            Err(err) => {
                close_pending_data_channel(&args).await;
                return Ok(storage_error_reply(&err));
            }
        };

        dispatch_transfer(
            &args,
            DataChanCmd::List { text: render_lines(lines) },
            Reply::new(ReplyCode::FileStatusOkay, "Opening data connection for directory listing"),
        )
        .await
    }
}
