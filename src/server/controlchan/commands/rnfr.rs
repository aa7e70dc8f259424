//! The RFC 959 Rename From (`RNFR`) command

use super::storage_error_reply;
use crate::{
    auth::UserDetail,
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        sequence::CommandCode,
        Reply, ReplyCode,
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub struct Rnfr {
    path: PathBuf,
}

impl Rnfr {
    pub fn new(path: PathBuf) -> Self {
        Rnfr { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Rnfr
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let (storage, user, full_path) = {
            let session = args.session.lock().await;
            (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(&self.path))
        };
        if let Err(err) = storage.metadata(&user, &full_path).await {
            return Ok(storage_error_reply(&err));
        }
        let mut session = args.session.lock().await;
        session.rename_from = Some(full_path);
        // Arms RNTO as the one verb allowed to follow.
        session.extra_next = Some(CommandCode::Rnto);
        Ok(Reply::new(ReplyCode::FileActionPending, "Tell me, what would you like the new name to be?"))
    }
}
