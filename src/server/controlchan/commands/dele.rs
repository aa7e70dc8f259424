//! The RFC 959 Delete (`DELE`) command

use super::storage_error_reply;
use crate::{
    auth::UserDetail,
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct Dele {
    path: String,
}

impl Dele {
    pub fn new(path: String) -> Self {
        Dele { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Dele
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let (storage, user, full_path) = {
            let session = args.session.lock().await;
            (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(&self.path))
        };
        match storage.del(&user, &full_path).await {
            Ok(()) => Ok(Reply::new(ReplyCode::FileActionOkay, "File successfully removed")),
            Err(err) => Ok(storage_error_reply(&err)),
        }
    }
}
