//! The RFC 959 Change Working Directory (`CWD`) command

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
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub struct Cwd {
    path: PathBuf,
}

impl Cwd {
    pub fn new(path: PathBuf) -> Self {
        Cwd { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Cwd
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let (storage, user, full_path) = {
            let session = args.session.lock().await;
            (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(&self.path))
        };
        match storage.cwd(&user, &full_path).await {
            Ok(()) => {
                let mut session = args.session.lock().await;
                session.cwd = full_path;
                Ok(Reply::new(ReplyCode::FileActionOkay, "Successfully changed working directory"))
            }
            Err(err) => Ok(storage_error_reply(&err)),
        }
    }
}
