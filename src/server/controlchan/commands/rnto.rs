//! The RFC 959 Rename To (`RNTO`) command

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
pub struct Rnto {
    path: PathBuf,
}

impl Rnto {
    pub fn new(path: PathBuf) -> Self {
        Rnto { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Rnto
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let (storage, user, from, to) = {
            let mut session = args.session.lock().await;
            let from = match session.rename_from.take() {
                Some(from) => from,
                None => return Ok(Reply::new(ReplyCode::BadCommandSequence, "Issue a RNFR first")),
            };
            let to = session.cwd.join(&self.path);
            (Arc::clone(&session.storage), session.user.clone(), from, to)
        };
        match storage.rename(&user, &from, &to).await {
            Ok(()) => Ok(Reply::new(ReplyCode::FileActionOkay, "Rename successful")),
            Err(err) => Ok(storage_error_reply(&err)),
        }
    }
}
