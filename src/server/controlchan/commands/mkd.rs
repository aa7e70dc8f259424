//! The RFC 959 Make Directory (`MKD`) command

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
pub struct Mkd {
    path: PathBuf,
}

impl Mkd {
    pub fn new(path: PathBuf) -> Self {
        Mkd { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Mkd
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let (storage, user, full_path) = {
            let session = args.session.lock().await;
            (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(&self.path))
        };
        match storage.mkd(&user, &full_path).await {
            Ok(()) => Ok(Reply::new_with_string(
                ReplyCode::DirCreated,
                format!("\"{}\" directory created", full_path.display()),
            )),
            Err(err) => Ok(storage_error_reply(&err)),
        }
    }
}
