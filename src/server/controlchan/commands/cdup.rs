//! The RFC 959 Change To Parent Directory (`CDUP`) command

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

#[derive(Debug)]
pub struct Cdup;

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Cdup
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        // The root is its own parent.
        session.cwd.pop();
        if session.cwd.as_os_str().is_empty() {
            session.cwd = "/".into();
        }
        Ok(Reply::new(ReplyCode::FileActionOkay, "Successfully changed to parent directory"))
    }
}
