//! The RFC 2389 Feature (`FEAT`) command

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
pub struct Feat;

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Feat
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, _args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let lines = vec!["Extensions supported:".to_string(), "REST STREAM".to_string(), "UTF8".to_string(), "END".to_string()];
        Ok(Reply::new_multiline(ReplyCode::SystemStatus, lines))
    }
}
