//! The RFC 959 Site Parameters (`SITE`) command
//
// Recognized so it sequences like any other verb, but no site-specific
// services are provided.

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
pub struct Site;

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Site
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, _args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        Ok(Reply::new(ReplyCode::CommandNotImplemented, "SITE services are not implemented"))
    }
}
