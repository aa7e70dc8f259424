//! The RFC 959 Reinitialize (`REIN`) command
//
// Flushes the session back to the state right after the control
// connection was opened; the user has to log in again.

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
pub struct Rein;

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Rein
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        session.reinitialize();
        Ok(Reply::new(ReplyCode::ServiceReady, "Service ready for new user"))
    }
}
