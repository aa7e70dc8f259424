//! The RFC 959 Restart (`REST`) command
//
// The marker is the byte offset at which the file transfer is to be
// restarted. It is consumed by the transfer verb that immediately
// follows.

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
pub struct Rest {
    offset: u64,
}

impl Rest {
    pub fn new(offset: u64) -> Self {
        Rest { offset }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Rest
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        session.restart = Some(self.offset);
        Ok(Reply::new_with_string(
            ReplyCode::FileActionPending,
            format!("Restarting at {}. Send STOR or RETR to initiate transfer", self.offset),
        ))
    }
}
