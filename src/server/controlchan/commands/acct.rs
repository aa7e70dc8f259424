//! The RFC 959 Account (`ACCT`) command

use crate::{
    auth::UserDetail,
    server::{
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
        session::SessionState,
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct Acct {
    account: String,
}

impl Acct {
    pub fn new(account: String) -> Self {
        Acct { account }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Acct
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let pending = {
            let mut session = args.session.lock().await;
            match (session.state, session.pending_user.take()) {
                (SessionState::WaitAcct, Some(user)) => user,
                _ => return Ok(Reply::new(ReplyCode::BadCommandSequence, "ACCT was not requested")),
            }
        };

        let outcome = args.authenticator.check_acct(pending, &self.account).await;

        let mut session = args.session.lock().await;
        match outcome {
            Ok(user) => {
                session.user = Arc::new(Some(user));
                session.state = SessionState::WaitCmd;
                Ok(Reply::new(ReplyCode::UserLoggedIn, "User logged in, proceed"))
            }
            Err(_) => {
                session.username = None;
                session.state = SessionState::New;
                Ok(Reply::new(ReplyCode::NotLoggedIn, "Account not accepted"))
            }
        }
    }
}
