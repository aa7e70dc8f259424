//! The RFC 959 Password (`PASS`) command

use crate::{
    auth::{AuthOutcome, UserDetail},
    server::{
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
        password::Password,
        session::SessionState,
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct Pass {
    password: Password,
}

impl Pass {
    pub fn new(password: Password) -> Self {
        Pass { password }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Pass
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let username = {
            let session = args.session.lock().await;
            match (session.state, session.username.clone()) {
                (SessionState::WaitPass, Some(username)) => username,
                _ => return Ok(Reply::new(ReplyCode::BadCommandSequence, "Please supply a username first")),
            }
        };

        // The authenticator may take its time; the session lock is not
        // held across the call.
        let outcome = args.authenticator.check_pass(&username, self.password.as_str()).await;

        let mut session = args.session.lock().await;
        match outcome {
            Ok(AuthOutcome::LoggedIn(user)) => {
                session.user = Arc::new(Some(user));
                session.state = SessionState::WaitCmd;
                Ok(Reply::new(ReplyCode::UserLoggedIn, "User logged in, proceed"))
            }
            Ok(AuthOutcome::AccountNeeded(user)) => {
                session.pending_user = Some(user);
                session.state = SessionState::WaitAcct;
                Ok(Reply::new(ReplyCode::NeedAccount, "Account required for login"))
            }
            Err(_) => {
                // RFC 959 wants the whole USER/PASS pair repeated.
                session.username = None;
                session.state = SessionState::New;
                Ok(Reply::new(ReplyCode::NotLoggedIn, "Authentication failed"))
            }
        }
    }
}
