//! The RFC 959 User Name (`USER`) command

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

#[derive(Debug)]
pub struct User {
    username: String,
}

impl User {
    pub fn new(username: String) -> Self {
        User { username }
    }
}

#[async_trait]
impl<Storage, UserDet> CommandHandler<Storage, UserDet> for User
where
    Storage: StorageBackend<UserDet> + 'static,
    UserDet: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, UserDet>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        match session.state {
            SessionState::New | SessionState::WaitPass => {
                if args.authenticator.check_user(&self.username).await.is_err() {
                    session.state = SessionState::New;
                    return Ok(Reply::new(ReplyCode::NotLoggedIn, "Username not accepted"));
                }
                session.username = Some(self.username.clone());
                session.state = SessionState::WaitPass;
                Ok(Reply::new(ReplyCode::NeedPassword, "Password required"))
            }
            _ => Ok(Reply::new(ReplyCode::BadCommandSequence, "Please create a new connection to switch user")),
        }
    }
}
