use crate::{
    auth::UserDetail,
    server::{
        controlchan::{error::ControlChanError, middleware::ControlChanMiddleware},
        session::SharedSession,
        {Command, Event, Reply, ReplyCode, SessionState},
    },
    storage::StorageBackend,
};

use async_trait::async_trait;

// AuthMiddleware rejects everything but the pre-login command set with 530
// until the USER/PASS(/ACCT) sequence completed.
pub struct AuthMiddleware<Storage, User, Next>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
    Next: ControlChanMiddleware,
{
    pub session: SharedSession<Storage, User>,
    pub next: Next,
}

#[async_trait]
impl<Storage, User, Next> ControlChanMiddleware for AuthMiddleware<Storage, User, Next>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
    Next: ControlChanMiddleware,
{
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError> {
        match event {
            // Internal messages and the commands of the login sequence
            // itself are exempt. ACCT is in the set because it answers a
            // 332 reply, which by definition arrives before login is done.
            Event::InternalMsg(_)
            | Event::Command(Command::User { .. })
            | Event::Command(Command::Pass { .. })
            | Event::Command(Command::Acct { .. })
            | Event::Command(Command::Quit)
            | Event::Command(Command::Feat)
            | Event::Command(Command::Noop)
            // Unknown verbs render 500 in the dispatcher; gating them
            // behind login would mask the syntax error.
            | Event::Command(Command::Other { .. }) => self.next.handle(event).await,
            _ => {
                let session_state = {
                    let session = self.session.lock().await;
                    session.state
                };
                if session_state != SessionState::WaitCmd {
                    Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate"))
                } else {
                    self.next.handle(event).await
                }
            }
        }
    }
}
