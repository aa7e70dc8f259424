//! The RFC 2389 Options (`OPTS`) command
//
// Only the UTF8 switch is recognized; the engine talks UTF-8 either way.

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

/// The options we recognize.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Opt {
    /// The UTF-8 switch of RFC 2640.
    Utf8 {
        /// On or off; we behave the same either way.
        on: bool,
    },
}

#[derive(Debug)]
pub struct Opts {
    option: Opt,
}

impl Opts {
    pub fn new(option: Opt) -> Self {
        Opts { option }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Opts
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, _args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        match self.option {
            Opt::Utf8 { .. } => Ok(Reply::new(ReplyCode::CommandOkay, "Always in UTF-8 mode")),
        }
    }
}
