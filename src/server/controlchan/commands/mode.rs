//! The RFC 959 Transfer Mode (`MODE`) command
//
// The following codes are assigned for transfer modes:
//
// S - Stream
// B - Block
// C - Compressed
//
// The default transfer mode is Stream.

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

/// The parameter that can be given to the `MODE` command.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ModeParam {
    /// Data is sent in a continuous stream of bytes.
    Stream,
    /// Data is sent as a series of blocks preceded by a descriptor header.
    Block,
    /// Like block mode, with the payload run-length encoded.
    Compressed,
}

#[derive(Debug)]
pub struct Mode {
    mode: ModeParam,
}

impl Mode {
    pub fn new(mode: ModeParam) -> Self {
        Mode { mode }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Mode
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        session.codec_config.mode = self.mode;
        let text = match self.mode {
            ModeParam::Stream => "Using Stream transfer mode",
            ModeParam::Block => "Using Block transfer mode",
            ModeParam::Compressed => "Using Compressed transfer mode",
        };
        Ok(Reply::new(ReplyCode::CommandOkay, text))
    }
}
