//! The RFC 959 File Structure (`STRU`) command

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

/// The parameter that can be given to the `STRU` command.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StruParam {
    /// Unstructured bytes.
    File,
    /// A sequence of records with visible boundaries.
    Record,
    /// Independent indexed pages. Recognized but not implemented.
    Page,
}

#[derive(Debug)]
pub struct Stru {
    structure: StruParam,
}

impl Stru {
    pub fn new(structure: StruParam) -> Self {
        Stru { structure }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Stru
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        if self.structure == StruParam::Page {
            return Ok(Reply::new(ReplyCode::CommandNotImplementedForParameter, "Page structure is not implemented"));
        }
        let mut session = args.session.lock().await;
        session.codec_config.structure = self.structure;
        let text = if self.structure == StruParam::File {
            "Using File structure"
        } else {
            "Using Record structure"
        };
        Ok(Reply::new(ReplyCode::CommandOkay, text))
    }
}
